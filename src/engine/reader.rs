use crossbeam_channel::{bounded, SendTimeoutError, Sender};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::state::StreamState;
use super::stream::{SampleStream, StreamEvent};
use crate::error::{SdrError, SdrResult};
use crate::hal::RtlHandle;
use crate::observability::StreamMetrics;
use crate::validate::BufferGeometry;

/// How often a blocked send re-checks whether the stream was abandoned
const SEND_POLL: Duration = Duration::from_millis(50);

/// Which librtlsdr entry point drives the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Async,
    /// Deprecated `rtlsdr_wait_async`, always default geometry
    Wait,
}

impl ReadMode {
    fn call_name(&self) -> &'static str {
        match self {
            Self::Async => "rtlsdr_read_async",
            Self::Wait => "rtlsdr_wait_async",
        }
    }
}

/// Flags shared by the session and one reader thread
#[derive(Default)]
struct StreamFlags {
    cancel_requested: AtomicBool,
    /// Set on session close or restart; the reader stops waiting for the consumer
    abandoned: AtomicBool,
}

/// Owns the reader thread of a device session
pub struct StreamEngine {
    device_index: u32,
    state: Arc<Mutex<StreamState>>,
    flags: Arc<StreamFlags>,
    metrics: Option<Arc<StreamMetrics>>,
    reader: Option<JoinHandle<()>>,
}

fn lock_state(state: &Mutex<StreamState>) -> MutexGuard<'_, StreamState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn transition(state: &Mutex<StreamState>, target: StreamState) {
    let mut current = lock_state(state);
    if !current.can_transition_to(&target) {
        warn!("unexpected stream transition {} -> {}", current.name(), target.name());
    }
    *current = target;
}

impl StreamEngine {
    pub fn new(device_index: u32) -> Self {
        Self {
            device_index,
            state: Arc::new(Mutex::new(StreamState::Idle)),
            flags: Arc::new(StreamFlags::default()),
            metrics: None,
            reader: None,
        }
    }

    pub fn state(&self) -> StreamState {
        lock_state(&self.state).clone()
    }

    pub fn is_streaming(&self) -> bool {
        lock_state(&self.state).is_streaming()
    }

    /// Metrics of the most recent stream
    pub fn metrics(&self) -> Option<Arc<StreamMetrics>> {
        self.metrics.clone()
    }

    /// Spawn the reader thread and hand back the consumer side
    pub fn start(
        &mut self,
        handle: Arc<dyn RtlHandle>,
        geometry: BufferGeometry,
        mode: ReadMode,
    ) -> SdrResult<SampleStream> {
        if self.is_streaming() {
            return Err(SdrError::InvalidState("a stream is already active".to_string()));
        }

        // The previous reader is past its transport call; at most it is
        // parked on a full channel with its terminal event.
        self.flags.abandoned.store(true, Ordering::SeqCst);
        if let Some(previous) = self.reader.take() {
            if previous.join().is_err() {
                warn!("device {} previous reader thread panicked", self.device_index);
            }
        }

        let (tx, rx) = bounded(geometry.buffer_count as usize);
        let flags = Arc::new(StreamFlags::default());
        let metrics = Arc::new(StreamMetrics::new(self.device_index));
        transition(&self.state, StreamState::Streaming);

        let reader = StreamReader {
            handle,
            geometry,
            mode,
            events: tx,
            flags: flags.clone(),
            state: self.state.clone(),
            metrics: metrics.clone(),
            consumer_gone: false,
        };
        let spawned = thread::Builder::new()
            .name(format!("rtlsdr-reader-{}", self.device_index))
            .spawn(move || reader.run());

        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                let msg = format!("failed to spawn reader thread: {}", e);
                transition(&self.state, StreamState::Faulted(msg.clone()));
                return Err(SdrError::InvalidState(msg));
            }
        };

        info!(
            "device {} streaming: {} x {} bytes ({})",
            self.device_index,
            geometry.buffer_count,
            geometry.buffer_length,
            mode.call_name()
        );
        self.flags = flags;
        self.metrics = Some(metrics.clone());
        self.reader = Some(join);
        Ok(SampleStream::new(rx, metrics))
    }

    /// Ask the transport to stop; `Done` arrives later from the reader
    pub fn cancel(&self, handle: &dyn RtlHandle) -> SdrResult<()> {
        if !self.is_streaming() {
            return Err(SdrError::InvalidState("no active stream to cancel".to_string()));
        }
        self.flags.cancel_requested.store(true, Ordering::SeqCst);
        handle.cancel_async()?;
        debug!("device {} stream cancel requested", self.device_index);
        Ok(())
    }

    /// Stop any active stream and wait for the reader thread to exit
    pub fn shutdown(&mut self, handle: &dyn RtlHandle) {
        if self.is_streaming() {
            self.flags.cancel_requested.store(true, Ordering::SeqCst);
            if let Err(e) = handle.cancel_async() {
                warn!("device {} cancel on shutdown failed: {}", self.device_index, e);
            }
        }
        self.flags.abandoned.store(true, Ordering::SeqCst);

        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("device {} reader thread panicked", self.device_index);
            }
        }
    }
}

/// Everything the reader thread owns
struct StreamReader {
    handle: Arc<dyn RtlHandle>,
    geometry: BufferGeometry,
    mode: ReadMode,
    events: Sender<StreamEvent>,
    flags: Arc<StreamFlags>,
    state: Arc<Mutex<StreamState>>,
    metrics: Arc<StreamMetrics>,
    consumer_gone: bool,
}

impl StreamReader {
    fn run(mut self) {
        let handle = self.handle.clone();

        let outcome = match handle.reset_buffer() {
            Err(e) => Err(e.to_string()),
            Ok(()) if self.flags.cancel_requested.load(Ordering::SeqCst) => Ok(()),
            Ok(()) => {
                let mode = self.mode;
                let geometry = self.geometry;
                let mut on_buffer = |buf: &[u8]| self.deliver(buf);
                let result = match mode {
                    ReadMode::Async => handle.read_async(
                        &mut on_buffer,
                        geometry.buffer_count,
                        geometry.buffer_length,
                    ),
                    ReadMode::Wait => handle.wait_async(&mut on_buffer),
                };
                result.map_err(|e| {
                    format!(
                        "{} returned error code {} on exit",
                        mode.call_name(),
                        e.code().unwrap_or(-1)
                    )
                })
            }
        };

        match outcome {
            Ok(()) => {
                let target = if self.flags.cancel_requested.load(Ordering::SeqCst) {
                    StreamState::Cancelled
                } else {
                    StreamState::Completed
                };
                info!(
                    "device {} stream ended ({}) after {} buffers",
                    self.metrics.device_index(),
                    target.name(),
                    self.metrics.buffers_delivered()
                );
                transition(&self.state, target);
                self.emit(StreamEvent::Done);
            }
            Err(msg) => {
                warn!("device {} stream fault: {}", self.metrics.device_index(), msg);
                self.metrics.record_fault();
                transition(&self.state, StreamState::Faulted(msg.clone()));
                self.emit(StreamEvent::Error(msg));
            }
        }
    }

    fn deliver(&mut self, buf: &[u8]) {
        if self.consumer_gone {
            self.metrics.record_dropped();
            return;
        }
        if self.emit(StreamEvent::Data(buf.to_vec())) {
            self.metrics.record_buffer(buf.len());
            return;
        }

        self.metrics.record_dropped();
        self.consumer_gone = true;
        debug!("device {} consumer gone, cancelling transport", self.metrics.device_index());
        self.flags.cancel_requested.store(true, Ordering::SeqCst);
        if let Err(e) = self.handle.cancel_async() {
            warn!("device {} cancel after consumer drop failed: {}", self.metrics.device_index(), e);
        }
    }

    /// Blocking send that gives up once the consumer or the session is gone
    fn emit(&self, event: StreamEvent) -> bool {
        let mut event = event;
        loop {
            match self.events.send_timeout(event, SEND_POLL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Disconnected(_)) => return false,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if self.flags.abandoned.load(Ordering::SeqCst) {
                        return false;
                    }
                    event = returned;
                }
            }
        }
    }
}
