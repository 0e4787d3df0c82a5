use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::StreamMetrics;

/// One notification from the reader thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One completed transport buffer
    Data(Vec<u8>),
    /// The transport failed; nothing follows
    Error(String),
    /// The stream ended normally; nothing follows
    Done,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Data(_))
    }
}

/// Consumer side of a running stream.
///
/// Iterating yields every event up to and including the terminal `Error` or
/// `Done`, then ends. Dropping the stream while data is still flowing makes
/// the reader cancel the transport.
pub struct SampleStream {
    events: Receiver<StreamEvent>,
    metrics: Arc<StreamMetrics>,
    finished: bool,
}

impl SampleStream {
    pub(crate) fn new(events: Receiver<StreamEvent>, metrics: Arc<StreamMetrics>) -> Self {
        Self {
            events,
            metrics,
            finished: false,
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<StreamEvent, RecvTimeoutError> {
        if self.finished {
            return Err(RecvTimeoutError::Disconnected);
        }
        let event = self.events.recv_timeout(timeout);
        match &event {
            Ok(e) if e.is_terminal() => self.finished = true,
            Err(RecvTimeoutError::Disconnected) => self.finished = true,
            _ => {}
        }
        event
    }

    /// Raw event channel, for `select!`-style consumers
    pub fn receiver(&self) -> &Receiver<StreamEvent> {
        &self.events
    }

    pub fn metrics(&self) -> Arc<StreamMetrics> {
        self.metrics.clone()
    }

    /// Whether the terminal event has been consumed through this stream
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Iterator for SampleStream {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv() {
            Ok(event) => {
                self.finished = event.is_terminal();
                Some(event)
            }
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_iteration_stops_after_terminal_event() {
        let (tx, rx) = bounded(4);
        tx.send(StreamEvent::Data(vec![1, 2])).unwrap();
        tx.send(StreamEvent::Done).unwrap();
        tx.send(StreamEvent::Data(vec![3])).unwrap();

        let stream = SampleStream::new(rx, Arc::new(StreamMetrics::new(0)));
        let events: Vec<_> = stream.collect();
        assert_eq!(events, vec![StreamEvent::Data(vec![1, 2]), StreamEvent::Done]);
    }

    #[test]
    fn test_recv_timeout_reports_timeout() {
        let (_tx, rx) = bounded::<StreamEvent>(1);
        let mut stream = SampleStream::new(rx, Arc::new(StreamMetrics::new(0)));
        assert_eq!(
            stream.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Timeout)
        );
        assert!(!stream.is_finished());
    }
}
