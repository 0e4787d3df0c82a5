use rtlsdr_host::hal::mock::{SimulatedDriver, SimulatedHandle};
use rtlsdr_host::{DeviceSession, ErrorKind, SampleStream, StreamEvent, StreamState};
use std::sync::Arc;
use std::time::Duration;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn open_session() -> (SimulatedDriver, DeviceSession, Arc<SimulatedHandle>) {
    let driver = SimulatedDriver::with_devices(1);
    let session = DeviceSession::open(&driver, 0).unwrap();
    let handle = driver.handle(0).unwrap();
    (driver, session, handle)
}

fn next_event(stream: &mut SampleStream) -> StreamEvent {
    stream.recv_timeout(EVENT_TIMEOUT).expect("stream event")
}

#[test]
fn test_error_after_k_buffers() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(5);

    let mut stream = session.start(Some(2), Some(512)).unwrap();
    for _ in 0..5 {
        assert_eq!(next_event(&mut stream), StreamEvent::Data(vec![b'd'; 512]));
    }

    handle.inject_error(-5);
    assert_eq!(
        next_event(&mut stream),
        StreamEvent::Error("rtlsdr_read_async returned error code -5 on exit".to_string())
    );
    assert!(stream.next().is_none());
    assert_eq!(
        session.stream_state(),
        StreamState::Faulted("rtlsdr_read_async returned error code -5 on exit".to_string())
    );
    assert_eq!(stream.metrics().faults(), 1);

    handle.inject_error(0);
    session.close().unwrap();
}

#[test]
fn test_cancel_after_k_buffers() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(3);

    let mut stream = session.start(Some(4), Some(1024)).unwrap();
    for _ in 0..3 {
        assert_eq!(next_event(&mut stream), StreamEvent::Data(vec![b'd'; 1024]));
    }

    session.cancel().unwrap();
    assert_eq!(next_event(&mut stream), StreamEvent::Done);
    assert!(stream.next().is_none());
    assert_eq!(session.stream_state(), StreamState::Cancelled);

    let metrics = session.stream_metrics().unwrap();
    assert_eq!(metrics.buffers_delivered(), 3);
    assert_eq!(metrics.bytes_delivered(), 3 * 1024);
}

#[test]
fn test_transport_exhaustion_completes() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(2);

    let mut stream = session.start(None, None).unwrap();
    next_event(&mut stream);
    next_event(&mut stream);

    // The transport stops on its own, without a cancel from the session
    handle.set_buffer_ready(false);
    assert_eq!(next_event(&mut stream), StreamEvent::Done);
    assert_eq!(session.stream_state(), StreamState::Completed);
}

#[test]
fn test_reset_failure_reported_as_error_event() {
    let (_driver, mut session, handle) = open_session();
    handle.inject_error(-9);

    let mut stream = session.start(None, None).unwrap();
    match next_event(&mut stream) {
        StreamEvent::Error(msg) => assert!(msg.contains("-9"), "{}", msg),
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(stream.next().is_none());
    assert!(matches!(session.stream_state(), StreamState::Faulted(_)));

    handle.inject_error(0);
}

#[test]
fn test_second_start_rejected_while_streaming() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(0);

    let mut stream = session.start(None, None).unwrap();
    let err = session.start(None, None).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    session.cancel().unwrap();
    assert_eq!(next_event(&mut stream), StreamEvent::Done);
}

#[test]
fn test_restart_after_terminal_state() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(1);

    let mut first = session.start(None, None).unwrap();
    next_event(&mut first);
    session.cancel().unwrap();
    assert_eq!(next_event(&mut first), StreamEvent::Done);

    handle.stall_after(1);
    let mut second = session.start(Some(1), Some(512)).unwrap();
    assert_eq!(next_event(&mut second), StreamEvent::Data(vec![b'd'; 512]));
    session.cancel().unwrap();
    assert_eq!(next_event(&mut second), StreamEvent::Done);
}

#[test]
fn test_restart_releases_reader_blocked_on_full_channel() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(1);

    // One slot, filled by the only data buffer: the terminal event cannot fit
    let first = session.start(Some(1), Some(512)).unwrap();
    while first.receiver().len() < 1 {
        std::thread::sleep(Duration::from_millis(5));
    }
    session.cancel().unwrap();
    while session.stream_state() == StreamState::Streaming {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(session.stream_state(), StreamState::Cancelled);

    handle.stall_after(1);
    let mut second = session.start(Some(1), Some(512)).unwrap();

    // The old reader was joined, so its sender is gone and the old stream
    // ends after the queued buffer instead of blocking forever
    let leftover: Vec<_> = first.collect();
    assert_eq!(leftover, vec![StreamEvent::Data(vec![b'd'; 512])]);

    assert_eq!(next_event(&mut second), StreamEvent::Data(vec![b'd'; 512]));
    session.cancel().unwrap();
    assert_eq!(next_event(&mut second), StreamEvent::Done);
}

#[test]
fn test_oversized_buffer_geometry_rejected() {
    let (_driver, mut session, _handle) = open_session();

    let err = session.start(Some(u32::MAX), Some(512)).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = session.start(Some(4), Some(u32::MAX - 511)).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(session.stream_state(), StreamState::Idle);
    assert!(session.stream_metrics().is_none());
}

#[test]
fn test_cancel_without_stream_rejected() {
    let (_driver, mut session, _handle) = open_session();
    assert_eq!(session.cancel().unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(session.stream_state(), StreamState::Idle);
}

#[test]
fn test_unaligned_buffer_length_rejected() {
    let (_driver, mut session, _handle) = open_session();
    let err = session.start(Some(4), Some(1000)).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(session.stream_state(), StreamState::Idle);
}

#[test]
fn test_dropping_stream_cancels_transport() {
    let (_driver, mut session, handle) = open_session();

    let mut stream = session.start(Some(1), Some(512)).unwrap();
    next_event(&mut stream);
    drop(stream);

    session.close().unwrap();
    assert_eq!(session.stream_state(), StreamState::Cancelled);
    assert!(!handle.snapshot().buffer_ready);
}

#[test]
fn test_close_while_streaming_joins_reader() {
    let (_driver, mut session, handle) = open_session();

    let mut stream = session.start(Some(2), Some(512)).unwrap();
    next_event(&mut stream);

    session.close().unwrap();
    assert!(!session.is_open());
    assert!(!handle.snapshot().open);

    // Whatever was buffered drains, then the stream ends
    let remaining: Vec<_> = stream.collect();
    assert!(remaining.len() <= 3);
}

#[test]
#[allow(deprecated)]
fn test_deprecated_wait_uses_default_geometry() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(2);

    let mut stream = session.wait().unwrap();
    assert_eq!(next_event(&mut stream), StreamEvent::Data(vec![b'd'; 16384]));
    assert_eq!(next_event(&mut stream), StreamEvent::Data(vec![b'd'; 16384]));

    handle.inject_error(-3);
    assert_eq!(
        next_event(&mut stream),
        StreamEvent::Error("rtlsdr_wait_async returned error code -3 on exit".to_string())
    );
    handle.inject_error(0);
}

#[test]
fn test_for_each_consumes_until_done() {
    let (_driver, mut session, handle) = open_session();
    handle.stall_after(4);

    let stream = session.start(Some(8), Some(512)).unwrap();
    let mut data = 0;
    let mut done = 0;
    let mut cancel_handle = Some(handle.clone());
    stream.for_each(|event| match event {
        StreamEvent::Data(_) => {
            data += 1;
            if data == 4 {
                if let Some(h) = cancel_handle.take() {
                    h.set_buffer_ready(false);
                }
            }
        }
        StreamEvent::Done => done += 1,
        StreamEvent::Error(msg) => panic!("unexpected error: {}", msg),
    });

    assert_eq!(data, 4);
    assert_eq!(done, 1);
}
