use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for one sample stream, shared between the reader thread and
/// consumers
pub struct StreamMetrics {
    device_index: u32,
    started_at: Instant,
    buffers_delivered: AtomicU64,
    bytes_delivered: AtomicU64,
    buffers_dropped: AtomicU64,
    faults: AtomicU64,
}

impl StreamMetrics {
    pub fn new(device_index: u32) -> Self {
        Self {
            device_index,
            started_at: Instant::now(),
            buffers_delivered: AtomicU64::new(0),
            bytes_delivered: AtomicU64::new(0),
            buffers_dropped: AtomicU64::new(0),
            faults: AtomicU64::new(0),
        }
    }

    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    pub fn buffers_delivered(&self) -> u64 {
        self.buffers_delivered.load(Ordering::Relaxed)
    }

    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered.load(Ordering::Relaxed)
    }

    /// Buffers read from the transport that no consumer received
    pub fn buffers_dropped(&self) -> u64 {
        self.buffers_dropped.load(Ordering::Relaxed)
    }

    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    pub fn record_buffer(&self, len: usize) {
        self.buffers_delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.buffers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Average delivered throughput since the stream started
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.started_at.elapsed().as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes_delivered() as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_buffers() {
        let metrics = StreamMetrics::new(0);
        metrics.record_buffer(512);
        metrics.record_buffer(1024);
        metrics.record_dropped();

        assert_eq!(metrics.buffers_delivered(), 2);
        assert_eq!(metrics.bytes_delivered(), 1536);
        assert_eq!(metrics.buffers_dropped(), 1);
        assert_eq!(metrics.faults(), 0);
    }
}
