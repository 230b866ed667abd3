//! Gated monitor ring buffer
//!
//! FIFO of processed samples between the main output callback (sole
//! producer) and the monitor output callback (sole consumer), each running
//! on its own real-time thread. Both halves of the ring sit behind their own
//! mutex; a lock is only ever held for one bounded slice operation, so the
//! producer and consumer cannot stall each other for longer than that.
//!
//! The producer appends only while the voice gate is active. On an inactive
//! block it clears the buffer outright instead of letting it drain, so muted
//! backlog never bursts out when the user starts talking again. Underruns on
//! the consumer side are not errors: the caller substitutes silence and a
//! diagnostic counter ticks up.

use parking_lot::Mutex;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct MonitorBuffer {
    producer: Mutex<HeapProd<f32>>,
    consumer: Mutex<HeapCons<f32>>,
    underruns: AtomicU64,
    overflow_dropped: AtomicU64,
}

impl MonitorBuffer {
    /// `capacity` is in samples; the engine sizes it at two seconds of audio,
    /// which clear-on-silence keeps far from full in practice.
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = HeapRb::<f32>::new(capacity.max(1)).split();
        Self {
            producer: Mutex::new(producer),
            consumer: Mutex::new(consumer),
            underruns: AtomicU64::new(0),
            overflow_dropped: AtomicU64::new(0),
        }
    }

    /// Append the block when the gate is active; clear everything when not.
    pub fn push_if_active(&self, samples: &[f32], active: bool) {
        if !active {
            self.clear();
            return;
        }
        let pushed = self.producer.lock().push_slice(samples);
        if pushed < samples.len() {
            let dropped = (samples.len() - pushed) as u64;
            self.overflow_dropped.fetch_add(dropped, Ordering::Relaxed);
            log::debug!("monitor buffer full, dropped {} samples", dropped);
        }
    }

    /// Fill `out` with the oldest buffered samples in FIFO order. Returns
    /// false without touching the buffer when fewer than `out.len()` samples
    /// are available; the caller outputs silence instead.
    pub fn pull(&self, out: &mut [f32]) -> bool {
        let mut consumer = self.consumer.lock();
        if consumer.occupied_len() < out.len() {
            self.underruns.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let popped = consumer.pop_slice(out);
        debug_assert_eq!(popped, out.len());
        true
    }

    /// Drop all buffered samples
    pub fn clear(&self) {
        let mut consumer = self.consumer.lock();
        while consumer.try_pop().is_some() {}
    }

    /// Number of samples currently buffered
    pub fn len(&self) -> usize {
        self.consumer.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pulls that came up short since creation
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_preserved() {
        let buf = MonitorBuffer::new(1024);
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        buf.push_if_active(&samples[..60], true);
        buf.push_if_active(&samples[60..], true);

        let mut out = vec![0.0f32; 100];
        assert!(buf.pull(&mut out));
        assert_eq!(out, samples);
        assert!(buf.is_empty());
    }

    #[test]
    fn short_pull_reports_insufficient_and_keeps_contents() {
        let buf = MonitorBuffer::new(1024);
        buf.push_if_active(&[0.1, 0.2, 0.3], true);

        let mut out = vec![0.0f32; 8];
        assert!(!buf.pull(&mut out));
        assert_eq!(buf.underruns(), 1);
        // nothing was consumed; an exact-size pull still succeeds
        let mut out = vec![0.0f32; 3];
        assert!(buf.pull(&mut out));
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn inactive_push_clears_backlog() {
        let buf = MonitorBuffer::new(1024);
        buf.push_if_active(&[0.5; 64], true);
        assert_eq!(buf.len(), 64);

        buf.push_if_active(&[0.0; 64], false);
        assert!(buf.is_empty());

        let mut out = vec![0.0f32; 1];
        assert!(!buf.pull(&mut out));
    }

    #[test]
    fn overflow_drops_newest_samples() {
        let buf = MonitorBuffer::new(16);
        buf.push_if_active(&[1.0; 32], true);
        assert_eq!(buf.len(), 16);

        let mut out = vec![0.0f32; 16];
        assert!(buf.pull(&mut out));
        assert_eq!(out, vec![1.0; 16]);
    }

    #[test]
    fn empty_pull_of_zero_samples_succeeds() {
        let buf = MonitorBuffer::new(16);
        let mut out: Vec<f32> = Vec::new();
        assert!(buf.pull(&mut out));
    }
}
