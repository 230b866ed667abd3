//! Waveform tap for visualization polling
//!
//! After each processed block the main callback publishes a fixed-resolution
//! waveform snapshot the UI can poll at its own pace. Publication is a loop
//! of relaxed atomic stores over f32 bit patterns — nothing for the audio
//! thread to block on, and a slow (or absent) UI costs the callback nothing.
//! A reader may observe points from two adjacent blocks during a store; for
//! a scope-style display that is harmless.

use std::sync::atomic::{AtomicU32, Ordering};

use super::effects::resample_linear;

/// Fixed display resolution of the published waveform
pub const WAVEFORM_POINTS: usize = 100;

#[inline]
fn f32_to_u32(f: f32) -> u32 {
    f.to_bits()
}

#[inline]
fn u32_to_f32(u: u32) -> f32 {
    f32::from_bits(u)
}

pub struct WaveformTap {
    points: [AtomicU32; WAVEFORM_POINTS],
}

impl WaveformTap {
    pub fn new() -> Self {
        const ZERO: AtomicU32 = AtomicU32::new(0);
        Self {
            points: [ZERO; WAVEFORM_POINTS],
        }
    }

    /// Resize the block to the display resolution and publish it. Empty
    /// blocks are ignored, keeping the previous frame on screen.
    pub fn publish(&self, block: &[f32]) {
        if block.is_empty() {
            return;
        }
        let resized = resample_linear(block, WAVEFORM_POINTS);
        for (slot, value) in self.points.iter().zip(resized) {
            slot.store(f32_to_u32(value), Ordering::Relaxed);
        }
    }

    /// Latest published waveform, one value per display point
    pub fn snapshot(&self) -> [f32; WAVEFORM_POINTS] {
        let mut out = [0.0f32; WAVEFORM_POINTS];
        for (value, slot) in out.iter_mut().zip(&self.points) {
            *value = u32_to_f32(slot.load(Ordering::Relaxed));
        }
        out
    }
}

impl Default for WaveformTap {
    fn default() -> Self {
        Self::new()
    }
}
