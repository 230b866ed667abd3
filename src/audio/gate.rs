//! Voice-activity gate
//!
//! Per-block active/inactive decision based on the mean absolute amplitude of
//! the *raw* input block. Gating on the unprocessed signal keeps the decision
//! independent of how hard the effect chain is mangling the audio: cranking
//! the gain or the static does not change when the gate opens.
//!
//! The decision drives the monitor buffer (fill vs. clear) and the polled
//! "talking" indicator the UI animates on.

/// Mean absolute amplitude above which a block counts as voice activity
pub const GATE_THRESHOLD: f32 = 0.05;

/// Mean absolute amplitude of a block; 0.0 for an empty block
pub fn mean_abs(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}

/// True iff the raw input block is loud enough to count as activity
pub fn is_active(raw_block: &[f32]) -> bool {
    mean_abs(raw_block) > GATE_THRESHOLD
}
