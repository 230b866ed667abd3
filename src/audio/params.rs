//! Effect parameters and the store shared with the audio thread
//!
//! The control surface writes individual parameters at whatever rate the UI
//! produces them; the audio callback copies the whole set out once per block.
//! A single `RwLock` around a `Copy` value gives snapshot semantics for free:
//! a reader either sees the previous value or the new one, never a torn mix.
//! The audio side uses `try_read` and keeps its previous snapshot when the
//! control thread happens to hold the write lock, so the callback never
//! blocks on a UI-priority thread.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Smallest allowed gain multiplier; keeps the "gain > 0" invariant even if
/// the control surface hands us zero or garbage
const GAIN_MIN: f32 = 1e-6;

/// Largest allowed bit depth; 2^32 is still exact in the f32 math used by
/// the quantizer, and the UI tops out well below this anyway
const BIT_DEPTH_MAX: u32 = 32;

/// One consistent set of effect parameters.
///
/// This is the snapshot the audio callback works from for an entire block.
/// Defaults match the original control surface: gain 200, downsample to
/// 8 kHz, 2-bit depth, half-intensity static, everything switched off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParams {
    pub gain: f32,
    pub gain_enabled: bool,
    /// Target rate for the rate-reduction artifact, in Hz
    pub downsample_rate: u32,
    pub downsample_enabled: bool,
    pub bit_depth: u32,
    pub bit_depth_enabled: bool,
    /// Static noise amplitude, 0.0 - 1.0
    pub static_intensity: f32,
    pub static_enabled: bool,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            gain: 200.0,
            gain_enabled: false,
            downsample_rate: 8000,
            downsample_enabled: false,
            bit_depth: 2,
            bit_depth_enabled: false,
            static_intensity: 0.5,
            static_enabled: false,
        }
    }
}

/// Shared parameter store, written by the control thread and snapshotted by
/// the audio thread. One instance per engine, owned by the engine's shared
/// state.
pub struct ParamStore {
    current: RwLock<EffectParams>,
    /// Stream sample rate, upper bound for `downsample_rate`
    source_rate: u32,
}

impl ParamStore {
    pub fn new(source_rate: u32) -> Self {
        Self::with_params(EffectParams::default(), source_rate)
    }

    pub fn with_params(params: EffectParams, source_rate: u32) -> Self {
        let source_rate = source_rate.max(1);
        Self {
            current: RwLock::new(clamp(params, source_rate)),
            source_rate,
        }
    }

    /// Non-blocking snapshot for the audio thread. `None` means the control
    /// thread is mid-write; the caller keeps using its previous snapshot.
    pub fn try_snapshot(&self) -> Option<EffectParams> {
        self.current.try_read().map(|guard| *guard)
    }

    /// Blocking snapshot for the control thread (status display, tests)
    pub fn snapshot(&self) -> EffectParams {
        *self.current.read()
    }

    /// Replace the whole parameter set at once (clamped)
    pub fn set_params(&self, params: EffectParams) {
        *self.current.write() = clamp(params, self.source_rate);
    }

    pub fn set_gain(&self, gain: f32) {
        self.current.write().gain = gain.max(GAIN_MIN);
    }

    pub fn set_gain_enabled(&self, enabled: bool) {
        self.current.write().gain_enabled = enabled;
    }

    pub fn set_downsample_rate(&self, rate: u32) {
        self.current.write().downsample_rate = rate.clamp(1, self.source_rate);
    }

    pub fn set_downsample_enabled(&self, enabled: bool) {
        self.current.write().downsample_enabled = enabled;
    }

    pub fn set_bit_depth(&self, depth: u32) {
        self.current.write().bit_depth = depth.clamp(1, BIT_DEPTH_MAX);
    }

    pub fn set_bit_depth_enabled(&self, enabled: bool) {
        self.current.write().bit_depth_enabled = enabled;
    }

    pub fn set_static_intensity(&self, intensity: f32) {
        self.current.write().static_intensity = intensity.clamp(0.0, 1.0);
    }

    pub fn set_static_enabled(&self, enabled: bool) {
        self.current.write().static_enabled = enabled;
    }
}

fn clamp(mut params: EffectParams, source_rate: u32) -> EffectParams {
    params.gain = params.gain.max(GAIN_MIN);
    params.downsample_rate = params.downsample_rate.clamp(1, source_rate);
    params.bit_depth = params.bit_depth.clamp(1, BIT_DEPTH_MAX);
    params.static_intensity = params.static_intensity.clamp(0.0, 1.0);
    params
}
