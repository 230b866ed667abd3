//! trashmic — real-time microphone degradation engine
//!
//! Captures a live mono microphone signal, runs it through a chain of
//! intentionally lo-fi effects (gain with clipping, sample-rate crush,
//! bit crush, additive static) and plays the result on an output device.
//! An optional monitoring stream replays the processed signal on a second
//! device through a voice-gated ring buffer, and a UI can poll a waveform
//! snapshot and a "talking" indicator without ever touching the audio
//! threads.

pub mod audio;

pub use audio::device::{list_input_devices, list_output_devices, AudioDeviceInfo};
pub use audio::engine::{AudioEngine, EngineConfig, EngineHandle, EngineState};
pub use audio::error::AudioError;
pub use audio::params::EffectParams;
pub use audio::waveform::WAVEFORM_POINTS;
