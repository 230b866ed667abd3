//! Real-time voice degradation core
//!
//! Provides:
//! - A parameter store with torn-write-free snapshots for the audio thread
//! - The degradation effect chain (gain/clip, rate crush, bit crush, static)
//! - A voice-activity gate driving monitoring and the talking indicator
//! - A gated SPSC ring buffer feeding an independent monitor stream
//! - The cpal engine tying the streams together

pub mod device;
pub mod effects;
pub mod engine;
pub mod error;
pub mod gate;
pub mod monitor;
pub mod params;
pub mod waveform;
