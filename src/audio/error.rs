//! Engine error types
//!
//! Only lifecycle operations (device lookup, stream open, stream start) can
//! fail. Everything on the audio path is total: bad parameter values are
//! clamped at the store boundary and monitor underruns are handled with
//! silence, so neither ever surfaces as an error.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// A device could not be found, opened, or started. Fatal to `start()`
    /// (or `enable_monitoring()`); the engine stays stopped.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device layer reported a failure on a running stream. Recorded by
    /// the stream error callback and surfaced via `AudioEngine::take_error`,
    /// which stops the engine. No automatic restart is attempted.
    #[error("audio stream I/O error: {0}")]
    StreamIo(String),
}
