//! Audio device lookup and stream configuration
//!
//! Devices are addressed by name (cpal's stable identifier across hosts),
//! with `None` meaning the host default. The engine's sample rate is fixed
//! at construction, so config selection here refuses devices that cannot run
//! at that rate instead of silently falling back to a different one.

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use super::error::AudioError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List available input devices
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .as_ref()
        .and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceUnavailable(format!("failed to enumerate input devices: {e}")))?;

    let mut result = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            result.push(AudioDeviceInfo {
                is_default: Some(&name) == default_name.as_ref(),
                name,
            });
        }
    }
    Ok(result)
}

/// List available output devices
pub fn list_output_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .as_ref()
        .and_then(|d| d.name().ok());

    let devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceUnavailable(format!("failed to enumerate output devices: {e}")))?;

    let mut result = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            result.push(AudioDeviceInfo {
                is_default: Some(&name) == default_name.as_ref(),
                name,
            });
        }
    }
    Ok(result)
}

/// Get input device by name, or the host default if `None`
pub fn get_input_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    match name {
        Some(device_name) => {
            let devices = host.input_devices().map_err(|e| {
                AudioError::DeviceUnavailable(format!("failed to enumerate input devices: {e}"))
            })?;
            for device in devices {
                if let Ok(name) = device.name() {
                    if name == device_name {
                        return Ok(device);
                    }
                }
            }
            Err(AudioError::DeviceUnavailable(format!(
                "input device '{device_name}' not found"
            )))
        }
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default input device".into())),
    }
}

/// Get output device by name, or the host default if `None`
pub fn get_output_device(name: Option<&str>) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    match name {
        Some(device_name) => {
            let devices = host.output_devices().map_err(|e| {
                AudioError::DeviceUnavailable(format!("failed to enumerate output devices: {e}"))
            })?;
            for device in devices {
                if let Ok(name) = device.name() {
                    if name == device_name {
                        return Ok(device);
                    }
                }
            }
            Err(AudioError::DeviceUnavailable(format!(
                "output device '{device_name}' not found"
            )))
        }
        None => host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default output device".into())),
    }
}

/// Input stream config at the engine's sample rate. The device keeps its
/// own channel count (capped at stereo); the capture callback mixes down to
/// mono.
pub fn input_stream_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<cpal::StreamConfig, AudioError> {
    let supported = device.supported_input_configs().map_err(|e| {
        AudioError::DeviceUnavailable(format!("failed to query input configs: {e}"))
    })?;

    for config in supported {
        if sample_rate >= config.min_sample_rate().0 && sample_rate <= config.max_sample_rate().0 {
            return Ok(cpal::StreamConfig {
                channels: config.channels().min(2),
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            });
        }
    }

    Err(AudioError::DeviceUnavailable(format!(
        "input device does not support {sample_rate} Hz"
    )))
}

/// Output stream config at the engine's sample rate and preferred block size
pub fn output_stream_config(
    device: &cpal::Device,
    sample_rate: u32,
    buffer_size: u32,
) -> Result<cpal::StreamConfig, AudioError> {
    let supported = device.supported_output_configs().map_err(|e| {
        AudioError::DeviceUnavailable(format!("failed to query output configs: {e}"))
    })?;

    for config in supported {
        if sample_rate >= config.min_sample_rate().0 && sample_rate <= config.max_sample_rate().0 {
            return Ok(cpal::StreamConfig {
                channels: config.channels().min(2),
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Fixed(buffer_size),
            });
        }
    }

    Err(AudioError::DeviceUnavailable(format!(
        "output device does not support {sample_rate} Hz"
    )))
}
