//! The audio engine: streams, callbacks, lifecycle
//!
//! Two always-paired cpal streams make up the main path: an input stream
//! that mixes the mic down to mono and feeds a capture ring, and an output
//! stream whose callback is the heart of the engine — it pulls one block
//! from the capture ring, gates on the raw signal, snapshots the effect
//! parameters, runs the chain, writes the device output, feeds the monitor
//! ring and publishes the waveform/talking taps. An optional third stream
//! drains the monitor ring on its own device at its own cadence.
//!
//! `AudioEngine` owns the streams and is confined to the thread that created
//! it (cpal streams are not `Send`); the cloneable [`EngineHandle`] is what
//! crosses threads for parameter changes and tap polling.

use cpal::traits::{DeviceTrait, StreamTrait};
use parking_lot::RwLock;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use ringbuf::{traits::*, HeapRb};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::device;
use super::effects;
use super::error::AudioError;
use super::gate;
use super::monitor::MonitorBuffer;
use super::params::ParamStore;
use super::waveform::{WaveformTap, WAVEFORM_POINTS};

/// Capture ring length between the input and output callbacks, in units of
/// a tenth of a second. Three gives enough slack for scheduler jitter
/// without adding noticeable latency.
const CAPTURE_RING_TENTHS: usize = 3;

/// Monitor ring capacity in seconds of audio. Clear-on-silence keeps the
/// working set far below this; the cap only matters if the gate stays open
/// with monitoring disabled downstream.
const MONITOR_CAPACITY_SECS: usize = 2;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Stopped,
    Running,
}

/// Device binding and stream format, fixed for the engine's lifetime.
/// Changing devices means dropping the engine and constructing a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Input device name, `None` for the host default
    pub input_device: Option<String>,
    /// Main output device name, `None` for the host default
    pub output_device: Option<String>,
    /// Monitor output device name, `None` for the host default. The monitor
    /// typically targets real speakers while the main output feeds a
    /// virtual cable.
    pub monitor_device: Option<String>,
    pub sample_rate: u32,
    pub buffer_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            monitor_device: None,
            sample_rate: 44100,
            buffer_size: 512,
        }
    }
}

/// State shared between the audio callbacks and the control thread
struct EngineShared {
    params: ParamStore,
    monitor: MonitorBuffer,
    /// Whether the monitor path should accumulate processed audio
    monitoring: AtomicBool,
    /// Last gate decision, polled by the animation/indicator side
    talking: AtomicBool,
    waveform: WaveformTap,
    stream_error: RwLock<Option<AudioError>>,
    stream_failed: AtomicBool,
}

impl EngineShared {
    fn new(sample_rate: u32) -> Self {
        Self {
            params: ParamStore::new(sample_rate),
            monitor: MonitorBuffer::new(sample_rate as usize * MONITOR_CAPACITY_SECS),
            monitoring: AtomicBool::new(false),
            talking: AtomicBool::new(false),
            waveform: WaveformTap::new(),
            stream_error: RwLock::new(None),
            stream_failed: AtomicBool::new(false),
        }
    }

    fn record_stream_error(&self, message: String) {
        log::error!("stream error: {message}");
        *self.stream_error.write() = Some(AudioError::StreamIo(message));
        self.stream_failed.store(true, Ordering::SeqCst);
    }
}

/// Cloneable, thread-safe handle for the control surface: parameter writes
/// and tap polling. Lifecycle stays on [`AudioEngine`] itself.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    /// The parameter store; setters clamp, the audio thread snapshots
    pub fn params(&self) -> &ParamStore {
        &self.shared.params
    }

    /// Last gate decision — true while the user is loud enough to register
    pub fn is_talking(&self) -> bool {
        self.shared.talking.load(Ordering::Relaxed)
    }

    /// Latest processed-block waveform at display resolution
    pub fn waveform(&self) -> [f32; WAVEFORM_POINTS] {
        self.shared.waveform.snapshot()
    }

    /// Monitor-path underruns since engine creation (diagnostic only)
    pub fn monitor_underruns(&self) -> u64 {
        self.shared.monitor.underruns()
    }
}

struct RunningStreams {
    _input: cpal::Stream,
    _output: cpal::Stream,
    monitor: Option<cpal::Stream>,
}

pub struct AudioEngine {
    config: EngineConfig,
    shared: Arc<EngineShared>,
    streams: Option<RunningStreams>,
}

impl AudioEngine {
    /// Construct a stopped engine. No device I/O happens until `start()`.
    pub fn new(config: EngineConfig) -> Self {
        let mut config = config;
        config.sample_rate = config.sample_rate.max(1);
        config.buffer_size = config.buffer_size.max(1);
        let shared = Arc::new(EngineShared::new(config.sample_rate));
        Self {
            config,
            shared,
            streams: None,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        if self.streams.is_some() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    /// Whether the monitor path is enabled (stream open while running,
    /// preference recorded while stopped)
    pub fn is_monitoring(&self) -> bool {
        self.shared.monitoring.load(Ordering::SeqCst)
    }

    /// Open the main input/output streams (and the monitor stream if
    /// monitoring is enabled). A no-op when already running.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.streams.is_some() {
            log::warn!("engine already running, ignoring start()");
            return Ok(());
        }

        self.shared.stream_failed.store(false, Ordering::SeqCst);
        *self.shared.stream_error.write() = None;

        let sample_rate = self.config.sample_rate;
        let input_device = device::get_input_device(self.config.input_device.as_deref())?;
        let output_device = device::get_output_device(self.config.output_device.as_deref())?;
        let in_config = device::input_stream_config(&input_device, sample_rate)?;
        let out_config =
            device::output_stream_config(&output_device, sample_rate, self.config.buffer_size)?;

        log::info!(
            "starting engine: {} Hz, input '{}' ({}ch), output '{}' ({}ch)",
            sample_rate,
            input_device.name().unwrap_or_else(|_| "?".into()),
            in_config.channels,
            output_device.name().unwrap_or_else(|_| "?".into()),
            out_config.channels,
        );

        // Mono capture ring between the two callbacks
        let ring_len = (sample_rate as usize / 10) * CAPTURE_RING_TENTHS;
        let (mut capture_prod, mut capture_cons) = HeapRb::<f32>::new(ring_len.max(1024)).split();

        let in_channels = in_config.channels.max(1) as usize;
        let input_shared = Arc::clone(&self.shared);
        let input_stream = input_device
            .build_input_stream(
                &in_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(in_channels) {
                        let mono = frame.iter().copied().sum::<f32>() / in_channels as f32;
                        // drop samples when the ring is full rather than block
                        let _ = capture_prod.try_push(mono);
                    }
                },
                move |err| input_shared.record_stream_error(format!("input: {err}")),
                None,
            )
            .map_err(|e| {
                AudioError::DeviceUnavailable(format!("failed to build input stream: {e}"))
            })?;

        let out_channels = out_config.channels.max(1) as usize;
        let shared = Arc::clone(&self.shared);
        let mut block: Vec<f32> = vec![0.0; self.config.buffer_size as usize * 2];
        let mut rng = SmallRng::from_entropy();
        let mut snapshot = self.shared.params.snapshot();
        let output_shared = Arc::clone(&self.shared);
        let output_stream = output_device
            .build_output_stream(
                &out_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / out_channels;
                    if block.len() < frames {
                        block.resize(frames, 0.0);
                    }

                    // Raw input block; shortfall becomes leading silence
                    let got = capture_cons.pop_slice(&mut block[..frames]);
                    block[got..frames].fill(0.0);

                    // Gate on the unprocessed signal
                    let active = gate::is_active(&block[..frames]);

                    // Keep the previous snapshot if the control thread is
                    // mid-write
                    if let Some(params) = shared.params.try_snapshot() {
                        snapshot = params;
                    }

                    effects::process_block(&mut block[..frames], &snapshot, sample_rate, &mut rng);

                    for (sample, out) in block[..frames].iter().zip(data.chunks_mut(out_channels)) {
                        out.fill(*sample);
                    }

                    if shared.monitoring.load(Ordering::Relaxed) {
                        shared.monitor.push_if_active(&block[..frames], active);
                    }
                    shared.talking.store(active, Ordering::Relaxed);
                    shared.waveform.publish(&block[..frames]);
                },
                move |err| output_shared.record_stream_error(format!("output: {err}")),
                None,
            )
            .map_err(|e| {
                AudioError::DeviceUnavailable(format!("failed to build output stream: {e}"))
            })?;

        input_stream.play().map_err(|e| {
            AudioError::DeviceUnavailable(format!("failed to start input stream: {e}"))
        })?;
        output_stream.play().map_err(|e| {
            AudioError::DeviceUnavailable(format!("failed to start output stream: {e}"))
        })?;

        let monitor_stream = if self.is_monitoring() {
            self.shared.monitor.clear();
            Some(self.build_monitor_stream()?)
        } else {
            None
        };

        self.streams = Some(RunningStreams {
            _input: input_stream,
            _output: output_stream,
            monitor: monitor_stream,
        });
        log::info!("engine running");
        Ok(())
    }

    /// Tear down all streams. Safe to call at any time; calling it on a
    /// stopped engine is a no-op.
    pub fn stop(&mut self) {
        if self.streams.take().is_none() {
            log::debug!("stop() on a stopped engine, nothing to do");
            return;
        }
        self.shared.talking.store(false, Ordering::Relaxed);
        log::info!("engine stopped");
    }

    /// Enable the monitor path. Opens the monitor stream immediately when
    /// running; while stopped the preference is recorded and `start()`
    /// honors it. The monitor buffer starts empty either way.
    pub fn enable_monitoring(&mut self) -> Result<(), AudioError> {
        self.shared.monitor.clear();
        self.shared.monitoring.store(true, Ordering::SeqCst);

        let needs_stream = self
            .streams
            .as_ref()
            .is_some_and(|s| s.monitor.is_none());
        if needs_stream {
            let stream = self.build_monitor_stream()?;
            if let Some(streams) = self.streams.as_mut() {
                streams.monitor = Some(stream);
            }
            log::info!("monitoring enabled");
        }
        Ok(())
    }

    /// Disable the monitor path, closing its stream without disturbing the
    /// main streams.
    pub fn disable_monitoring(&mut self) {
        self.shared.monitoring.store(false, Ordering::SeqCst);
        if let Some(streams) = self.streams.as_mut() {
            if streams.monitor.take().is_some() {
                log::info!("monitoring disabled");
            }
        }
        self.shared.monitor.clear();
    }

    /// Surface a mid-stream device failure recorded by a callback. Returns
    /// the error after transitioning the engine to stopped; `None` while the
    /// streams are healthy. The control layer should poll this.
    pub fn take_error(&mut self) -> Option<AudioError> {
        if !self.shared.stream_failed.swap(false, Ordering::SeqCst) {
            return None;
        }
        let error = self
            .shared
            .stream_error
            .write()
            .take()
            .unwrap_or_else(|| AudioError::StreamIo("unknown stream failure".into()));
        self.stop();
        Some(error)
    }

    fn build_monitor_stream(&self) -> Result<cpal::Stream, AudioError> {
        let monitor_device = device::get_output_device(self.config.monitor_device.as_deref())?;
        let config = device::output_stream_config(
            &monitor_device,
            self.config.sample_rate,
            self.config.buffer_size,
        )?;

        log::info!(
            "opening monitor stream on '{}' ({}ch)",
            monitor_device.name().unwrap_or_else(|_| "?".into()),
            config.channels,
        );

        let channels = config.channels.max(1) as usize;
        let shared = Arc::clone(&self.shared);
        let error_shared = Arc::clone(&self.shared);
        let mut scratch: Vec<f32> = vec![0.0; self.config.buffer_size as usize * 2];

        let stream = monitor_device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    if scratch.len() < frames {
                        scratch.resize(frames, 0.0);
                    }
                    if shared.monitor.pull(&mut scratch[..frames]) {
                        for (sample, out) in
                            scratch[..frames].iter().zip(data.chunks_mut(channels))
                        {
                            out.fill(*sample);
                        }
                    } else {
                        // underrun: silence, never an error
                        data.fill(0.0);
                    }
                },
                move |err| error_shared.record_stream_error(format!("monitor: {err}")),
                None,
            )
            .map_err(|e| {
                AudioError::DeviceUnavailable(format!("failed to build monitor stream: {e}"))
            })?;

        stream.play().map_err(|e| {
            AudioError::DeviceUnavailable(format!("failed to start monitor stream: {e}"))
        })?;
        Ok(stream)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_engine_is_stopped_without_device_io() {
        let engine = AudioEngine::new(EngineConfig::default());
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(!engine.is_monitoring());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut engine = AudioEngine::new(EngineConfig::default());
        engine.stop();
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn handle_drives_the_shared_param_store() {
        let engine = AudioEngine::new(EngineConfig::default());
        let handle = engine.handle();
        handle.params().set_gain(42.0);
        handle.params().set_gain_enabled(true);

        let snap = engine.shared.params.snapshot();
        assert_eq!(snap.gain, 42.0);
        assert!(snap.gain_enabled);
    }

    #[test]
    fn monitoring_preference_is_recorded_while_stopped() {
        let mut engine = AudioEngine::new(EngineConfig::default());
        engine.enable_monitoring().unwrap();
        assert!(engine.is_monitoring());
        assert_eq!(engine.state(), EngineState::Stopped);

        engine.disable_monitoring();
        assert!(!engine.is_monitoring());
    }

    #[test]
    fn enabling_monitoring_empties_the_buffer() {
        let mut engine = AudioEngine::new(EngineConfig::default());
        engine.shared.monitor.push_if_active(&[0.5; 32], true);
        assert!(!engine.shared.monitor.is_empty());

        engine.enable_monitoring().unwrap();
        assert!(engine.shared.monitor.is_empty());
    }

    #[test]
    fn take_error_stops_the_engine_and_hands_over_the_error() {
        let mut engine = AudioEngine::new(EngineConfig::default());
        assert!(engine.take_error().is_none());

        engine.shared.record_stream_error("device unplugged".into());
        match engine.take_error() {
            Some(AudioError::StreamIo(message)) => {
                assert!(message.contains("device unplugged"));
            }
            other => panic!("expected StreamIo, got {:?}", other),
        }
        assert_eq!(engine.state(), EngineState::Stopped);
        // surfaced exactly once
        assert!(engine.take_error().is_none());
    }

    #[test]
    fn config_sanitizes_degenerate_values() {
        let engine = AudioEngine::new(EngineConfig {
            sample_rate: 0,
            buffer_size: 0,
            ..EngineConfig::default()
        });
        assert!(engine.config().sample_rate >= 1);
        assert!(engine.config().buffer_size >= 1);
    }
}
