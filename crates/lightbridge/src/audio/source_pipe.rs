//! Audio device capture.
//!
//! Enumerates devices with cpal, opens a stream as close to the analysis
//! sample rate as the device allows and hands conditioned chunks to the
//! engine thread through a [`ChunkHandoff`].

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::handoff::ChunkHandoff;
use super::ingest::Conditioning;

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Rate the engine analyzes at
    pub sample_rate: u32,
    pub chunk_size: usize,
    pub conditioning: Conditioning,
    /// Give up on a device whose config query hangs this long
    pub device_timeout: Duration,
    /// Device to open first, by name
    pub preferred_device: Option<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: 18_000,
            chunk_size: 256,
            conditioning: Conditioning::default(),
            device_timeout: Duration::from_secs(3),
            preferred_device: None,
        }
    }
}

pub struct DeviceInfo {
    pub device: Device,
    pub name: String,
    pub is_input: bool,
}

/// Averages groups of `factor` samples down to one
struct Decimator {
    factor: usize,
    sum: f32,
    count: usize,
}

impl Decimator {
    fn new(factor: usize) -> Self {
        Self {
            factor: factor.max(1),
            sum: 0.0,
            count: 0,
        }
    }

    fn push(&mut self, sample: f32) -> Option<f32> {
        self.sum += sample;
        self.count += 1;
        if self.count < self.factor {
            return None;
        }
        let out = self.sum / self.factor as f32;
        self.sum = 0.0;
        self.count = 0;
        Some(out)
    }
}

/// Full-scale float sample to a raw 32-bit capture word
fn float_to_raw(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) as f64 * i32::MAX as f64) as i32
}

pub struct SourcePipe {
    handoff: ChunkHandoff,
    settings: CaptureSettings,
    devices: Vec<DeviceInfo>,
    current_device: usize,
    clipped: Arc<AtomicU64>,
    _stream: Option<Stream>,
}

impl SourcePipe {
    pub fn new(settings: CaptureSettings) -> Self {
        let devices = Self::collect_devices();
        let handoff = ChunkHandoff::new(settings.chunk_size);
        let clipped = Arc::new(AtomicU64::new(0));

        let start_index = settings
            .preferred_device
            .as_ref()
            .and_then(|name| devices.iter().position(|d| d.name == *name))
            .or_else(|| {
                let host = cpal::default_host();
                let default_input = host.default_input_device().and_then(|d| d.name().ok());
                default_input.and_then(|name| devices.iter().position(|d| d.is_input && d.name == name))
            })
            .or_else(|| devices.iter().position(|d| d.is_input))
            .unwrap_or(0);

        let stream = match devices.get(start_index) {
            Some(info) => Self::build_stream(info, &settings, handoff.clone(), Arc::clone(&clipped)),
            None => {
                log::error!("No audio devices found");
                None
            }
        };

        if stream.is_some() {
            let info = &devices[start_index];
            log::info!("[{}] Capturing from {} ({})", start_index, info.name, kind(info));
        }

        Self {
            handoff,
            settings,
            devices,
            current_device: start_index,
            clipped,
            _stream: stream,
        }
    }

    pub fn list_devices() {
        println!("\n=== Audio Devices ===");
        for (idx, info) in Self::collect_devices().iter().enumerate() {
            println!("  [{}] {} ({})", idx, info.name, kind(info));
        }
        println!();
    }

    fn collect_devices() -> Vec<DeviceInfo> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        if let Ok(input_devices) = host.input_devices() {
            for device in input_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: true,
                    });
                }
            }
        }

        // Output devices for loopback capture where the host supports it
        if let Ok(output_devices) = host.output_devices() {
            for device in output_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: false,
                    });
                }
            }
        }

        devices
    }

    /// Picks a stream config and the decimation that brings it to `sample_rate`.
    ///
    /// Config queries run on a helper thread since they can hang on bad devices.
    fn stream_config_with_timeout(info: &DeviceInfo, settings: &CaptureSettings) -> Option<(StreamConfig, usize)> {
        let device = info.device.clone();
        let is_input = info.is_input;
        let target = settings.sample_rate;
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let exact = if is_input {
                device.supported_input_configs().ok().and_then(|mut configs| {
                    configs.find(|c| {
                        c.sample_format() == SampleFormat::F32
                            && c.min_sample_rate().0 <= target
                            && c.max_sample_rate().0 >= target
                    })
                })
            } else {
                None
            };

            let result = match exact {
                Some(range) => Ok((range.with_sample_rate(SampleRate(target)).config(), 1)),
                None => {
                    let fallback = if is_input {
                        device.default_input_config()
                    } else {
                        device.default_output_config()
                    };
                    fallback.map(|c| {
                        let rate = c.sample_rate().0;
                        let factor = ((rate as f32 / target as f32).round() as usize).max(1);
                        (c.config(), factor)
                    })
                }
            };
            let _ = tx.send(result);
        });

        match rx.recv_timeout(settings.device_timeout) {
            Ok(Ok(found)) => Some(found),
            Ok(Err(e)) => {
                log::warn!("  Failed to get config: {}", e);
                None
            }
            Err(_) => {
                log::warn!("  Device config timed out after {:?}", settings.device_timeout);
                None
            }
        }
    }

    fn build_stream(
        info: &DeviceInfo,
        settings: &CaptureSettings,
        handoff: ChunkHandoff,
        clipped: Arc<AtomicU64>,
    ) -> Option<Stream> {
        let (stream_config, factor) = Self::stream_config_with_timeout(info, settings)?;
        let channels = stream_config.channels.max(1) as usize;
        let effective_rate = stream_config.sample_rate.0 as f32 / factor as f32;
        if (effective_rate - settings.sample_rate as f32).abs() > settings.sample_rate as f32 * 0.05 {
            log::warn!(
                "Device runs at {} Hz, analysis sees {:.0} Hz instead of {} Hz",
                stream_config.sample_rate.0,
                effective_rate,
                settings.sample_rate
            );
        }

        let conditioning = settings.conditioning;
        let mut decimator = Decimator::new(factor);
        let err_fn = |err| log::error!("Audio stream error: {}", err);

        let stream = info.device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut clips = 0u64;
                handoff.push_samples(data.chunks(channels).filter_map(|frame| {
                    let mono = frame.iter().sum::<f32>() / channels as f32;
                    let (sample, clip) = conditioning.apply(float_to_raw(decimator.push(mono)?));
                    clips += u64::from(clip);
                    Some(sample)
                }));
                if clips > 0 {
                    clipped.fetch_add(clips, Ordering::Relaxed);
                }
            },
            err_fn,
            None,
        );

        match stream {
            Ok(s) => {
                if let Err(e) = s.play() {
                    log::warn!("  Failed to play stream: {}", e);
                    return None;
                }
                Some(s)
            }
            Err(e) => {
                log::warn!("  Failed to build stream: {}", e);
                None
            }
        }
    }

    /// Attempts to select a device.
    /// Returns Some((device_name, success)) if a switch was attempted, None if the index is invalid.
    pub fn select_device(&mut self, index: usize) -> Option<(String, bool)> {
        let info = self.devices.get(index)?;
        if index == self.current_device && self._stream.is_some() {
            return Some((info.name.clone(), true));
        }

        let device_name = info.name.clone();
        log::info!("[{}] Selecting: {} ({})", index, device_name, kind(info));

        self.handoff.clear();
        match Self::build_stream(info, &self.settings, self.handoff.clone(), Arc::clone(&self.clipped)) {
            Some(stream) => {
                self._stream = Some(stream);
                self.current_device = index;
                self.settings.preferred_device = Some(device_name.clone());
                Some((device_name, true))
            }
            None => {
                log::warn!("  -> could not open {}", device_name);
                Some((device_name, false))
            }
        }
    }

    /// Reopens the current device when capture settings changed
    pub fn apply_settings(&mut self, settings: CaptureSettings) {
        if settings == self.settings {
            return;
        }
        let chunk_changed = settings.chunk_size != self.settings.chunk_size;
        self.settings = settings;
        if chunk_changed {
            self.handoff = ChunkHandoff::new(self.settings.chunk_size);
        }

        // Drop the old stream before opening the device again
        self._stream = None;
        let index = self.current_device;
        if let Some((name, false)) = self.select_device(index) {
            log::warn!("Capture settings changed but {} failed to reopen", name);
        }
    }

    /// Copies the freshest complete chunk into `out`
    pub fn take_latest(&self, out: &mut Vec<i16>) -> bool {
        self.handoff.take_latest(out)
    }

    pub fn handoff(&self) -> &ChunkHandoff {
        &self.handoff
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn device_name(&self) -> Option<&str> {
        self.devices.get(self.current_device).map(|d| d.name.as_str())
    }

    pub fn is_capturing(&self) -> bool {
        self._stream.is_some()
    }

    /// Samples clipped by conditioning since the pipe opened
    pub fn clipped(&self) -> u64 {
        self.clipped.load(Ordering::Relaxed)
    }

    /// Chunks overwritten before the engine read them
    pub fn overruns(&self) -> u64 {
        self.handoff.overruns()
    }
}

fn kind(info: &DeviceInfo) -> &'static str {
    if info.is_input {
        "input"
    } else {
        "output"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimator_averages_groups() {
        let mut decimator = Decimator::new(3);
        let out: Vec<f32> = [1.0, 2.0, 3.0, 4.0, 4.0, 4.0, 9.0]
            .into_iter()
            .filter_map(|s| decimator.push(s))
            .collect();
        assert_eq!(out, vec![2.0, 4.0]);
    }

    #[test]
    fn test_decimator_passthrough() {
        let mut decimator = Decimator::new(0);
        assert_eq!(decimator.push(0.25), Some(0.25));
    }

    #[test]
    fn test_float_to_raw_conditions_to_full_scale() {
        let conditioning = Conditioning::default();
        assert_eq!(conditioning.apply(float_to_raw(0.0)).0, 0);
        let (loud, clipped) = conditioning.apply(float_to_raw(1.0));
        assert_eq!(loud, i16::MAX);
        assert!(!clipped);
        let (quiet, _) = conditioning.apply(float_to_raw(-0.5));
        assert!((quiet as i32 + 16384).abs() <= 1);
    }
}
