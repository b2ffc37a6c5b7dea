//! Microphone capture.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};

use crate::error::{Error, Result};

use super::bus::InputPort;

/// Anything that can turn a capture request into a live stream or a denial.
pub trait InputDevice {
    fn open(&self, port: InputPort) -> Result<CaptureStream>;
}

/// Keeps a capture running for as long as it is alive.
pub struct CaptureStream {
    _stream: Option<cpal::Stream>,
}

impl CaptureStream {
    /// A stream with no platform resources behind it.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self { _stream: None }
    }
}

/// The host's default input device.
#[derive(Debug, Default)]
pub struct CpalInput;

impl InputDevice for CpalInput {
    fn open(&self, port: InputPort) -> Result<CaptureStream> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::PermissionDenied("no input device available".into()))?;
        let supported = device
            .default_input_config()
            .map_err(|e| Error::PermissionDenied(e.to_string()))?;

        let channels = supported.channels().max(1) as usize;
        let config: cpal::StreamConfig = supported.config();

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, port),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, port),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, port),
            other => Err(Error::PermissionDenied(format!(
                "unsupported sample format: {other}"
            ))),
        }?;

        stream
            .play()
            .map_err(|e| Error::PermissionDenied(e.to_string()))?;

        log::info!(
            "capture: microphone open ({} ch @ {} Hz)",
            channels,
            config.sample_rate.0
        );
        Ok(CaptureStream {
            _stream: Some(stream),
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    port: InputPort,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut mono: Vec<f32> = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                mono.clear();
                for frame in data.chunks_exact(channels) {
                    let sum: f32 = frame.iter().map(|s| s.to_sample::<f32>()).sum();
                    mono.push(sum / channels as f32);
                }
                port.push(&mono);
            },
            |err| log::warn!("capture: stream error: {err}"),
            None,
        )
        .map_err(|e| Error::PermissionDenied(e.to_string()))
}
