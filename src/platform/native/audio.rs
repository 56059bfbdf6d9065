use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::worker::OpenedDevice;
use crate::errors::PlatformError;

/// Open an input device and keep its stream playing. Runs on a worker thread.
pub(crate) fn open_microphone(device_name: Option<&str>) -> Result<OpenedDevice, PlatformError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| {
                PlatformError::not_readable(format!("Failed to enumerate audio devices: {}", e))
            })?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| {
                PlatformError::not_found(format!("Audio input device '{}' not found", name))
            })?,
        None => host
            .default_input_device()
            .ok_or_else(|| PlatformError::not_found("No default audio input device"))?,
    };

    let label = device
        .name()
        .unwrap_or_else(|_| "Unknown microphone".to_string());
    let supported = device.default_input_config().map_err(|e| {
        PlatformError::not_readable(format!("Failed to read input config: {}", e))
    })?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build::<f32>(&device, &config),
        cpal::SampleFormat::I16 => build::<i16>(&device, &config),
        cpal::SampleFormat::U16 => build::<u16>(&device, &config),
        other => {
            return Err(PlatformError::overconstrained(format!(
                "Unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(classify_build_error)?;

    stream
        .play()
        .map_err(|e| PlatformError::not_readable(format!("Failed to start microphone: {}", e)))?;

    Ok(OpenedDevice {
        label,
        release: Box::new(move || {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause microphone stream: {}", e);
            }
            drop(stream);
        }),
    })
}

fn build<T: cpal::SizedSample>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    // Samples are not consumed here; holding the stream keeps the device claimed.
    device.build_input_stream(
        config,
        move |_data: &[T], _: &cpal::InputCallbackInfo| {},
        |e| log::warn!("Microphone stream error: {}", e),
        None,
    )
}

fn classify_build_error(error: cpal::BuildStreamError) -> PlatformError {
    match error {
        cpal::BuildStreamError::DeviceNotAvailable => {
            PlatformError::not_found("Audio input device is no longer available")
        }
        cpal::BuildStreamError::StreamConfigNotSupported
        | cpal::BuildStreamError::InvalidArgument => {
            PlatformError::overconstrained(error.to_string())
        }
        other => PlatformError::not_readable(other.to_string()),
    }
}
