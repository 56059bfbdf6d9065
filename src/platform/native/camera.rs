use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};

use super::worker::OpenedDevice;
use crate::errors::PlatformError;

/// Open the camera at `index` and start its stream. Runs on a worker thread.
pub(crate) fn open_camera(index: u32) -> Result<OpenedDevice, PlatformError> {
    let devices = nokhwa::query(ApiBackend::Auto).map_err(|e| classify(&e))?;
    if devices.is_empty() {
        return Err(PlatformError::not_found("No camera devices detected"));
    }
    if index as usize >= devices.len() {
        return Err(PlatformError::overconstrained(format!(
            "Camera index {} out of range ({} devices)",
            index,
            devices.len()
        )));
    }

    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera =
        Camera::new(CameraIndex::Index(index), requested).map_err(|e| classify(&e))?;
    camera.open_stream().map_err(|e| classify(&e))?;

    let label = camera.info().human_name();
    Ok(OpenedDevice {
        label,
        release: Box::new(move || {
            let mut camera = camera;
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop camera stream: {}", e);
            }
        }),
    })
}

fn classify(error: &NokhwaError) -> PlatformError {
    let text = error.to_string();
    let lower = text.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        return PlatformError::not_allowed(text);
    }

    match error {
        NokhwaError::OpenDeviceError(_, _) | NokhwaError::OpenStreamError(_) => {
            PlatformError::not_readable(text)
        }
        NokhwaError::UnsupportedOperationError(_) | NokhwaError::NotImplementedError(_) => {
            PlatformError::not_supported(text)
        }
        _ => PlatformError::new("NokhwaError", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_open_errors() {
        let err = classify(&NokhwaError::OpenStreamError("device busy".to_string()));
        assert_eq!(err.name, "NotReadableError");

        let err = classify(&NokhwaError::GeneralError("Permission denied".to_string()));
        assert_eq!(err.name, "NotAllowedError");

        let err = classify(&NokhwaError::GeneralError("something odd".to_string()));
        assert_eq!(err.name, "NokhwaError");
    }

    #[test]
    #[ignore = "Requires camera hardware - run manually"]
    fn test_open_first_camera() {
        let device = open_camera(0).expect("camera should open");
        assert!(!device.label.is_empty());
        (device.release)();
    }
}
