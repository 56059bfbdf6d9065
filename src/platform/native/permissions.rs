//! Desktop permission registry.
//!
//! Camera state can be read on all three desktop platforms. Microphone
//! state is only readable through AVFoundation; elsewhere it is reported as
//! not queryable.

use async_trait::async_trait;

use crate::errors::PlatformError;
use crate::platform::PermissionQuery;
use crate::types::{Capability, PermissionState};

#[derive(Debug, Default, Clone, Copy)]
pub struct NativePermissionQuery;

#[async_trait]
impl PermissionQuery for NativePermissionQuery {
    async fn query(&self, capability: Capability) -> Result<Option<PermissionState>, PlatformError> {
        // Platform checks touch device nodes and spawn processes
        tokio::task::spawn_blocking(move || match capability {
            Capability::Camera => camera_permission(),
            Capability::Microphone => microphone_permission(),
        })
        .await
        .map_err(|e| PlatformError::aborted(format!("Permission query task failed: {}", e)))
    }
}

#[cfg(target_os = "windows")]
fn camera_permission() -> Option<PermissionState> {
    // Windows exposes no status API; enumeration succeeding is the best proxy
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(devices) if !devices.is_empty() => Some(PermissionState::Granted),
        Ok(_) => Some(PermissionState::PromptRequired),
        Err(e) => {
            log::debug!("Camera enumeration failed: {}", e);
            Some(PermissionState::Denied)
        }
    }
}

#[cfg(target_os = "macos")]
fn camera_permission() -> Option<PermissionState> {
    authorization_status("vide")
}

#[cfg(target_os = "linux")]
fn camera_permission() -> Option<PermissionState> {
    use std::fs::OpenOptions;
    use std::io::ErrorKind;
    use std::path::Path;

    let first_device = (0..10)
        .map(|i| format!("/dev/video{}", i))
        .find(|path| Path::new(path).exists());

    let Some(device) = first_device else {
        log::debug!("No video devices found at /dev/video*");
        return Some(PermissionState::PromptRequired);
    };

    match OpenOptions::new().read(true).open(&device) {
        Ok(_) => Some(PermissionState::Granted),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            log::debug!(
                "{} is not readable; add the user to the video group: sudo usermod -a -G video $USER",
                device
            );
            Some(PermissionState::Denied)
        }
        Err(e) => {
            log::debug!("Cannot open {}: {}, falling back to group check", device, e);
            if in_video_group() {
                Some(PermissionState::Granted)
            } else {
                Some(PermissionState::PromptRequired)
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn in_video_group() -> bool {
    use std::process::Command;

    Command::new("groups")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|groups| {
            groups
                .split_whitespace()
                .any(|g| g == "video" || g == "plugdev")
        })
        .unwrap_or(false)
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn camera_permission() -> Option<PermissionState> {
    None
}

#[cfg(target_os = "macos")]
fn microphone_permission() -> Option<PermissionState> {
    authorization_status("soun")
}

#[cfg(not(target_os = "macos"))]
fn microphone_permission() -> Option<PermissionState> {
    None
}

/// AVCaptureDevice authorization status for an AVMediaType string
#[cfg(target_os = "macos")]
fn authorization_status(media_type: &str) -> Option<PermissionState> {
    use objc::runtime::{Class, Object};
    use objc::{msg_send, sel, sel_impl};
    use std::ffi::CString;

    let device_class = Class::get("AVCaptureDevice")?;
    let string_class = Class::get("NSString")?;
    let media_type = CString::new(media_type).ok()?;

    unsafe {
        let ns_media_type: *mut Object =
            msg_send![string_class, stringWithUTF8String: media_type.as_ptr()];
        let status: isize =
            msg_send![device_class, authorizationStatusForMediaType: ns_media_type];

        // AVAuthorizationStatus: 0 NotDetermined, 1 Restricted, 2 Denied, 3 Authorized
        Some(match status {
            3 => PermissionState::Granted,
            1 | 2 => PermissionState::Denied,
            0 => PermissionState::PromptRequired,
            _ => PermissionState::Error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_does_not_fail() {
        let query = NativePermissionQuery;
        assert!(query.query(Capability::Camera).await.is_ok());
        assert!(query.query(Capability::Microphone).await.is_ok());
    }

    #[cfg(not(target_os = "macos"))]
    #[tokio::test]
    async fn test_microphone_not_queryable() {
        let state = NativePermissionQuery.query(Capability::Microphone).await.unwrap();
        assert_eq!(state, None);
    }
}
