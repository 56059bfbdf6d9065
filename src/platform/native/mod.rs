//! Desktop adapter: camera through nokhwa, microphone through cpal.

#[cfg(feature = "audio")]
mod audio;
mod camera;
mod permissions;
mod worker;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::NativeConfig;
use crate::errors::PlatformError;
use crate::platform::{stop_tracks, MediaPlatform, MediaStream, MediaTrack, PermissionQuery};
use crate::types::{Capability, CaptureRequest};

pub use permissions::NativePermissionQuery;
pub use worker::NativeTrack;

#[derive(Debug, Clone, Default)]
pub struct NativeMediaPlatform {
    config: NativeConfig,
    permissions: NativePermissionQuery,
}

impl NativeMediaPlatform {
    pub fn new(config: NativeConfig) -> Self {
        Self {
            config,
            permissions: NativePermissionQuery,
        }
    }

    fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.config.open_timeout_ms)
    }

    async fn open_camera(&self) -> Result<NativeTrack, PlatformError> {
        let index = self.config.camera_index;
        worker::open_track(Capability::Camera, self.open_timeout(), move || {
            camera::open_camera(index)
        })
        .await
    }

    #[cfg(feature = "audio")]
    async fn open_microphone(&self) -> Result<NativeTrack, PlatformError> {
        let device_name = self.config.audio_device.clone();
        worker::open_track(Capability::Microphone, self.open_timeout(), move || {
            audio::open_microphone(device_name.as_deref())
        })
        .await
    }

    #[cfg(not(feature = "audio"))]
    async fn open_microphone(&self) -> Result<NativeTrack, PlatformError> {
        Err(PlatformError::not_supported(
            "Microphone capture requires the audio feature",
        ))
    }
}

#[async_trait]
impl MediaPlatform for NativeMediaPlatform {
    fn name(&self) -> &str {
        "native"
    }

    fn is_supported(&self) -> bool {
        cfg!(any(
            target_os = "windows",
            target_os = "macos",
            target_os = "linux"
        ))
    }

    async fn acquire(&self, request: CaptureRequest) -> Result<MediaStream, PlatformError> {
        if !request.video && !request.audio {
            return Err(PlatformError::invalid(
                "At least one of video or audio must be requested",
            ));
        }

        let mut tracks: Vec<Box<dyn MediaTrack>> = Vec::new();

        if request.video {
            tracks.push(Box::new(self.open_camera().await?));
        }

        if request.audio {
            match self.open_microphone().await {
                Ok(track) => tracks.push(Box::new(track)),
                Err(e) => {
                    // no partial streams
                    stop_tracks(&tracks);
                    return Err(e);
                }
            }
        }

        Ok(MediaStream::new(tracks))
    }

    fn permissions(&self) -> Option<&dyn PermissionQuery> {
        Some(&self.permissions)
    }
}
