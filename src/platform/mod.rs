//! Platform ports consumed by the media access manager.
//!
//! A [`MediaPlatform`] turns a [`CaptureRequest`] into a [`MediaStream`] of
//! independently stoppable tracks. An optional [`PermissionQuery`] reports
//! the current authorization state per capability without opening hardware.
//!
//! Adapters:
//! - [`native::NativeMediaPlatform`] for desktop hosts
//! - [`crate::testing::FakeMediaPlatform`] for scripted tests

pub mod native;

use async_trait::async_trait;
use std::fmt;

use crate::errors::PlatformError;
use crate::types::{Capability, CaptureRequest, TrackInfo};

pub use native::NativeMediaPlatform;

/// Device-media acquisition facility
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Adapter name used in logs
    fn name(&self) -> &str;

    /// Whether the acquisition facility exists at all on this host
    fn is_supported(&self) -> bool;

    /// Open hardware for the request. Resolves once the platform answers.
    async fn acquire(&self, request: CaptureRequest) -> Result<MediaStream, PlatformError>;

    /// Permission registry, when the platform has one
    fn permissions(&self) -> Option<&dyn PermissionQuery> {
        None
    }
}

/// Permission registry
#[async_trait]
pub trait PermissionQuery: Send + Sync {
    /// `Ok(None)` when this capability name cannot be queried on the platform.
    async fn query(
        &self,
        capability: Capability,
    ) -> Result<Option<crate::types::PermissionState>, PlatformError>;
}

/// One hardware track owned by a stream
pub trait MediaTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
    fn capability(&self) -> Capability;
    fn label(&self) -> &str;
    /// Release the underlying hardware. Must be idempotent.
    fn stop(&self);
    fn is_live(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

/// Stream handle produced by an adapter.
///
/// Consumers receive it behind an `Arc` and can inspect it, but only the
/// owning manager can stop its tracks.
#[derive(Debug)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Box<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks
            .iter()
            .map(|track| TrackInfo {
                id: track.id().to_string(),
                capability: track.capability(),
                label: track.label().to_string(),
                live: track.is_live(),
                enabled: track.is_enabled(),
            })
            .collect()
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.tracks.iter().any(|t| t.capability() == capability)
    }

    /// True while any track still holds hardware
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    pub(crate) fn set_enabled(&self, capability: Capability, enabled: bool) -> bool {
        let mut touched = false;
        for track in self.tracks.iter().filter(|t| t.capability() == capability) {
            track.set_enabled(enabled);
            touched = true;
        }
        touched
    }

    pub(crate) fn stop(&self) {
        for track in &self.tracks {
            if track.is_live() {
                log::debug!("Stopping {} track {}", track.capability(), track.id());
            }
            track.stop();
        }
    }
}

/// Stop every track when an adapter abandons a partially built stream
pub(crate) fn stop_tracks(tracks: &[Box<dyn MediaTrack>]) {
    for track in tracks {
        track.stop();
    }
}
