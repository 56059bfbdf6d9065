//! media-access: camera and microphone access management
//!
//! This crate acquires camera/microphone streams from the host platform,
//! tracks permission state per device class, classifies acquisition
//! failures into a uniform error taxonomy, and guarantees that hardware is
//! released on stop, reacquisition and teardown.
//!
//! # Features
//! - Platform ports ([`platform::MediaPlatform`], [`platform::PermissionQuery`]) injected into the manager
//! - Desktop adapter (nokhwa camera, cpal microphone behind the `audio` feature)
//! - Scripted fake adapter for tests ([`testing::FakeMediaPlatform`])
//! - Tauri plugin commands over a process-wide manager
//!
//! # Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use media_access::{DeviceClass, MediaAccessManager, NativeMediaPlatform};
//!
//! let manager = MediaAccessManager::new(
//!     Arc::new(NativeMediaPlatform::default()),
//!     Default::default(),
//! );
//! if !manager.request_access(DeviceClass::Both).await {
//!     eprintln!("{}", manager.error_message());
//! }
//! manager.stop_session();
//! ```
//!
//! As a Tauri plugin:
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(media_access::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod commands;
pub mod config;
pub mod errors;
pub mod manager;
pub mod platform;
pub mod testing;
pub mod types;

// Re-exports for convenience
pub use config::{ManagerConfig, MediaAccessConfig, NativeConfig};
pub use errors::{AccessError, AccessErrorKind, MediaError, PlatformError};
pub use manager::{MediaAccessManager, MediaSession};
pub use platform::{MediaPlatform, MediaStream, MediaTrack, NativeMediaPlatform, PermissionQuery};
pub use types::{
    AccessSnapshot, Capability, CaptureRequest, DeviceClass, ManagerPhase, PermissionState,
    StreamSummary, TrackInfo,
};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the media-access plugin with all commands
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("media-access")
        .invoke_handler(tauri::generate_handler![
            commands::access::request_media_access,
            commands::access::stop_media_session,
            commands::access::check_media_permissions,
            commands::access::get_media_access_state,
            commands::access::set_media_track_enabled,
        ])
        .on_drop(|_app| commands::access::shutdown_media_manager())
        .build()
}

/// Initialize logging for media access
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "media_access=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "media-access");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_is_repeatable() {
        init_logging();
        init_logging();
    }
}
