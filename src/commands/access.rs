use crate::config::MediaAccessConfig;
use crate::errors::MediaError;
use crate::manager::MediaAccessManager;
use crate::types::{AccessSnapshot, Capability, DeviceClass};
use tauri::command;
use tokio::sync::OnceCell;

// Process-wide manager for the plugin, backed by the desktop adapter
lazy_static::lazy_static! {
    static ref MEDIA_MANAGER: MediaAccessManager =
        MediaAccessManager::native(&MediaAccessConfig::load_or_default());
    static ref MEDIA_STARTED: OnceCell<()> = OnceCell::new();
}

/// Manager shared by all plugin commands
pub fn media_manager() -> &'static MediaAccessManager {
    &MEDIA_MANAGER
}

/// Shared manager after its one-time startup (permission refresh and the
/// configured initial request)
pub async fn started_media_manager() -> &'static MediaAccessManager {
    let manager = media_manager();
    MEDIA_STARTED.get_or_init(|| manager.start()).await;
    manager
}

/// Release hardware held by the plugin's manager
pub fn shutdown_media_manager() {
    log::info!("Shutting down media access");
    media_manager().teardown();
}

/// Request camera and/or microphone access (defaults to both)
#[command]
pub async fn request_media_access(
    device_class: Option<DeviceClass>,
) -> Result<AccessSnapshot, String> {
    let device_class = device_class.unwrap_or_default();
    log::info!("Requesting media access: {}", device_class);

    let manager = started_media_manager().await;
    if manager.is_torn_down() {
        return Err(MediaError::TornDown.to_string());
    }

    if !manager.request_access(device_class).await {
        log::warn!("Media access request failed: {}", manager.error_message());
    }
    Ok(manager.snapshot())
}

/// Stop the open media session, if any
#[command]
pub async fn stop_media_session() -> Result<AccessSnapshot, String> {
    let manager = started_media_manager().await;
    tokio::task::spawn_blocking(move || manager.stop_session())
        .await
        .map_err(|e| format!("Failed to stop media session: {}", e))?;
    Ok(manager.snapshot())
}

/// Refresh permission state from the operating system
#[command]
pub async fn check_media_permissions() -> Result<AccessSnapshot, String> {
    log::debug!("Checking media permissions");
    let manager = started_media_manager().await;
    manager.check_permissions().await;
    Ok(manager.snapshot())
}

/// Current permission, session and error state
#[command]
pub async fn get_media_access_state() -> Result<AccessSnapshot, String> {
    Ok(started_media_manager().await.snapshot())
}

/// Mute or unmute the open session's tracks of one capability
#[command]
pub async fn set_media_track_enabled(
    capability: Capability,
    enabled: bool,
) -> Result<AccessSnapshot, String> {
    let manager = started_media_manager().await;
    if !manager.set_track_enabled(capability, enabled) {
        return Err(format!("No open {} track", capability));
    }
    Ok(manager.snapshot())
}
