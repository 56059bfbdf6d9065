//! Media access manager
//!
//! Owns at most one open [`MediaSession`], tracks camera and microphone
//! permission state, and records classified acquisition failures.
//!
//! Acquisitions are serialized per manager: a request waits for any
//! in-flight acquisition to settle, then stops the current session, then
//! asks the platform for a new stream. The platform call runs on its own
//! task holding the serialization permit, so an acquisition is never
//! abandoned half way even if the caller stops waiting for it.

use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{ManagerConfig, MediaAccessConfig};
use crate::errors::{AccessError, PlatformError};
use crate::platform::{MediaPlatform, MediaStream, NativeMediaPlatform};
use crate::types::{
    AccessSnapshot, Capability, CaptureRequest, DeviceClass, ManagerPhase, PermissionState,
    StreamSummary,
};

/// The currently open hardware stream
#[derive(Debug)]
pub struct MediaSession {
    stream: Arc<MediaStream>,
    request: CaptureRequest,
    created_at: DateTime<Utc>,
}

impl MediaSession {
    fn new(stream: MediaStream, request: CaptureRequest) -> Self {
        Self {
            stream: Arc::new(stream),
            request,
            created_at: Utc::now(),
        }
    }

    pub fn stream(&self) -> &Arc<MediaStream> {
        &self.stream
    }

    pub fn request(&self) -> CaptureRequest {
        self.request
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            id: self.stream.id().to_string(),
            created_at: self.created_at,
            tracks: self.stream.tracks(),
        }
    }
}

#[derive(Debug, Default)]
struct AccessState {
    camera: PermissionState,
    microphone: PermissionState,
    // set once an acquisition outcome has decided the class
    camera_resolved: bool,
    microphone_resolved: bool,
    session: Option<MediaSession>,
    error: Option<AccessError>,
    phase: ManagerPhase,
    closed: bool,
}

impl AccessState {
    fn set_permission(&mut self, capability: Capability, state: PermissionState, resolved: bool) {
        match capability {
            Capability::Camera => {
                self.camera = state;
                self.camera_resolved |= resolved;
            }
            Capability::Microphone => {
                self.microphone = state;
                self.microphone_resolved |= resolved;
            }
        }
    }

    fn permission(&self, capability: Capability) -> PermissionState {
        match capability {
            Capability::Camera => self.camera,
            Capability::Microphone => self.microphone,
        }
    }

    fn resolved(&self, capability: Capability) -> bool {
        match capability {
            Capability::Camera => self.camera_resolved,
            Capability::Microphone => self.microphone_resolved,
        }
    }
}

/// State shared between the manager and its acquisition tasks
#[derive(Debug, Default)]
struct Shared {
    state: RwLock<AccessState>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, AccessState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AccessState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Detach the session and move to `Idle`. The caller releases it.
    fn take_session(&self) -> Option<MediaSession> {
        let mut state = self.write();
        let session = state.session.take();
        if session.is_some() {
            state.phase = ManagerPhase::Idle;
        }
        session
    }

    /// Detach the session under the lock, release its tracks outside it.
    ///
    /// Releasing joins the device workers, so this blocks until the
    /// hardware is free.
    fn stop_session(&self) -> bool {
        match self.take_session() {
            Some(session) => {
                release(session);
                true
            }
            None => false,
        }
    }

    fn mark_unsupported(&self, with_error: bool) {
        let mut state = self.write();
        state.set_permission(Capability::Camera, PermissionState::Unsupported, true);
        state.set_permission(Capability::Microphone, PermissionState::Unsupported, true);
        if with_error {
            state.error = Some(AccessError::unsupported());
            state.phase = ManagerPhase::Failed;
        }
    }

    /// Refusal recorded for any request that meets a torn down manager
    fn record_torn_down(&self) {
        let mut state = self.write();
        state.error = Some(AccessError::aborted("Media access manager has been torn down"));
        state.phase = ManagerPhase::Idle;
    }

    fn begin_acquiring(&self) {
        self.write().phase = ManagerPhase::Acquiring;
    }

    fn apply_success(&self, request: CaptureRequest, stream: MediaStream) -> bool {
        let mut state = self.write();
        if state.closed {
            drop(state);
            log::warn!(
                "Acquisition of stream {} settled after teardown, releasing it",
                stream.id()
            );
            stream.stop();
            self.record_torn_down();
            return false;
        }

        for capability in request.capabilities() {
            state.set_permission(capability, PermissionState::Granted, true);
        }
        let session = MediaSession::new(stream, request);
        log::info!(
            "Media session {} opened (video: {}, audio: {})",
            session.stream.id(),
            request.video,
            request.audio
        );
        state.session = Some(session);
        state.error = None;
        state.phase = ManagerPhase::Active;
        true
    }

    fn apply_failure(&self, request: CaptureRequest, error: &PlatformError) {
        let access_error = AccessError::classify(error);
        log::warn!(
            "Media acquisition failed ({}): {}",
            access_error.kind,
            error
        );

        let mut state = self.write();
        if state.closed {
            drop(state);
            self.record_torn_down();
            return;
        }

        for capability in request.capabilities() {
            state.set_permission(capability, PermissionState::Denied, true);
        }
        state.error = Some(access_error);
        state.phase = ManagerPhase::Failed;
    }
}

fn release(session: MediaSession) {
    session.stream.stop();
    log::info!("Stopped media session {}", session.stream.id());
}

/// Stop-then-acquire sequence; runs while holding the acquisition permit
async fn acquire_session(
    platform: Arc<dyn MediaPlatform>,
    shared: Arc<Shared>,
    request: CaptureRequest,
) -> bool {
    if shared.is_closed() {
        log::warn!("Manager torn down while the request was queued");
        shared.record_torn_down();
        return false;
    }

    // the previous session must be released before the platform is asked again
    if let Some(session) = shared.take_session() {
        if let Err(e) = tokio::task::spawn_blocking(move || release(session)).await {
            log::error!("Releasing previous media session failed: {}", e);
        }
    }
    shared.begin_acquiring();
    log::debug!(
        "Requesting media from {} (video: {}, audio: {})",
        platform.name(),
        request.video,
        request.audio
    );

    match platform.acquire(request).await {
        Ok(stream) => shared.apply_success(request, stream),
        Err(error) => {
            shared.apply_failure(request, &error);
            false
        }
    }
}

/// Camera and microphone access for one owning context.
///
/// Dropping the manager (or calling [`MediaAccessManager::teardown`])
/// releases any open session.
pub struct MediaAccessManager {
    platform: Arc<dyn MediaPlatform>,
    config: ManagerConfig,
    shared: Arc<Shared>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl std::fmt::Debug for MediaAccessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaAccessManager")
            .field("platform", &self.platform.name())
            .field("config", &self.config)
            .field("state", &*self.shared.read())
            .finish()
    }
}

impl MediaAccessManager {
    /// Create a manager without touching the platform
    pub fn new(platform: Arc<dyn MediaPlatform>, config: ManagerConfig) -> Self {
        log::debug!("Creating media access manager on {} platform", platform.name());
        Self {
            platform,
            config,
            shared: Arc::new(Shared::default()),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Create a manager backed by the desktop adapter
    pub fn native(config: &MediaAccessConfig) -> Self {
        Self::new(
            Arc::new(NativeMediaPlatform::new(config.native.clone())),
            config.manager,
        )
    }

    /// Create a manager, refresh permission state, and run the initial
    /// request when `auto_request_on_init` is set
    pub async fn initialize(platform: Arc<dyn MediaPlatform>, config: ManagerConfig) -> Self {
        let manager = Self::new(platform, config);
        manager.start().await;
        manager
    }

    /// [`Self::initialize`] on the desktop adapter
    pub async fn native_initialized(config: &MediaAccessConfig) -> Self {
        Self::initialize(
            Arc::new(NativeMediaPlatform::new(config.native.clone())),
            config.manager,
        )
        .await
    }

    /// Startup work for a manager built with [`Self::new`]: refresh
    /// permission state, then run the initial request if configured.
    pub async fn start(&self) {
        self.check_permissions().await;
        if self.config.auto_request_on_init {
            log::info!(
                "Requesting {} access on startup",
                self.config.initial_device_class
            );
            self.request_access(self.config.initial_device_class).await;
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Refresh permission state from the platform registry.
    ///
    /// Best effort: failures are logged and existing state is kept. A
    /// capability the registry cannot answer for stays `PromptRequired`
    /// unless an acquisition already decided it.
    pub async fn check_permissions(&self) {
        if !self.platform.is_supported() {
            log::debug!("{} platform has no media support", self.platform.name());
            self.shared.mark_unsupported(false);
            return;
        }

        let Some(registry) = self.platform.permissions() else {
            log::debug!("{} platform has no permission registry", self.platform.name());
            return;
        };

        for capability in [Capability::Camera, Capability::Microphone] {
            match registry.query(capability).await {
                Ok(Some(permission)) => {
                    log::debug!("{} permission: {}", capability, permission);
                    self.shared
                        .write()
                        .set_permission(capability, permission, false);
                }
                Ok(None) => {
                    let mut state = self.shared.write();
                    if !state.resolved(capability) {
                        state.set_permission(capability, PermissionState::PromptRequired, false);
                    }
                }
                Err(e) => {
                    log::warn!("Cannot check {} permission state: {}", capability, e);
                }
            }
        }
    }

    /// Request access to the given device class.
    ///
    /// Returns `true` when a new session is open. Failures never escape:
    /// they are classified and recorded, readable via [`Self::error`].
    pub async fn request_access(&self, device_class: DeviceClass) -> bool {
        if self.shared.is_closed() {
            log::warn!("request_access called on a torn down manager");
            self.shared.record_torn_down();
            return false;
        }

        if !self.platform.is_supported() {
            log::warn!(
                "Media capture is not supported on the {} platform",
                self.platform.name()
            );
            self.shared.mark_unsupported(true);
            return false;
        }

        let request = CaptureRequest::from(device_class);
        let permit = self.gate.clone().lock_owned().await;
        let platform = self.platform.clone();
        let shared = self.shared.clone();

        let task = tokio::spawn(async move {
            let _permit = permit;
            acquire_session(platform, shared, request).await
        });

        match task.await {
            Ok(granted) => granted,
            Err(e) => {
                log::error!("Media acquisition task failed: {}", e);
                self.shared.apply_failure(
                    request,
                    &PlatformError::aborted(format!("Acquisition task failed: {}", e)),
                );
                false
            }
        }
    }

    /// Release the open session, if any. Idempotent.
    ///
    /// Blocks until the device workers have released the hardware; from
    /// async code prefer running it on a blocking thread.
    pub fn stop_session(&self) {
        if !self.shared.stop_session() {
            log::debug!("stop_session: no session open");
        }
    }

    /// Enable or mute the session's tracks of one capability without
    /// releasing the hardware. Returns `false` when no such track is open.
    pub fn set_track_enabled(&self, capability: Capability, enabled: bool) -> bool {
        let state = self.shared.read();
        match &state.session {
            Some(session) => session.stream.set_enabled(capability, enabled),
            None => false,
        }
    }

    /// Release hardware and refuse further requests. Also runs on drop.
    pub fn teardown(&self) {
        let first = {
            let mut state = self.shared.write();
            state.phase = ManagerPhase::Idle;
            !std::mem::replace(&mut state.closed, true)
        };
        self.shared.stop_session();
        if first {
            log::debug!("Media access manager torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn camera_permission(&self) -> PermissionState {
        self.shared.read().camera
    }

    pub fn microphone_permission(&self) -> PermissionState {
        self.shared.read().microphone
    }

    pub fn permission(&self, capability: Capability) -> PermissionState {
        self.shared.read().permission(capability)
    }

    /// Whether controls for this capability should be enabled
    pub fn can_use(&self, capability: Capability) -> bool {
        !self.permission(capability).is_blocked()
    }

    /// Read-only handle to the open stream
    pub fn stream(&self) -> Option<Arc<MediaStream>> {
        self.shared.read().session.as_ref().map(|s| s.stream.clone())
    }

    pub fn session_summary(&self) -> Option<StreamSummary> {
        self.shared.read().session.as_ref().map(MediaSession::summary)
    }

    pub fn error(&self) -> Option<AccessError> {
        self.shared.read().error.clone()
    }

    /// Text of the last error, empty when there is none
    pub fn error_message(&self) -> String {
        self.shared
            .read()
            .error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }

    pub fn phase(&self) -> ManagerPhase {
        self.shared.read().phase
    }

    pub fn snapshot(&self) -> AccessSnapshot {
        let state = self.shared.read();
        AccessSnapshot {
            camera_permission: state.camera,
            microphone_permission: state.microphone,
            phase: state.phase,
            stream: state.session.as_ref().map(MediaSession::summary),
            error: state.error.clone(),
            error_message: state
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_default(),
        }
    }
}

impl Drop for MediaAccessManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
