use futures::FutureExt;
use media_access::testing::{FakeMediaPlatform, FakeOutcome};
use media_access::{
    AccessErrorKind, Capability, DeviceClass, ManagerConfig, ManagerPhase, MediaAccessManager,
    PermissionState, PlatformError,
};
use std::sync::Arc;

fn setup(platform: FakeMediaPlatform) -> (Arc<FakeMediaPlatform>, MediaAccessManager) {
    let platform = Arc::new(platform);
    let manager = MediaAccessManager::new(platform.clone(), ManagerConfig::default());
    (platform, manager)
}

#[tokio::test]
async fn test_grant_both() {
    let (platform, manager) = setup(FakeMediaPlatform::new());

    assert!(manager.request_access(DeviceClass::Both).await);
    assert_eq!(manager.camera_permission(), PermissionState::Granted);
    assert_eq!(manager.microphone_permission(), PermissionState::Granted);

    let stream = manager.stream().expect("stream should be open");
    assert!(stream.has(Capability::Camera));
    assert!(stream.has(Capability::Microphone));
    assert!(stream.is_active());
    assert!(manager.error().is_none());
    assert_eq!(manager.error_message(), "");
    assert_eq!(platform.live_track_count(), 2);
}

#[tokio::test]
async fn test_user_denies() {
    let (platform, manager) = setup(FakeMediaPlatform::new().with_outcomes([FakeOutcome::deny()]));

    assert!(!manager.request_access(DeviceClass::Both).await);
    let error = manager.error().expect("error should be recorded");
    assert_eq!(error.kind, AccessErrorKind::PermissionDenied);
    assert_eq!(manager.error_message(), error.message);
    assert!(manager.stream().is_none());
    assert_eq!(manager.camera_permission(), PermissionState::Denied);
    assert_eq!(manager.microphone_permission(), PermissionState::Denied);
    assert_eq!(platform.live_track_count(), 0);
}

#[tokio::test]
async fn test_reacquire_camera_while_active() {
    let (platform, manager) = setup(FakeMediaPlatform::new());

    assert!(manager.request_access(DeviceClass::Both).await);
    let first = manager.stream().unwrap();

    assert!(manager.request_access(DeviceClass::Camera).await);
    assert!(!first.is_active());
    assert!(platform
        .granted_tracks(0)
        .iter()
        .all(|(_, live)| !live));

    let second = manager.stream().unwrap();
    assert_ne!(first.id(), second.id());
    assert!(second.has(Capability::Camera));
    assert!(!second.has(Capability::Microphone));
    assert_eq!(manager.camera_permission(), PermissionState::Granted);
    assert_eq!(manager.microphone_permission(), PermissionState::Granted);
    assert_eq!(platform.live_tracks_at_acquire(), vec![0, 0]);
}

#[tokio::test]
async fn test_unsupported_platform_short_circuits() {
    let (platform, manager) = setup(FakeMediaPlatform::unsupported());

    // resolves on first poll
    let result = manager.request_access(DeviceClass::Both).now_or_never();
    assert_eq!(result, Some(false));

    assert_eq!(platform.acquisition_count(), 0);
    assert_eq!(manager.camera_permission(), PermissionState::Unsupported);
    assert_eq!(manager.microphone_permission(), PermissionState::Unsupported);
    assert_eq!(manager.error().unwrap().kind, AccessErrorKind::Unsupported);
    assert!(!manager.can_use(Capability::Camera));
    assert!(!manager.can_use(Capability::Microphone));
}

#[tokio::test]
async fn test_teardown_releases_session() {
    let (platform, manager) = setup(FakeMediaPlatform::new());
    assert!(manager.request_access(DeviceClass::Both).await);
    let stream = manager.stream().unwrap();

    manager.teardown();
    assert!(manager.stream().is_none());
    assert!(!stream.is_active());
    assert_eq!(manager.phase(), ManagerPhase::Idle);
    assert_eq!(platform.live_track_count(), 0);
}

#[tokio::test]
async fn test_teardown_from_failed_goes_idle() {
    let (_platform, manager) = setup(FakeMediaPlatform::new().with_outcomes([FakeOutcome::deny()]));
    assert!(!manager.request_access(DeviceClass::Both).await);
    assert_eq!(manager.phase(), ManagerPhase::Failed);

    manager.teardown();
    assert_eq!(manager.phase(), ManagerPhase::Idle);

    // refused requests still explain themselves
    assert!(!manager.request_access(DeviceClass::Camera).await);
    assert_eq!(manager.phase(), ManagerPhase::Idle);
    assert_eq!(manager.error().unwrap().kind, AccessErrorKind::Aborted);
}

#[tokio::test]
async fn test_drop_releases_session() {
    let (platform, manager) = setup(FakeMediaPlatform::new());
    assert!(manager.request_access(DeviceClass::Both).await);
    let stream = manager.stream().unwrap();

    drop(manager);
    assert!(!stream.is_active());
    assert_eq!(platform.live_track_count(), 0);
}

#[tokio::test]
async fn test_stop_without_session_is_noop() {
    let (_platform, manager) = setup(FakeMediaPlatform::new());
    let before = manager.snapshot();

    manager.stop_session();
    manager.stop_session();
    assert_eq!(manager.snapshot(), before);
}

#[tokio::test]
async fn test_double_stop_equals_single_stop() {
    let (platform, manager) = setup(FakeMediaPlatform::new());
    assert!(manager.request_access(DeviceClass::Both).await);

    manager.stop_session();
    let after_first = manager.snapshot();
    manager.stop_session();

    assert_eq!(manager.snapshot(), after_first);
    assert!(after_first.stream.is_none());
    assert_eq!(after_first.camera_permission, PermissionState::Granted);
    assert_eq!(platform.live_track_count(), 0);
}

#[tokio::test]
async fn test_failure_after_success_keeps_no_partial_session() {
    let (platform, manager) = setup(
        FakeMediaPlatform::new().with_outcomes([
            FakeOutcome::Grant,
            FakeOutcome::Fail(PlatformError::not_readable("in use")),
        ]),
    );

    assert!(manager.request_access(DeviceClass::Both).await);
    assert!(!manager.request_access(DeviceClass::Camera).await);

    assert!(manager.stream().is_none());
    assert_eq!(platform.live_track_count(), 0);
    assert_eq!(manager.error().unwrap().kind, AccessErrorKind::DeviceBusy);
    assert_eq!(manager.camera_permission(), PermissionState::Denied);
    // microphone was not part of the failed request
    assert_eq!(manager.microphone_permission(), PermissionState::Granted);
}

#[tokio::test]
async fn test_partial_class_update_on_success() {
    let (_platform, manager) = setup(FakeMediaPlatform::new());

    assert!(manager.request_access(DeviceClass::Camera).await);
    assert_eq!(manager.camera_permission(), PermissionState::Granted);
    assert_eq!(manager.microphone_permission(), PermissionState::PromptRequired);

    assert!(manager.request_access(DeviceClass::Microphone).await);
    assert_eq!(manager.camera_permission(), PermissionState::Granted);
    assert_eq!(manager.microphone_permission(), PermissionState::Granted);
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let (_platform, manager) = setup(FakeMediaPlatform::new().with_outcomes([
        FakeOutcome::Fail(PlatformError::not_found("no camera")),
        FakeOutcome::Grant,
    ]));

    assert!(!manager.request_access(DeviceClass::Camera).await);
    assert_eq!(manager.error().unwrap().kind, AccessErrorKind::DeviceNotFound);
    assert!(!manager.error_message().is_empty());

    assert!(manager.request_access(DeviceClass::Camera).await);
    assert!(manager.error().is_none());
    assert_eq!(manager.error_message(), "");
    assert_eq!(manager.phase(), ManagerPhase::Active);
}

#[tokio::test]
async fn test_unknown_error_includes_platform_message() {
    let (_platform, manager) = setup(FakeMediaPlatform::new().with_outcomes([FakeOutcome::Fail(
        PlatformError::new("DriverCrash", "usb reset"),
    )]));

    assert!(!manager.request_access(DeviceClass::Both).await);
    assert_eq!(manager.error().unwrap().kind, AccessErrorKind::Unknown);
    assert_eq!(manager.error_message(), "Error accessing media: usb reset");
}

#[tokio::test]
async fn test_capture_requests_follow_device_class() {
    let (platform, manager) = setup(FakeMediaPlatform::new());

    manager.request_access(DeviceClass::Camera).await;
    manager.request_access(DeviceClass::Microphone).await;
    manager.request_access(DeviceClass::Both).await;

    let requests = platform.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].video && !requests[0].audio);
    assert!(!requests[1].video && requests[1].audio);
    assert!(requests[2].video && requests[2].audio);
}

#[tokio::test]
async fn test_mute_keeps_hardware() {
    let (platform, manager) = setup(FakeMediaPlatform::new());
    assert!(!manager.set_track_enabled(Capability::Microphone, false));

    assert!(manager.request_access(DeviceClass::Both).await);
    assert!(manager.set_track_enabled(Capability::Microphone, false));

    let tracks = manager.stream().unwrap().tracks();
    let mic = tracks
        .iter()
        .find(|t| t.capability == Capability::Microphone)
        .unwrap();
    let cam = tracks
        .iter()
        .find(|t| t.capability == Capability::Camera)
        .unwrap();
    assert!(!mic.enabled);
    assert!(mic.live);
    assert!(cam.enabled);
    assert_eq!(platform.live_track_count(), 2);

    assert!(manager.request_access(DeviceClass::Camera).await);
    assert!(!manager.set_track_enabled(Capability::Microphone, true));
}

#[tokio::test]
async fn test_snapshot_serializes() {
    let (_platform, manager) = setup(FakeMediaPlatform::new());
    manager.request_access(DeviceClass::Camera).await;

    let json = serde_json::to_value(manager.snapshot()).unwrap();
    assert_eq!(json["camera_permission"], "granted");
    assert_eq!(json["microphone_permission"], "prompt_required");
    assert_eq!(json["phase"], "active");
    assert_eq!(json["stream"]["tracks"][0]["capability"], "camera");
    assert_eq!(json["error_message"], "");
}
