use media_access::commands::{get_media_access_state, set_media_track_enabled, stop_media_session};
use media_access::{Capability, ManagerPhase};

#[tokio::test]
async fn test_state_and_idle_commands() {
    let state = get_media_access_state().await.unwrap();
    assert!(state.stream.is_none());
    assert_eq!(state.phase, ManagerPhase::Idle);

    // stopping with nothing open is harmless
    let state = stop_media_session().await.unwrap();
    assert!(state.stream.is_none());

    let result = set_media_track_enabled(Capability::Camera, false).await;
    assert_eq!(result.unwrap_err(), "No open camera track");
}
