use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::errors::PlatformError;
use crate::platform::{MediaPlatform, MediaStream, MediaTrack, PermissionQuery};
use crate::types::{Capability, CaptureRequest, PermissionState};

/// Scripted result of one acquisition
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Grant,
    Fail(PlatformError),
}

impl FakeOutcome {
    pub fn deny() -> Self {
        FakeOutcome::Fail(PlatformError::not_allowed("Permission denied by user"))
    }
}

/// Track backed by a shared liveness flag the fake keeps a copy of
#[derive(Debug)]
pub struct FakeTrack {
    id: String,
    capability: Capability,
    live: Arc<AtomicBool>,
    enabled: AtomicBool,
}

impl FakeTrack {
    fn new(capability: Capability) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            capability,
            live: Arc::new(AtomicBool::new(true)),
            enabled: AtomicBool::new(true),
        }
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn label(&self) -> &str {
        match self.capability {
            Capability::Camera => "Fake Camera",
            Capability::Microphone => "Fake Microphone",
        }
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Recorder {
    outcomes: VecDeque<FakeOutcome>,
    requests: Vec<CaptureRequest>,
    // liveness flags of every track handed out, per acquisition
    granted: Vec<Vec<(Capability, Arc<AtomicBool>)>>,
    live_at_acquire: Vec<usize>,
    in_flight: usize,
    max_in_flight: usize,
}

impl Recorder {
    fn live_tracks(&self) -> usize {
        self.granted
            .iter()
            .flatten()
            .filter(|(_, live)| live.load(Ordering::SeqCst))
            .count()
    }
}

/// Platform adapter returning scripted outcomes.
///
/// Unscripted acquisitions are granted.
#[derive(Debug)]
pub struct FakeMediaPlatform {
    supported: bool,
    latency: Duration,
    permissions: Option<FakePermissionQuery>,
    recorder: Mutex<Recorder>,
}

impl Default for FakeMediaPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMediaPlatform {
    pub fn new() -> Self {
        Self {
            supported: true,
            latency: Duration::ZERO,
            permissions: None,
            recorder: Mutex::new(Recorder::default()),
        }
    }

    /// A platform without any acquisition facility
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Delay every acquisition by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_permissions(mut self, permissions: FakePermissionQuery) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = FakeOutcome>) -> Self {
        self.lock().outcomes.extend(outcomes);
        self
    }

    pub fn push_outcome(&self, outcome: FakeOutcome) {
        self.lock().outcomes.push_back(outcome);
    }

    pub fn acquisition_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.lock().requests.clone()
    }

    /// Tracks handed out that have not been stopped yet
    pub fn live_track_count(&self) -> usize {
        self.lock().live_tracks()
    }

    /// Live track count observed at the start of each acquisition
    pub fn live_tracks_at_acquire(&self) -> Vec<usize> {
        self.lock().live_at_acquire.clone()
    }

    pub fn max_concurrent_acquisitions(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Capabilities and liveness of the tracks granted by the nth successful acquisition
    pub fn granted_tracks(&self, index: usize) -> Vec<(Capability, bool)> {
        self.lock()
            .granted
            .get(index)
            .map(|tracks| {
                tracks
                    .iter()
                    .map(|(capability, live)| (*capability, live.load(Ordering::SeqCst)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn permission_query_count(&self) -> usize {
        self.permissions
            .as_ref()
            .map(|p| p.calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MediaPlatform for FakeMediaPlatform {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn acquire(&self, request: CaptureRequest) -> Result<MediaStream, PlatformError> {
        let outcome = {
            let mut recorder = self.lock();
            recorder.requests.push(request);
            let live = recorder.live_tracks();
            recorder.live_at_acquire.push(live);
            recorder.in_flight += 1;
            recorder.max_in_flight = recorder.max_in_flight.max(recorder.in_flight);
            recorder.outcomes.pop_front().unwrap_or(FakeOutcome::Grant)
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut recorder = self.lock();
        recorder.in_flight -= 1;

        match outcome {
            FakeOutcome::Fail(error) => Err(error),
            FakeOutcome::Grant if !request.video && !request.audio => {
                Err(PlatformError::invalid("Empty capture request"))
            }
            FakeOutcome::Grant => {
                let mut tracks: Vec<Box<dyn MediaTrack>> = Vec::new();
                let mut flags = Vec::new();
                for capability in [Capability::Camera, Capability::Microphone] {
                    if request.wants(capability) {
                        let track = FakeTrack::new(capability);
                        flags.push((capability, track.live.clone()));
                        tracks.push(Box::new(track));
                    }
                }
                recorder.granted.push(flags);
                Ok(MediaStream::new(tracks))
            }
        }
    }

    fn permissions(&self) -> Option<&dyn PermissionQuery> {
        self.permissions.as_ref().map(|p| p as &dyn PermissionQuery)
    }
}

/// Scripted permission registry
#[derive(Debug)]
pub struct FakePermissionQuery {
    camera: Result<Option<PermissionState>, PlatformError>,
    microphone: Result<Option<PermissionState>, PlatformError>,
    calls: AtomicUsize,
}

impl FakePermissionQuery {
    /// `None` marks a capability the registry cannot answer for
    pub fn new(camera: Option<PermissionState>, microphone: Option<PermissionState>) -> Self {
        Self {
            camera: Ok(camera),
            microphone: Ok(microphone),
            calls: AtomicUsize::new(0),
        }
    }

    /// A registry whose every query fails
    pub fn failing(error: PlatformError) -> Self {
        Self {
            camera: Err(error.clone()),
            microphone: Err(error),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PermissionQuery for FakePermissionQuery {
    async fn query(&self, capability: Capability) -> Result<Option<PermissionState>, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match capability {
            Capability::Camera => self.camera.clone(),
            Capability::Microphone => self.microphone.clone(),
        }
    }
}
