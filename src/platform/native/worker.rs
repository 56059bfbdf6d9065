//! Tracks whose device handle lives on a dedicated worker thread.
//!
//! Capture backends hand out device handles that are not `Send`, so each
//! device is opened, held and released on its own thread. The async side
//! only sees readiness over a oneshot channel and a stop signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::errors::PlatformError;
use crate::platform::MediaTrack;
use crate::types::Capability;

/// A device opened on the worker thread
pub(crate) struct OpenedDevice {
    pub label: String,
    /// Releases the hardware; runs on the worker thread
    pub release: Box<dyn FnOnce()>,
}

#[derive(Debug)]
pub struct NativeTrack {
    id: String,
    capability: Capability,
    label: String,
    live: AtomicBool,
    enabled: AtomicBool,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MediaTrack for NativeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&self) {
        if !self.live.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(tx) = self.stop_tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(());
        }

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("{} worker panicked while releasing {}", self.capability, self.label);
            }
        }
        log::debug!("Released {} '{}'", self.capability, self.label);
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

impl Drop for NativeTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open a device on a new worker thread and wait (bounded) for it to be ready.
///
/// A worker that finishes opening after the wait gave up releases the device
/// on its own, so no hardware stays claimed.
pub(crate) async fn open_track<F>(
    capability: Capability,
    timeout: Duration,
    open: F,
) -> Result<NativeTrack, PlatformError>
where
    F: FnOnce() -> Result<OpenedDevice, PlatformError> + Send + 'static,
{
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<Result<String, PlatformError>>();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();

    let handle = std::thread::Builder::new()
        .name(format!("media-access-{}", capability))
        .spawn(move || match open() {
            Ok(device) => {
                if ready_tx.send(Ok(device.label.clone())).is_err() {
                    log::warn!(
                        "{} '{}' opened after the request gave up, releasing",
                        capability,
                        device.label
                    );
                    (device.release)();
                    return;
                }
                // Either an explicit stop or the sender being dropped ends the hold.
                let _ = stop_rx.recv();
                (device.release)();
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })
        .map_err(|e| PlatformError::aborted(format!("Failed to spawn {} worker: {}", capability, e)))?;

    match tokio::time::timeout(timeout, ready_rx).await {
        Ok(Ok(Ok(label))) => {
            log::info!("Opened {} '{}'", capability, label);
            Ok(NativeTrack {
                id: uuid::Uuid::new_v4().to_string(),
                capability,
                label,
                live: AtomicBool::new(true),
                enabled: AtomicBool::new(true),
                stop_tx: Mutex::new(Some(stop_tx)),
                worker: Mutex::new(Some(handle)),
            })
        }
        Ok(Ok(Err(e))) => {
            log::warn!("Failed to open {}: {}", capability, e);
            Err(e)
        }
        Ok(Err(_)) => Err(PlatformError::aborted(format!(
            "{} worker exited before reporting",
            capability
        ))),
        Err(_) => Err(PlatformError::aborted(format!(
            "Timed out after {}ms opening {}",
            timeout.as_millis(),
            capability
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_open_and_stop_releases_device() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let track = open_track(Capability::Camera, Duration::from_secs(1), move || {
            Ok(OpenedDevice {
                label: "Test Cam".to_string(),
                release: Box::new(move || flag.store(true, Ordering::SeqCst)),
            })
        })
        .await
        .unwrap();

        assert!(track.is_live());
        assert_eq!(track.label(), "Test Cam");
        assert!(!released.load(Ordering::SeqCst));

        track.stop();
        assert!(!track.is_live());
        assert!(released.load(Ordering::SeqCst));

        // second stop is a no-op
        track.stop();
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let result = open_track(Capability::Microphone, Duration::from_secs(1), || {
            Err(PlatformError::not_found("no mic"))
        })
        .await;
        assert_eq!(result.unwrap_err(), PlatformError::not_found("no mic"));
    }

    #[tokio::test]
    async fn test_late_open_releases_itself() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let result = open_track(Capability::Camera, Duration::from_millis(10), move || {
            std::thread::sleep(Duration::from_millis(100));
            Ok(OpenedDevice {
                label: "Slow Cam".to_string(),
                release: Box::new(move || flag.store(true, Ordering::SeqCst)),
            })
        })
        .await;

        assert_eq!(result.unwrap_err().name, "AbortError");
        for _ in 0..50 {
            if released.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(released.load(Ordering::SeqCst));
    }
}
