//! Shared value types for media access: device classes, permission states,
//! capture requests and the serializable snapshot handed to UI code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AccessError;

/// Which hardware capability an operation concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Camera,
    Microphone,
    #[default]
    Both,
}

impl DeviceClass {
    pub fn includes(&self, capability: Capability) -> bool {
        matches!(
            (self, capability),
            (DeviceClass::Both, _)
                | (DeviceClass::Camera, Capability::Camera)
                | (DeviceClass::Microphone, Capability::Microphone)
        )
    }

    /// Capabilities covered by this class, camera first
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            DeviceClass::Camera => &[Capability::Camera],
            DeviceClass::Microphone => &[Capability::Microphone],
            DeviceClass::Both => &[Capability::Camera, Capability::Microphone],
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Camera => write!(f, "camera"),
            DeviceClass::Microphone => write!(f, "microphone"),
            DeviceClass::Both => write!(f, "both"),
        }
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "camera" | "video" => Ok(DeviceClass::Camera),
            "microphone" | "mic" | "audio" => Ok(DeviceClass::Microphone),
            "both" | "all" => Ok(DeviceClass::Both),
            other => Err(format!("Unknown device class: {}", other)),
        }
    }
}

/// A single hardware capability. Tracks and permission queries are per capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Camera,
    Microphone,
}

impl Capability {
    /// Name used by permission registries ("camera" / "microphone")
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Camera => "camera",
            Capability::Microphone => "microphone",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability request built from a [`DeviceClass`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub video: bool,
    pub audio: bool,
}

impl CaptureRequest {
    pub fn wants(&self, capability: Capability) -> bool {
        match capability {
            Capability::Camera => self.video,
            Capability::Microphone => self.audio,
        }
    }

    /// Requested capabilities, camera first
    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        DeviceClass::Both
            .capabilities()
            .iter()
            .copied()
            .filter(|c| self.wants(*c))
    }
}

impl From<DeviceClass> for CaptureRequest {
    fn from(class: DeviceClass) -> Self {
        Self {
            video: class.includes(Capability::Camera),
            audio: class.includes(Capability::Microphone),
        }
    }
}

/// Last known authorization outcome for a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Access granted
    Granted,
    /// Access declined by the user or by policy
    Denied,
    /// Not determined yet; a request may still succeed
    #[default]
    PromptRequired,
    /// The platform lacks the acquisition facility
    Unsupported,
    /// The platform reported a state that could not be interpreted
    Error,
}

impl PermissionState {
    /// Controls depending on this capability should be disabled
    pub fn is_blocked(&self) -> bool {
        matches!(self, PermissionState::Denied | PermissionState::Unsupported)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::PromptRequired => write!(f, "prompt"),
            PermissionState::Unsupported => write!(f, "unsupported"),
            PermissionState::Error => write!(f, "error"),
        }
    }
}

/// Lifecycle phase of a manager's session slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManagerPhase {
    #[default]
    Idle,
    Acquiring,
    Active,
    Failed,
}

/// Read-only description of a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub capability: Capability,
    pub label: String,
    pub live: bool,
    pub enabled: bool,
}

/// Read-only description of an open stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub tracks: Vec<TrackInfo>,
}

/// Everything a UI needs to render media access state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessSnapshot {
    pub camera_permission: PermissionState,
    pub microphone_permission: PermissionState,
    pub phase: ManagerPhase,
    pub stream: Option<StreamSummary>,
    pub error: Option<AccessError>,
    pub error_message: String,
}
