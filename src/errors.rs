use serde::{Deserialize, Serialize};
use std::fmt;

/// Crate-level error for operations that do propagate failures
/// (configuration, adapters, the CLI and plugin surfaces).
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Media access error: {0}")]
    Access(AccessError),
    #[error("Media access manager has been torn down")]
    TornDown,
}

/// Failure reported by a platform adapter.
///
/// `name` carries the platform's classifiable error name
/// (`NotAllowedError`, `NotFoundError`, ...), `message` the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformError {
    pub name: String,
    pub message: String,
}

impl PlatformError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new("NotAllowedError", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NotFoundError", message)
    }

    pub fn not_readable(message: impl Into<String>) -> Self {
        Self::new("NotReadableError", message)
    }

    pub fn overconstrained(message: impl Into<String>) -> Self {
        Self::new("OverconstrainedError", message)
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::new("SecurityError", message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new("AbortError", message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new("NotSupportedError", message)
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for PlatformError {}

/// Classified reason an acquisition failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessErrorKind {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    ConstraintsUnsatisfiable,
    SecurityRestricted,
    Aborted,
    InvalidRequest,
    Unsupported,
    Unknown,
}

impl AccessErrorKind {
    /// Map a platform error name onto a kind. Legacy names are accepted too.
    pub fn classify(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => AccessErrorKind::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => AccessErrorKind::DeviceNotFound,
            "NotReadableError" | "TrackStartError" => AccessErrorKind::DeviceBusy,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                AccessErrorKind::ConstraintsUnsatisfiable
            }
            "SecurityError" => AccessErrorKind::SecurityRestricted,
            "AbortError" => AccessErrorKind::Aborted,
            "TypeError" => AccessErrorKind::InvalidRequest,
            "NotSupportedError" => AccessErrorKind::Unsupported,
            _ => AccessErrorKind::Unknown,
        }
    }

    /// User-facing text for this kind. `raw` is only used by [`AccessErrorKind::Unknown`].
    pub fn message(&self, raw: &str) -> String {
        match self {
            AccessErrorKind::PermissionDenied => "Permission to use camera or microphone was denied. Please update your settings to allow access.".to_string(),
            AccessErrorKind::DeviceNotFound => "No camera or microphone found. Please check your devices and try again.".to_string(),
            AccessErrorKind::DeviceBusy => "Your camera or microphone is already in use by another application.".to_string(),
            AccessErrorKind::ConstraintsUnsatisfiable => "The requested camera constraints cannot be satisfied.".to_string(),
            AccessErrorKind::SecurityRestricted => "Media access is not allowed in this context due to security restrictions.".to_string(),
            AccessErrorKind::Aborted => "The operation was aborted, possibly because of hardware issues.".to_string(),
            AccessErrorKind::InvalidRequest => "Invalid constraints or parameters were provided.".to_string(),
            AccessErrorKind::Unsupported => "This platform does not support camera or microphone access.".to_string(),
            AccessErrorKind::Unknown => format!("Error accessing media: {}", raw),
        }
    }
}

impl fmt::Display for AccessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A failed acquisition as recorded by the manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessError {
    pub kind: AccessErrorKind,
    pub message: String,
    /// Platform error this was classified from, if any
    pub source: Option<PlatformError>,
}

impl AccessError {
    pub fn new(kind: AccessErrorKind) -> Self {
        Self {
            kind,
            message: kind.message(""),
            source: None,
        }
    }

    pub fn unsupported() -> Self {
        Self::new(AccessErrorKind::Unsupported)
    }

    pub fn aborted(reason: &str) -> Self {
        Self {
            kind: AccessErrorKind::Aborted,
            message: AccessErrorKind::Aborted.message(""),
            source: Some(PlatformError::aborted(reason)),
        }
    }

    pub fn classify(error: &PlatformError) -> Self {
        let kind = AccessErrorKind::classify(&error.name);
        Self {
            kind,
            message: kind.message(&error.message),
            source: Some(error.clone()),
        }
    }
}

impl From<PlatformError> for AccessError {
    fn from(error: PlatformError) -> Self {
        Self::classify(&error)
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AccessError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_standard_names() {
        let cases = [
            ("NotAllowedError", AccessErrorKind::PermissionDenied),
            ("NotFoundError", AccessErrorKind::DeviceNotFound),
            ("NotReadableError", AccessErrorKind::DeviceBusy),
            ("OverconstrainedError", AccessErrorKind::ConstraintsUnsatisfiable),
            ("SecurityError", AccessErrorKind::SecurityRestricted),
            ("AbortError", AccessErrorKind::Aborted),
            ("TypeError", AccessErrorKind::InvalidRequest),
            ("NotSupportedError", AccessErrorKind::Unsupported),
            ("SomethingElse", AccessErrorKind::Unknown),
        ];
        for (name, kind) in cases {
            assert_eq!(AccessErrorKind::classify(name), kind, "name {}", name);
        }
    }

    #[test]
    fn test_classify_legacy_names() {
        assert_eq!(
            AccessErrorKind::classify("PermissionDeniedError"),
            AccessErrorKind::PermissionDenied
        );
        assert_eq!(
            AccessErrorKind::classify("DevicesNotFoundError"),
            AccessErrorKind::DeviceNotFound
        );
        assert_eq!(AccessErrorKind::classify("TrackStartError"), AccessErrorKind::DeviceBusy);
        assert_eq!(
            AccessErrorKind::classify("ConstraintNotSatisfiedError"),
            AccessErrorKind::ConstraintsUnsatisfiable
        );
    }

    #[test]
    fn test_unknown_message_includes_raw_text() {
        let err = AccessError::classify(&PlatformError::new("Weird", "driver exploded"));
        assert_eq!(err.kind, AccessErrorKind::Unknown);
        assert_eq!(err.message, "Error accessing media: driver exploded");
    }

    #[test]
    fn test_classified_message_ignores_raw_text() {
        let a = AccessError::classify(&PlatformError::not_allowed("user clicked block"));
        let b = AccessError::classify(&PlatformError::not_allowed("policy"));
        assert_eq!(a.message, b.message);
        assert_eq!(a.to_string(), a.message);
    }

    #[test]
    fn test_media_error_display() {
        let err = MediaError::InvalidConfig("open_timeout_ms must be positive".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: open_timeout_ms must be positive"
        );
        assert_eq!(
            MediaError::TornDown.to_string(),
            "Media access manager has been torn down"
        );
    }
}
