//! Testing utilities for media access
//!
//! Provides a scripted platform adapter so manager behaviour can be
//! exercised without camera or microphone hardware.

pub mod fake;

pub use fake::{FakeMediaPlatform, FakeOutcome, FakePermissionQuery, FakeTrack};
