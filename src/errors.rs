use crate::permissions::AccessKind;
use crate::types::CameraRole;

/// Errors surfaced by the camera switching pipeline.
///
/// None of these are fatal to the process: they are caught where they happen
/// and turned into event log entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// No discovered device matches the requested camera role.
    #[error("No {0} camera device found")]
    DeviceNotFound(CameraRole),
    /// The session refused the input for the given role.
    #[error("Could not add input for {0} camera")]
    InputAddRejected(CameraRole),
    /// The backend failed to capture or encode a photo.
    #[error("Capture processing error: {0}")]
    CaptureProcessing(String),
    /// Camera or photo library access was not granted.
    #[error("Authorization denied: {0} access not granted")]
    AuthorizationDenied(AccessKind),
    #[error("Camera initialization error: {0}")]
    Initialization(String),
    #[error("Session error: {0}")]
    Session(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
