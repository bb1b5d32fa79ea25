//! Camera and photo-library authorization.
//!
//! Setup is gated on camera access; each saved photo is gated on photo-library
//! access. Both go through an [`AccessAuthority`] so tests and the simulated
//! backend can grant or deny without touching the host.

use std::fmt;
use std::sync::Arc;

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// What is being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AccessKind {
    Camera,
    PhotoLibrary,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Camera => write!(f, "camera"),
            AccessKind::PhotoLibrary => write!(f, "photo library"),
        }
    }
}

/// Detailed permission information
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub status: PermissionStatus,
    pub message: String,
    pub can_request: bool,
}

impl PermissionInfo {
    pub fn granted(message: impl Into<String>) -> Self {
        Self {
            status: PermissionStatus::Granted,
            message: message.into(),
            can_request: false,
        }
    }

    pub fn denied(message: impl Into<String>, can_request: bool) -> Self {
        Self {
            status: PermissionStatus::Denied,
            message: message.into(),
            can_request,
        }
    }
}

/// Source of authorization decisions.
pub trait AccessAuthority: Send + Sync {
    fn check(&self, kind: AccessKind) -> PermissionInfo;
}

/// Authority backed by the host operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAccess;

impl AccessAuthority for SystemAccess {
    fn check(&self, kind: AccessKind) -> PermissionInfo {
        match kind {
            AccessKind::Camera => check_permission_detailed(),
            // Photos go to a plain directory; the library checks writability itself.
            AccessKind::PhotoLibrary => PermissionInfo::granted("Photo library is a local directory"),
        }
    }
}

/// Ask the authority for access without blocking the async caller.
///
/// A panicking check is reported as denied.
pub async fn request_access(authority: Arc<dyn AccessAuthority>, kind: AccessKind) -> PermissionInfo {
    log::info!("Requesting {} access", kind);

    let info = match tokio::task::spawn_blocking(move || authority.check(kind)).await {
        Ok(info) => info,
        Err(e) => PermissionInfo::denied(format!("{} authorization check failed: {}", kind, e), false),
    };

    if info.status.is_granted() {
        log::info!("{} access granted: {}", kind, info.message);
    } else {
        log::warn!("{} access {}: {}", kind, info.status, info.message);
    }
    info
}

/// Check camera permission status
/// Returns permission status for the current platform
pub fn check_permission() -> PermissionStatus {
    check_permission_detailed().status
}

/// Check camera permission status with detailed information
pub fn check_permission_detailed() -> PermissionInfo {
    #[cfg(target_os = "linux")]
    {
        check_permission_linux()
    }

    #[cfg(not(target_os = "linux"))]
    {
        check_permission_by_query()
    }
}

/// Enumerating devices only succeeds once the OS privacy settings allow it.
#[cfg(not(target_os = "linux"))]
fn check_permission_by_query() -> PermissionInfo {
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(devices) if !devices.is_empty() => {
            PermissionInfo::granted(format!("Camera access granted ({} devices visible)", devices.len()))
        }
        Ok(_) => PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "No cameras visible - access may not be granted yet".to_string(),
            can_request: true,
        },
        Err(e) => PermissionInfo::denied(format!("Camera access denied: {}", e), true),
    }
}

#[cfg(target_os = "linux")]
fn check_permission_linux() -> PermissionInfo {
    use std::fs::OpenOptions;
    use std::path::Path;

    let video_devices: Vec<String> = (0..10)
        .map(|i| format!("/dev/video{}", i))
        .filter(|path| Path::new(path).exists())
        .collect();

    let Some(first_device) = video_devices.first() else {
        return PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "No video devices found at /dev/video*".to_string(),
            can_request: false,
        };
    };

    match OpenOptions::new().read(true).open(first_device) {
        Ok(_) => PermissionInfo::granted(format!(
            "Camera access granted ({} of {} video devices readable)",
            first_device,
            video_devices.len()
        )),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => PermissionInfo::denied(
            format!(
                "Camera device {} exists but is not readable - run: sudo usermod -a -G video $USER",
                first_device
            ),
            true,
        ),
        Err(e) => PermissionInfo::denied(format!("Cannot access {}: {}", first_device, e), true),
    }
}
