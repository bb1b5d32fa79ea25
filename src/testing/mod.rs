//! Test doubles for running the full pipeline without hardware.
//!
//! Used by the test-suite and by `dualcam --simulate`.

mod simulated;

pub use simulated::{BackendCall, JournalEntry, SimulatedBackend};

use crate::errors::CameraError;
use crate::library::{PhotoLibrary, SavedPhoto};
use crate::permissions::{AccessAuthority, AccessKind, PermissionInfo, PermissionStatus};
use crate::platform::encode_jpeg;
use crate::types::CameraRole;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Gradient JPEG tinted per role: reddish from the front camera, bluish from the back.
pub fn synthetic_photo(
    role: CameraRole,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, CameraError> {
    let mut rgb = vec![0u8; (width * height * 3) as usize];
    let tint: u8 = match role {
        CameraRole::Front => 0,
        CameraRole::Back => 2,
    };

    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            rgb[idx] = (x % 256) as u8;
            rgb[idx + 1] = (y % 256) as u8;
            rgb[idx + tint as usize] = 220;
        }
    }

    encode_jpeg(width, height, rgb, quality)
}

/// Photo library that keeps everything in memory.
#[derive(Clone, Default)]
pub struct MemoryLibrary {
    photos: Arc<Mutex<Vec<Bytes>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn photos(&self) -> Vec<Bytes> {
        self.photos.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl PhotoLibrary for MemoryLibrary {
    fn save(&self, data: &Bytes) -> Result<SavedPhoto, CameraError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CameraError::Storage("simulated write failure".to_string()));
        }
        let mut photos = self.photos.lock().unwrap_or_else(|p| p.into_inner());
        photos.push(data.clone());
        Ok(SavedPhoto {
            id: Uuid::new_v4(),
            location: format!("memory://{}", photos.len() - 1),
            bytes: data.len(),
        })
    }
}

/// Authority with fixed answers.
#[derive(Debug, Clone, Copy)]
pub struct StaticAccess {
    pub camera: PermissionStatus,
    pub photo_library: PermissionStatus,
}

impl StaticAccess {
    pub fn granted() -> Self {
        Self {
            camera: PermissionStatus::Granted,
            photo_library: PermissionStatus::Granted,
        }
    }

    pub fn camera_denied() -> Self {
        Self {
            camera: PermissionStatus::Denied,
            ..Self::granted()
        }
    }

    pub fn photo_library(status: PermissionStatus) -> Self {
        Self {
            photo_library: status,
            ..Self::granted()
        }
    }
}

impl AccessAuthority for StaticAccess {
    fn check(&self, kind: AccessKind) -> PermissionInfo {
        let status = match kind {
            AccessKind::Camera => self.camera,
            AccessKind::PhotoLibrary => self.photo_library,
        };
        PermissionInfo {
            status,
            message: format!("{} access {}", kind, status),
            can_request: status == PermissionStatus::NotDetermined,
        }
    }
}
