//! Photo persistence.
//!
//! The completion bridge hands every finished photo to a [`PhotoLibrary`]
//! once photo-library access has been granted for that capture.

use crate::errors::CameraError;
use bytes::Bytes;
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where a photo ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPhoto {
    pub id: Uuid,
    pub location: String,
    pub bytes: usize,
}

pub trait PhotoLibrary: Send + Sync {
    /// Persist one photo in a single write.
    fn save(&self, data: &Bytes) -> Result<SavedPhoto, CameraError>;
}

/// Library that stores each photo as its own file in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
    prefix: String,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(&self, id: &Uuid, data: &[u8]) -> String {
        let extension = image::guess_format(data)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("bin");
        let simple = id.simple().to_string();
        format!(
            "{}_{}_{}.{}",
            self.prefix,
            Utc::now().format("%Y%m%d_%H%M%S%.3f"),
            &simple[..8],
            extension
        )
    }
}

impl PhotoLibrary for DirectoryLibrary {
    fn save(&self, data: &Bytes) -> Result<SavedPhoto, CameraError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            CameraError::Storage(format!("Photo directory {:?} unavailable: {}", self.root, e))
        })?;

        let id = Uuid::new_v4();
        let path = self.root.join(self.file_name(&id, data));
        let partial = path.with_extension("part");

        // Write next to the target and rename so readers never see half a photo.
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&partial)?;
            file.write_all(data)?;
            file.sync_all()?;
            fs::rename(&partial, &path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&partial);
            CameraError::Storage(format!("Failed to write {:?}: {}", path, e))
        })?;

        Ok(SavedPhoto {
            id,
            location: path.display().to_string(),
            bytes: data.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::encode_jpeg;

    #[test]
    fn test_save_jpeg_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path().join("photos"), "unit");

        let jpeg = Bytes::from(encode_jpeg(8, 8, vec![200; 8 * 8 * 3], 90).unwrap());
        let saved = library.save(&jpeg).unwrap();

        assert!(saved.location.ends_with(".jpg"));
        assert!(saved.location.contains("unit_"));
        assert_eq!(fs::read(&saved.location).unwrap(), jpeg.to_vec());
    }

    #[test]
    fn test_unknown_bytes_get_bin_extension() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path(), "raw");
        let saved = library.save(&Bytes::from_static(b"not an image")).unwrap();
        assert!(saved.location.ends_with(".bin"));
        assert_eq!(saved.bytes, 12);
    }

    #[test]
    fn test_blocked_directory_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let library = DirectoryLibrary::new(blocker.join("photos"), "x");
        assert!(matches!(
            library.save(&Bytes::from_static(b"x")),
            Err(CameraError::Storage(_))
        ));
    }

    #[test]
    fn test_each_save_is_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let library = DirectoryLibrary::new(dir.path(), "seq");
        let a = library.save(&Bytes::from_static(b"a")).unwrap();
        let b = library.save(&Bytes::from_static(b"b")).unwrap();
        assert_ne!(a.location, b.location);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
