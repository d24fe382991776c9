//! `ImageStore` backed by a capability-scoped directory.
//!
//! Writes go through a `cap_std::fs::Dir` opened on the upload root, so a
//! relative path can never reach outside it even if validation were skipped.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tracing::debug;

use crate::domain::ports::{ImageStore, ImageStoreError};

/// Upload directory rooted at a fixed path.
#[derive(Clone)]
pub struct CapStdImageStore {
    root: PathBuf,
    dir: Arc<Dir>,
}

impl CapStdImageStore {
    /// Create the root if needed and open it.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the directory cannot be created or opened.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let requested = root.as_ref();
        Dir::create_ambient_dir_all(requested, ambient_authority())?;
        let dir = Dir::open_ambient_dir(requested, ambient_authority())?;
        Ok(Self {
            root: std::fs::canonicalize(requested)?,
            dir: Arc::new(dir),
        })
    }

    /// Absolute upload root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reject paths that are empty, absolute or climb with `..`.
fn relative_inside(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

#[async_trait]
impl ImageStore for CapStdImageStore {
    async fn save(&self, relative: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        let path = relative_inside(Path::new(relative))
            .ok_or_else(|| ImageStoreError::invalid_path(relative))?;
        let dir = self
            .dir
            .try_clone()
            .map_err(|err| ImageStoreError::io(err.to_string()))?;
        let data = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                dir.create_dir_all(parent)?;
            }
            dir.write(&path, data)
        })
        .await
        .map_err(|err| ImageStoreError::io(err.to_string()))?
        .map_err(|err| ImageStoreError::io(err.to_string()))?;
        debug!(path = relative, bytes = bytes.len(), "stored image");
        Ok(())
    }

    async fn remove(&self, relative: &str) -> Result<(), ImageStoreError> {
        let path = relative_inside(Path::new(relative))
            .ok_or_else(|| ImageStoreError::invalid_path(relative))?;
        let dir = self
            .dir
            .try_clone()
            .map_err(|err| ImageStoreError::io(err.to_string()))?;
        tokio::task::spawn_blocking(move || match dir.remove_file(&path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        })
        .await
        .map_err(|err| ImageStoreError::io(err.to_string()))?
        .map_err(|err| ImageStoreError::io(err.to_string()))?;
        debug!(path = relative, "removed image");
        Ok(())
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ImageStoreError> {
        let candidate = Path::new(path.trim());
        if candidate.is_absolute() {
            let inner = candidate
                .strip_prefix(&self.root)
                .ok()
                .and_then(relative_inside)
                .ok_or_else(|| ImageStoreError::invalid_path(path))?;
            return Ok(self.root.join(inner));
        }
        relative_inside(candidate)
            .map(|inner| self.root.join(inner))
            .ok_or_else(|| ImageStoreError::invalid_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn store() -> (TempDir, CapStdImageStore) {
        let tmp = TempDir::new().expect("temp dir");
        let store = CapStdImageStore::open(tmp.path().join("uploads")).expect("open store");
        (tmp, store)
    }

    #[rstest]
    #[tokio::test]
    async fn save_creates_nested_directories(store: (TempDir, CapStdImageStore)) {
        let (_tmp, store) = store;
        store
            .save("inspections/4/4_20250914.jpg", b"jpeg")
            .await
            .expect("saved");
        let written =
            std::fs::read(store.root().join("inspections/4/4_20250914.jpg")).expect("readable");
        assert_eq!(written, b"jpeg");
    }

    #[rstest]
    #[tokio::test]
    async fn save_refuses_escaping_paths(store: (TempDir, CapStdImageStore)) {
        let (_tmp, store) = store;
        let err = store.save("../outside.jpg", b"x").await.expect_err("escape");
        assert!(matches!(err, ImageStoreError::InvalidPath { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn remove_deletes_saved_file_and_ignores_missing_ones(
        store: (TempDir, CapStdImageStore),
    ) {
        let (_tmp, store) = store;
        store.save("inspections/4/a.jpg", b"jpeg").await.expect("saved");
        store.remove("inspections/4/a.jpg").await.expect("removed");
        assert!(!store.root().join("inspections/4/a.jpg").exists());
        store.remove("inspections/4/a.jpg").await.expect("already gone");
    }

    #[rstest]
    fn resolve_joins_relative_paths(store: (TempDir, CapStdImageStore)) {
        let (_tmp, store) = store;
        let resolved = store.resolve("inspections/1/a.jpg").expect("inside root");
        assert_eq!(resolved, store.root().join("inspections/1/a.jpg"));
    }

    #[rstest]
    fn resolve_accepts_absolute_paths_under_root(store: (TempDir, CapStdImageStore)) {
        let (_tmp, store) = store;
        let absolute = store.root().join("x.png");
        let resolved = store
            .resolve(absolute.to_str().expect("utf-8 path"))
            .expect("inside root");
        assert_eq!(resolved, absolute);
    }

    #[rstest]
    #[case("/etc/passwd")]
    #[case("inspections/../../secret.jpg")]
    #[case("")]
    fn resolve_rejects_paths_outside_root(
        store: (TempDir, CapStdImageStore),
        #[case] path: &str,
    ) {
        let (_tmp, store) = store;
        assert!(matches!(
            store.resolve(path),
            Err(ImageStoreError::InvalidPath { .. })
        ));
    }
}
