//! Driven port for storing uploaded images under the upload root.

use std::path::PathBuf;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by image storage adapters.
    pub enum ImageStoreError {
        /// The path leaves the upload root or is otherwise unusable.
        InvalidPath { path: String } => "path is outside the upload root: {path}",
        /// Filesystem access failed.
        Io { message: String } => "image storage failed: {message}",
    }
}

/// Port for the upload directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write `bytes` at `relative`, creating parent directories.
    async fn save(&self, relative: &str, bytes: &[u8]) -> Result<(), ImageStoreError>;

    /// Delete a previously saved file. Missing files are not an error.
    async fn remove(&self, relative: &str) -> Result<(), ImageStoreError>;

    /// Absolute location of a stored or caller-supplied path. Relative paths
    /// resolve under the root; paths escaping it are refused.
    fn resolve(&self, path: &str) -> Result<PathBuf, ImageStoreError>;
}
