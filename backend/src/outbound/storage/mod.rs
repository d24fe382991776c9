//! Filesystem storage for uploaded inspection images.

mod cap_std_image_store;

pub use cap_std_image_store::CapStdImageStore;
