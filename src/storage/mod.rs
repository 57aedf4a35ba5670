//! Storage management
//!
//! The storage backend capability, the local filesystem backend, path
//! validation and the virtual filesystem adapter sessions use.

pub mod backend;
pub mod filesystem;
pub mod operations;
pub mod results;
pub mod validation;

pub use backend::{FileReader, FileWriter, StorageBackend};
pub use filesystem::Filesystem;
pub use operations::VirtualFilesystem;
pub use results::{DirEntry, Metadata};
pub use validation::{MAX_DIRECTORY_DEPTH, VirtualPath, resolve};
