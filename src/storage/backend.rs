//! Storage backend capability
//!
//! The protocol layer only ever talks to storage through this trait, so
//! alternative backends can be substituted without touching session code.
//! Implementations are shared between all sessions and must tolerate
//! concurrent calls.

use async_trait::async_trait;
use std::fmt::Debug;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::StorageError;
use crate::storage::results::{DirEntry, Metadata};
use crate::storage::validation::VirtualPath;

/// Byte stream returned by `open_read`
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Byte sink returned by `open_write`; shut it down to commit the data
pub type FileWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Storage operations keyed by normalized virtual paths.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// File or directory metadata
    async fn metadata(&self, path: &VirtualPath) -> Result<Metadata, StorageError>;

    /// Entries of a directory, ordered by name
    async fn list(&self, path: &VirtualPath) -> Result<Vec<DirEntry>, StorageError>;

    async fn open_read(&self, path: &VirtualPath) -> Result<FileReader, StorageError>;

    /// Create or truncate a file for writing
    async fn open_write(&self, path: &VirtualPath) -> Result<FileWriter, StorageError>;

    async fn delete(&self, path: &VirtualPath) -> Result<(), StorageError>;

    async fn make_directory(&self, path: &VirtualPath) -> Result<(), StorageError>;

    async fn remove_directory(&self, path: &VirtualPath) -> Result<(), StorageError>;

    async fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<(), StorageError>;
}
