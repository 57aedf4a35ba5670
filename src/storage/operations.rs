//! Storage operations
//!
//! The virtual filesystem adapter: resolves client paths against a session's
//! working directory and forwards operations to the storage backend.

use log::{debug, info};
use std::sync::Arc;

use crate::error::StorageError;
use crate::storage::backend::{FileReader, FileWriter, StorageBackend};
use crate::storage::results::{DirEntry, Metadata};
use crate::storage::validation::{VirtualPath, resolve};

/// Root-confined view of a storage backend.
#[derive(Debug, Clone)]
pub struct VirtualFilesystem {
    backend: Arc<dyn StorageBackend>,
}

impl VirtualFilesystem {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Resolve a client-supplied path relative to `cwd`.
    pub fn resolve(&self, cwd: &VirtualPath, client_path: &str) -> Result<VirtualPath, StorageError> {
        resolve(cwd, client_path)
    }

    pub async fn stat(&self, path: &VirtualPath) -> Result<Metadata, StorageError> {
        self.backend.metadata(path).await
    }

    /// Lists a directory. Listing a file yields that single entry.
    pub async fn list(&self, path: &VirtualPath) -> Result<Vec<DirEntry>, StorageError> {
        let metadata = self.backend.metadata(path).await?;
        if metadata.is_directory {
            let entries = self.backend.list(path).await?;
            debug!("Listed {} ({} entries)", path, entries.len());
            Ok(entries)
        } else {
            let name = path.file_name().unwrap_or_default().to_string();
            Ok(vec![DirEntry { name, metadata }])
        }
    }

    pub async fn open_read(&self, path: &VirtualPath) -> Result<FileReader, StorageError> {
        self.backend.open_read(path).await
    }

    pub async fn open_write(&self, path: &VirtualPath) -> Result<FileWriter, StorageError> {
        self.backend.open_write(path).await
    }

    pub async fn delete(&self, path: &VirtualPath) -> Result<(), StorageError> {
        self.backend.delete(path).await?;
        info!("Deleted {}", path);
        Ok(())
    }

    pub async fn make_directory(&self, path: &VirtualPath) -> Result<(), StorageError> {
        self.backend.make_directory(path).await?;
        info!("Created directory {}", path);
        Ok(())
    }

    pub async fn remove_directory(&self, path: &VirtualPath) -> Result<(), StorageError> {
        self.backend.remove_directory(path).await?;
        info!("Removed directory {}", path);
        Ok(())
    }

    pub async fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<(), StorageError> {
        self.backend.rename(from, to).await?;
        info!("Renamed {} to {}", from, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Filesystem;
    use pretty_assertions::assert_eq;

    fn vfs() -> (tempfile::TempDir, VirtualFilesystem) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Filesystem::new(dir.path()).unwrap();
        (dir, VirtualFilesystem::new(Arc::new(backend)))
    }

    #[tokio::test]
    async fn list_of_file_is_single_entry() {
        let (dir, vfs) = vfs();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/readme"), b"abc").unwrap();

        let cwd = vfs.resolve(&VirtualPath::root(), "docs").unwrap();
        let path = vfs.resolve(&cwd, "readme").unwrap();
        let entries = vfs.list(&path).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "readme");
        assert_eq!(entries[0].size(), 3);
    }

    #[tokio::test]
    async fn resolve_rejects_escape_before_touching_backend() {
        let (_dir, vfs) = vfs();
        let err = vfs.resolve(&VirtualPath::root(), "../outside").unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn mutating_operations_roundtrip() {
        let (dir, vfs) = vfs();
        let root = VirtualPath::root();
        let sub = vfs.resolve(&root, "sub").unwrap();
        vfs.make_directory(&sub).await.unwrap();
        assert!(vfs.stat(&sub).await.unwrap().is_directory);

        std::fs::write(dir.path().join("sub/a"), b"1").unwrap();
        let a = vfs.resolve(&sub, "a").unwrap();
        let b = vfs.resolve(&sub, "b").unwrap();
        vfs.rename(&a, &b).await.unwrap();
        assert!(matches!(vfs.stat(&a).await, Err(StorageError::NotFound(_))));

        vfs.delete(&b).await.unwrap();
        vfs.remove_directory(&sub).await.unwrap();
        assert!(vfs.list(&root).await.unwrap().is_empty());
    }
}
