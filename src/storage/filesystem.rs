//! File system storage backend
//!
//! Maps virtual paths onto a directory on local disk using `tokio::fs`.

use async_trait::async_trait;
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

use crate::error::StorageError;
use crate::storage::backend::{FileReader, FileWriter, StorageBackend};
use crate::storage::results::{DirEntry, Metadata};
use crate::storage::validation::VirtualPath;

/// Storage backend rooted at a local directory.
#[derive(Debug, Clone)]
pub struct Filesystem {
    root: PathBuf,
}

impl Filesystem {
    /// Create a backend for an existing directory.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Real location of `path`, refusing anything that resolves outside the
    /// root through symlinks. Paths that do not exist yet are checked through
    /// their parent directory. Dangling symlinks are refused.
    async fn confined(&self, path: &VirtualPath) -> Result<PathBuf, StorageError> {
        let real = self.root.join(path.to_relative_path());

        let resolved = match fs::canonicalize(&real).await {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Ok(md) = fs::symlink_metadata(&real).await {
                    if md.file_type().is_symlink() {
                        warn!("Refusing {} which is a dangling symlink", path);
                        return Err(StorageError::PermissionDenied(path.to_string()));
                    }
                }
                let parent = real.parent().unwrap_or(&self.root);
                fs::canonicalize(parent)
                    .await
                    .map_err(|e| StorageError::from_io(e, path.as_str()))?
            }
            Err(e) => return Err(StorageError::from_io(e, path.as_str())),
        };

        if !resolved.starts_with(&self.root) {
            warn!(
                "Refusing {} which resolves outside the server root",
                path
            );
            return Err(StorageError::PermissionDenied(path.to_string()));
        }

        Ok(real)
    }
}

fn to_metadata(md: &std::fs::Metadata) -> Metadata {
    Metadata {
        size: md.len(),
        is_directory: md.is_dir(),
        modified: md.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    }
}

#[async_trait]
impl StorageBackend for Filesystem {
    async fn metadata(&self, path: &VirtualPath) -> Result<Metadata, StorageError> {
        let real = self.confined(path).await?;
        let md = fs::metadata(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))?;
        Ok(to_metadata(&md))
    }

    async fn list(&self, path: &VirtualPath) -> Result<Vec<DirEntry>, StorageError> {
        let real = self.confined(path).await?;
        let mut entries = fs::read_dir(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))?;

        let mut listing = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))?
        {
            // Follows symlinks; dangling ones are skipped.
            match fs::metadata(entry.path()).await {
                Ok(md) => listing.push(DirEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    metadata: to_metadata(&md),
                }),
                Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
            }
        }

        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn open_read(&self, path: &VirtualPath) -> Result<FileReader, StorageError> {
        let real = self.confined(path).await?;
        if fs::metadata(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))?
            .is_dir()
        {
            return Err(StorageError::IsADirectory(path.to_string()));
        }
        let file = fs::File::open(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))?;
        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &VirtualPath) -> Result<FileWriter, StorageError> {
        if path.is_root() {
            return Err(StorageError::IsADirectory(path.to_string()));
        }
        let real = self.confined(path).await?;
        let file = fs::File::create(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))?;
        Ok(Box::new(file))
    }

    async fn delete(&self, path: &VirtualPath) -> Result<(), StorageError> {
        let real = self.confined(path).await?;
        fs::remove_file(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))
    }

    async fn make_directory(&self, path: &VirtualPath) -> Result<(), StorageError> {
        let real = self.confined(path).await?;
        fs::create_dir(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))
    }

    async fn remove_directory(&self, path: &VirtualPath) -> Result<(), StorageError> {
        if path.is_root() {
            return Err(StorageError::PermissionDenied(path.to_string()));
        }
        let real = self.confined(path).await?;
        fs::remove_dir(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path.as_str()))
    }

    async fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<(), StorageError> {
        if from.is_root() || to.is_root() {
            return Err(StorageError::PermissionDenied(from.to_string()));
        }
        let real_from = self.confined(from).await?;
        let real_to = self.confined(to).await?;
        fs::rename(&real_from, &real_to)
            .await
            .map_err(|e| StorageError::from_io(e, from.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::validation::resolve;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn vp(s: &str) -> VirtualPath {
        resolve(&VirtualPath::root(), s).unwrap()
    }

    fn backend() -> (tempfile::TempDir, Filesystem) {
        let dir = tempfile::tempdir().unwrap();
        let fs = Filesystem::new(dir.path()).unwrap();
        (dir, fs)
    }

    #[tokio::test]
    async fn write_then_read() {
        let (_dir, fs) = backend();
        let mut w = fs.open_write(&vp("greeting.txt")).await.unwrap();
        w.write_all(b"hello").await.unwrap();
        w.shutdown().await.unwrap();
        drop(w);

        let mut r = fs.open_read(&vp("greeting.txt")).await.unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");

        let md = fs.metadata(&vp("greeting.txt")).await.unwrap();
        assert_eq!(md.size, 5);
        assert!(!md.is_directory);
    }

    #[tokio::test]
    async fn open_write_truncates() {
        let (dir, fs) = backend();
        std::fs::write(dir.path().join("f.txt"), b"a much longer payload").unwrap();
        let mut w = fs.open_write(&vp("f.txt")).await.unwrap();
        w.write_all(b"short").await.unwrap();
        w.shutdown().await.unwrap();
        drop(w);
        assert_eq!(std::fs::read(dir.path().join("f.txt")).unwrap(), b"short");
    }

    #[tokio::test]
    async fn list_is_sorted_with_metadata() {
        let (dir, fs) = backend();
        std::fs::write(dir.path().join("b.txt"), b"12").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();

        let entries = fs.list(&VirtualPath::root()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
        assert_eq!(entries[1].size(), 2);
        assert!(entries[2].is_directory());
    }

    #[tokio::test]
    async fn missing_entries_are_not_found() {
        let (_dir, fs) = backend();
        assert!(matches!(
            fs.metadata(&vp("nope")).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            fs.open_read(&vp("nope")).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            fs.open_write(&vp("missing/dir/file")).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn directory_operations() {
        let (dir, fs) = backend();
        fs.make_directory(&vp("sub")).await.unwrap();
        assert!(dir.path().join("sub").is_dir());
        assert!(matches!(
            fs.make_directory(&vp("sub")).await,
            Err(StorageError::AlreadyExists(_))
        ));
        assert!(matches!(
            fs.open_read(&vp("sub")).await,
            Err(StorageError::IsADirectory(_))
        ));

        std::fs::write(dir.path().join("sub/f"), b"x").unwrap();
        fs.rename(&vp("sub/f"), &vp("g")).await.unwrap();
        assert!(dir.path().join("g").is_file());

        fs.delete(&vp("g")).await.unwrap();
        fs.remove_directory(&vp("sub")).await.unwrap();
        assert!(!dir.path().join("sub").exists());
        assert!(fs.remove_directory(&VirtualPath::root()).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_outside_root_is_denied() {
        let (dir, fs) = backend();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), b"s").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        assert!(matches!(
            fs.open_read(&vp("escape/secret")).await,
            Err(StorageError::PermissionDenied(_))
        ));
        assert!(matches!(
            fs.open_write(&vp("escape/new")).await,
            Err(StorageError::PermissionDenied(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dangling_symlink_is_denied() {
        let (dir, fs) = backend();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("escaped.txt");
        std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

        assert!(matches!(
            fs.open_write(&vp("link.txt")).await,
            Err(StorageError::PermissionDenied(_))
        ));
        assert!(matches!(
            fs.metadata(&vp("link.txt")).await,
            Err(StorageError::PermissionDenied(_))
        ));
        assert!(!target.exists());
    }
}
