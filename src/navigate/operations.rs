//! Navigation operations implementation

use log::debug;

use crate::error::StorageError;
use crate::storage::{VirtualFilesystem, VirtualPath};

/// Changes the working directory for a client.
///
/// The target is resolved against `cwd` and must name an existing directory.
pub async fn change_directory(
    vfs: &VirtualFilesystem,
    cwd: &VirtualPath,
    target_path: &str,
) -> Result<VirtualPath, StorageError> {
    if target_path.is_empty() {
        return Err(StorageError::InvalidPath(String::new()));
    }

    let new_path = vfs.resolve(cwd, target_path)?;
    let metadata = vfs.stat(&new_path).await?;
    if !metadata.is_directory {
        return Err(StorageError::NotADirectory(new_path.to_string()));
    }

    debug!("Directory changed from {} to {}", cwd, new_path);
    Ok(new_path)
}

/// Parent of `cwd`; at the root this stays at the root.
pub fn change_to_parent(cwd: &VirtualPath) -> VirtualPath {
    cwd.parent()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Filesystem;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn vfs() -> (tempfile::TempDir, VirtualFilesystem) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/file.txt"), b"x").unwrap();
        let backend = Filesystem::new(dir.path()).unwrap();
        (dir, VirtualFilesystem::new(Arc::new(backend)))
    }

    #[tokio::test]
    async fn descends_and_climbs() {
        let (_dir, vfs) = vfs();
        let root = VirtualPath::root();
        let a = change_directory(&vfs, &root, "a").await.unwrap();
        assert_eq!(a.as_str(), "/a");
        let b = change_directory(&vfs, &a, "b").await.unwrap();
        assert_eq!(b.as_str(), "/a/b");
        assert_eq!(change_directory(&vfs, &b, "/").await.unwrap(), root);
        assert_eq!(change_directory(&vfs, &b, "../..").await.unwrap(), root);
    }

    #[tokio::test]
    async fn rejects_bad_targets() {
        let (_dir, vfs) = vfs();
        let root = VirtualPath::root();
        assert!(matches!(
            change_directory(&vfs, &root, "missing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            change_directory(&vfs, &root, "a/file.txt").await,
            Err(StorageError::NotADirectory(_))
        ));
        assert!(matches!(
            change_directory(&vfs, &root, "..").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            change_directory(&vfs, &root, "").await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn parent_of_root_is_root() {
        let root = VirtualPath::root();
        assert_eq!(change_to_parent(&root), root);
    }
}
