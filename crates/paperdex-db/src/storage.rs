//! Object storage for paper files.
//!
//! The store treats the static-files tree as a simple put/move/delete
//! object store addressed by resolver slugs. The trait exists so tests can
//! substitute failing or recording backends; the filesystem implementation
//! writes atomically (temp file + rename) under a single base directory.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use paperdex_core::Result;

/// Storage backend trait for the paper object store.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified slug.
    async fn write(&self, slug: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified slug.
    async fn read(&self, slug: &str) -> Result<Vec<u8>>;

    /// Move an object from one slug to another.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Delete the object at the specified slug. Deleting a missing object
    /// is a no-op.
    async fn delete(&self, slug: &str) -> Result<()>;

    /// Check whether an object exists at the specified slug.
    async fn exists(&self, slug: &str) -> Result<bool>;
}

/// Filesystem storage backend rooted at the static-files directory.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, slug: &str) -> PathBuf {
        self.base_path.join(slug)
    }

    /// Validate that the backend can write, read, move, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing mounts) before the first upload does.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("probe.bin");
        let moved_file = test_dir.join("probe-moved.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::rename(&test_file, &moved_file)
            .await
            .map_err(|e| format!("rename({:?}): {}", test_file, e))?;

        fs::remove_file(&moved_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", moved_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, slug: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(slug);
        debug!(slug = %slug, full_path = %full_path.display(), size = data.len(), "storage: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "storage: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "storage: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "storage: rename failed");
            e
        })?;

        // Served directly by the static file server, so world-readable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, slug: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(slug);
        Ok(fs::read(full_path).await?)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.full_path(from);
        let to_path = self.full_path(to);
        debug!(from = %from_path.display(), to = %to_path.display(), "storage: rename");

        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&from_path, &to_path).await.map_err(|e| {
            warn!(from = %from_path.display(), to = %to_path.display(), error = %e, "storage: rename failed");
            e
        })?;
        Ok(())
    }

    async fn delete(&self, slug: &str) -> Result<()> {
        let full_path = self.full_path(slug);
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, slug: &str) -> Result<bool> {
        let full_path = self.full_path(slug);
        Ok(fs::try_exists(full_path).await?)
    }
}
