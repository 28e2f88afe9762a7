//! Scratch-directory artifact tier.
//!
//! One file per artifact, named `<artifact id>.img`, under a directory owned
//! by this process. Files are written to a unique temporary name first and
//! then renamed into place; on the platforms we target a rename within one
//! directory is atomic, so a concurrent reader either sees the complete
//! artifact or no file at all.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use puml_core::{ArtifactBytes, ArtifactId, PumlResult, StorageError};

use super::traits::{ArtifactTier, TierStats};

/// File extension of stored artifacts.
pub const ARTIFACT_EXTENSION: &str = "img";

/// On-disk tier rooted at a scratch directory.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    tmp_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl DiskStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> PumlResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StorageError::io("create_dir", &root, e))?;
        tracing::debug!(root = %root.display(), "Disk artifact store ready");

        Ok(Self {
            root,
            tmp_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of an artifact.
    pub fn artifact_path(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(format!("{}.{}", id, ARTIFACT_EXTENSION))
    }

    fn temp_path(&self, id: &ArtifactId) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".{}.{}.{}.tmp", id, std::process::id(), seq))
    }

    async fn read(&self, id: &ArtifactId) -> PumlResult<Option<ArtifactBytes>> {
        let path = self.artifact_path(id);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(ArtifactBytes::from(data)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => Err(StorageError::io("read", &path, e).into()),
        }
    }

    async fn write(&self, id: &ArtifactId, bytes: &[u8]) -> PumlResult<()> {
        // The directory may have been wiped by `clear`.
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::io("create_dir", &self.root, e))?;

        let tmp = self.temp_path(id);
        let path = self.artifact_path(id);

        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::io("write", &tmp, e).into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::io("rename", &path, e).into());
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove(&self, id: &ArtifactId) -> PumlResult<()> {
        let path = self.artifact_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(artifact_id = %id, "Deleted artifact file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io("remove", &path, e).into()),
        }
    }

    async fn remove_all(&self) -> PumlResult<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io("remove_dir", &self.root, e).into()),
        }
    }

    /// Number of complete artifacts currently on disk.
    pub async fn entry_count(&self) -> PumlResult<u64> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::io("read_dir", &self.root, e).into()),
        };

        let mut count = 0;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StorageError::io("read_dir", &self.root, e))?
        {
            let is_artifact = entry
                .path()
                .extension()
                .is_some_and(|ext| ext == ARTIFACT_EXTENSION);
            if is_artifact {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl ArtifactTier for DiskStore {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, id: &ArtifactId) -> PumlResult<Option<ArtifactBytes>> {
        self.read(id).await
    }

    async fn put(&self, id: &ArtifactId, bytes: ArtifactBytes) -> PumlResult<()> {
        self.write(id, &bytes).await
    }

    async fn evict(&self, id: &ArtifactId) -> PumlResult<()> {
        self.remove(id).await
    }

    async fn clear(&self) -> PumlResult<()> {
        self.remove_all().await
    }

    async fn stats(&self) -> PumlResult<TierStats> {
        Ok(TierStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.entry_count().await?,
        })
    }
}
