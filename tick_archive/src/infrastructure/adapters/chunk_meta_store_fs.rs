// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Subdirectory Partitioner (C8)
//!
//! Persists one `.chunk_meta` Java-properties-style file per run namespace,
//! directly under `<chunk_directory>/<run_namespace>/.chunk_meta`. Once
//! written, a run's `ticks_per_subdirectory` never changes, so this adapter
//! caches the parsed record in memory after the first successful load or
//! compute and never re-reads the file afterward.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use tick_archive_domain::repositories::ChunkMetaStore;
use tick_archive_domain::value_objects::{ChunkMetaRecord, RunNamespace};
use tick_archive_domain::ArchiveError;
use tracing::{debug, warn};

const META_FILE_NAME: &str = ".chunk_meta";

/// Filesystem-backed [`ChunkMetaStore`].
pub struct ChunkMetaStoreFs {
    root: PathBuf,
    cache: RwLock<HashMap<RunNamespace, ChunkMetaRecord>>,
}

impl ChunkMetaStoreFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn meta_path(&self, namespace: &RunNamespace) -> PathBuf {
        self.root.join(namespace.as_str()).join(META_FILE_NAME)
    }
}

#[async_trait]
impl ChunkMetaStore for ChunkMetaStoreFs {
    async fn cached(&self, namespace: &RunNamespace) -> Option<ChunkMetaRecord> {
        self.cache.read().get(namespace).copied()
    }

    async fn load(&self, namespace: &RunNamespace) -> Result<Option<ChunkMetaRecord>, ArchiveError> {
        if let Some(cached) = self.cached(namespace).await {
            return Ok(Some(cached));
        }
        let path = self.meta_path(namespace);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ArchiveError::from(e)),
        };
        let record = ChunkMetaRecord::from_properties(&contents)
            .map_err(|e| ArchiveError::io_error(format!("corrupt .chunk_meta for {namespace}: {e}")))?;
        self.cache.write().insert(namespace.clone(), record);
        Ok(Some(record))
    }

    async fn compute_and_persist(
        &self,
        namespace: &RunNamespace,
        first_tick: u64,
        last_tick: u64,
        tick_count: u64,
        max_files_per_directory: u64,
    ) -> Result<ChunkMetaRecord, ArchiveError> {
        if let Some(cached) = self.cached(namespace).await {
            return Ok(cached);
        }
        if let Some(existing) = self.load(namespace).await? {
            return Ok(existing);
        }

        let record = ChunkMetaRecord::compute(first_tick, last_tick, tick_count, max_files_per_directory);
        let namespace_dir = self.root.join(namespace.as_str());
        tokio::fs::create_dir_all(&namespace_dir).await?;

        let final_path = self.meta_path(namespace);
        let tmp_path = namespace_dir.join(format!(".{META_FILE_NAME}.tmp-{}", std::process::id()));
        tokio::fs::write(&tmp_path, record.to_properties()).await?;

        // `rename(2)` atomically *replaces* an existing destination on POSIX, so it
        // can never detect a race here. Publish via `hard_link`, which fails with
        // `AlreadyExists` if another writer already published first, then remove the
        // temp file either way.
        let publish_result = tokio::fs::hard_link(&tmp_path, &final_path).await;
        let _ = tokio::fs::remove_file(&tmp_path).await;

        match publish_result {
            Ok(()) => {
                debug!(namespace = %namespace, ticks_per_subdirectory = record.ticks_per_subdirectory, "persisted .chunk_meta");
                self.cache.write().insert(namespace.clone(), record);
                Ok(record)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Another writer won the race and created the file first; defer to
                // whatever they persisted.
                warn!(namespace = %namespace, "lost .chunk_meta persist race, re-reading winner");
                let contents = tokio::fs::read_to_string(&final_path).await?;
                let winner = ChunkMetaRecord::from_properties(&contents)
                    .map_err(|e| ArchiveError::io_error(format!("corrupt .chunk_meta for {namespace}: {e}")))?;
                self.cache.write().insert(namespace.clone(), winner);
                Ok(winner)
            }
            Err(e) => Err(ArchiveError::from(e)),
        }
    }
}
