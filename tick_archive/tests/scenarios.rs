// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios: an empty archive, bucket rollover across chunk
//! directories, tolerance of an orphaned chunk file left by a crash before
//! commit, and competing consumers across two independent write sessions.

use std::sync::Arc;
use tick_archive::infrastructure::adapters::chunk_meta_store_fs::ChunkMetaStoreFs;
use tick_archive::infrastructure::adapters::chunk_store_sqlite::{chunk_to_wire_bytes, ChunkStoreSqlite};
use tick_archive::infrastructure::repositories::schema;
use tick_archive_domain::repositories::{ChunkMetaStore, EnvironmentChunkStore};
use tick_archive_domain::services::{delta_codec, CodecRegistry};
use tick_archive_domain::value_objects::{CellGrid, RunNamespace, TickData};
use tick_archive_domain::ArchiveError;

async fn pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    schema::ensure_schema(&pool).await.unwrap();
    pool
}

fn synthetic_chunk(first_tick: u64, tick_count: u64) -> tick_archive_domain::value_objects::TickDataChunk {
    let ticks: Vec<TickData> = (0..tick_count)
        .map(|i| TickData {
            tick_number: first_tick + i,
            capture_time_ms: (first_tick + i) as i64,
            cell_grid: CellGrid::from_sorted(vec![i % 5], vec![i as i32]),
            organisms: Vec::new(),
            total_organisms_created: i,
            total_unique_genomes: i,
        })
        .collect();
    delta_codec::encode_chunk(&ticks).unwrap()
}

/// Scenario 1: an empty archive reports no tick range and fails lookups
/// with `TickNotFound`, never an empty result.
#[tokio::test]
async fn empty_archive_reports_not_found() {
    let pool = pool().await;
    let dir = tempfile::tempdir().unwrap();
    let meta_store: Arc<dyn ChunkMetaStore> = Arc::new(ChunkMetaStoreFs::new(dir.path()));
    let store = ChunkStoreSqlite::new(
        pool,
        dir.path(),
        RunNamespace::new("empty-run").unwrap(),
        Arc::new(CodecRegistry::standard(3, 6)),
        "zstd",
        meta_store,
        10_000,
    );

    let err = store.read_chunk_containing(0).await.unwrap_err();
    assert!(matches!(err, ArchiveError::TickNotFound { tick: 0 }));
}

/// Scenario 3: with `max_files_per_directory = 2` and a 50-tick chunk step,
/// six committed chunks land in exactly three buckets of two files each.
#[tokio::test]
async fn bucket_rollover_distributes_chunks_across_buckets() {
    let pool = pool().await;
    let dir = tempfile::tempdir().unwrap();
    let meta_store: Arc<dyn ChunkMetaStore> = Arc::new(ChunkMetaStoreFs::new(dir.path()));
    let run_namespace = RunNamespace::new("bucket-run").unwrap();
    let store = ChunkStoreSqlite::new(
        pool,
        dir.path(),
        run_namespace.clone(),
        Arc::new(CodecRegistry::standard(3, 6)),
        "zstd",
        meta_store,
        2,
    );

    for i in 0..6u64 {
        let chunk = synthetic_chunk(i * 50, 50);
        let bytes = chunk_to_wire_bytes(&chunk);
        store.write_raw_chunk(chunk.first_tick, chunk.last_tick, chunk.tick_count, bytes).await.unwrap();
        store.commit_raw_chunks().await.unwrap();
    }

    let run_dir = dir.path().join(run_namespace.as_str());
    let mut bucket_counts = std::collections::BTreeMap::new();
    let mut entries = tokio::fs::read_dir(&run_dir).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        if entry.file_type().await.unwrap().is_dir() {
            let mut files = 0;
            let mut inner = tokio::fs::read_dir(entry.path()).await.unwrap();
            while (inner.next_entry().await.unwrap()).is_some() {
                files += 1;
            }
            bucket_counts.insert(entry.file_name().to_string_lossy().to_string(), files);
        }
    }

    assert_eq!(bucket_counts.len(), 3, "expected three bucket directories, got {bucket_counts:?}");
    for (_bucket, count) in &bucket_counts {
        assert_eq!(*count, 2, "each bucket should hold exactly two chunk files");
    }
    assert!(bucket_counts.contains_key("0000"));
    assert!(bucket_counts.contains_key("0001"));
    assert!(bucket_counts.contains_key("0002"));
}

/// Scenario 4: a chunk file written but never committed is an orphan — it
/// sits on disk with no index row — and a later clean write/commit of the
/// same range succeeds without duplicate files or an inconsistent index.
#[tokio::test]
async fn orphan_file_is_tolerated_and_later_write_succeeds() {
    let pool = pool().await;
    let dir = tempfile::tempdir().unwrap();
    let meta_store: Arc<dyn ChunkMetaStore> = Arc::new(ChunkMetaStoreFs::new(dir.path()));
    let run_namespace = RunNamespace::new("orphan-run").unwrap();
    let store = ChunkStoreSqlite::new(
        pool,
        dir.path(),
        run_namespace.clone(),
        Arc::new(CodecRegistry::standard(3, 6)),
        "zstd",
        meta_store,
        10_000,
    );

    let chunk = synthetic_chunk(500, 10);
    let bytes = chunk_to_wire_bytes(&chunk);
    // Write the file but simulate a crash before commit: reset instead of
    // committing, mirroring "outer caller rolls back and resets" after a
    // failure between write_raw_chunk and commit_raw_chunks.
    store.write_raw_chunk(chunk.first_tick, chunk.last_tick, chunk.tick_count, bytes.clone()).await.unwrap();
    store.reset_streaming_state().await.unwrap();

    // The orphan file is on disk, but no index row exists for it yet.
    assert!(matches!(
        store.read_chunk_containing(500).await,
        Err(ArchiveError::TickNotFound { tick: 500 })
    ));

    // A later clean write/commit of the same range succeeds despite the
    // orphan, via temp-then-rename replacing the stale file.
    store.write_raw_chunk(chunk.first_tick, chunk.last_tick, chunk.tick_count, bytes).await.unwrap();
    store.commit_raw_chunks().await.unwrap();

    let read_back = store.read_chunk_containing(505).await.unwrap();
    assert_eq!(read_back.first_tick, 500);
    assert_eq!(read_back.last_tick, 509);
}

/// Scenario 6: two writer "threads" (tokio tasks) on two distinct
/// connections alternately submit chunks for disjoint tick ranges; after
/// both commit, the union of persisted chunks equals the union submitted,
/// and each session's cached state is independent of the other's.
#[tokio::test]
async fn competing_consumers_on_distinct_connections_do_not_interfere() {
    let pool = pool().await;
    let dir = tempfile::tempdir().unwrap();
    let run_namespace = RunNamespace::new("competing-run").unwrap();

    let meta_store_a: Arc<dyn ChunkMetaStore> = Arc::new(ChunkMetaStoreFs::new(dir.path()));
    let store_a = ChunkStoreSqlite::new(
        pool.clone(),
        dir.path(),
        run_namespace.clone(),
        Arc::new(CodecRegistry::standard(3, 6)),
        "zstd",
        meta_store_a,
        10_000,
    );
    let meta_store_b: Arc<dyn ChunkMetaStore> = Arc::new(ChunkMetaStoreFs::new(dir.path()));
    let store_b = ChunkStoreSqlite::new(
        pool.clone(),
        dir.path(),
        run_namespace,
        Arc::new(CodecRegistry::standard(3, 6)),
        "zstd",
        meta_store_b,
        10_000,
    );

    // Disjoint ranges: A writes [0, 9], [20, 29]; B writes [10, 19], [30, 39].
    let chunk_a1 = synthetic_chunk(0, 10);
    let chunk_b1 = synthetic_chunk(10, 10);
    let chunk_a2 = synthetic_chunk(20, 10);
    let chunk_b2 = synthetic_chunk(30, 10);

    for chunk in [&chunk_a1, &chunk_a2] {
        let bytes = chunk_to_wire_bytes(chunk);
        store_a.write_raw_chunk(chunk.first_tick, chunk.last_tick, chunk.tick_count, bytes).await.unwrap();
    }
    for chunk in [&chunk_b1, &chunk_b2] {
        let bytes = chunk_to_wire_bytes(chunk);
        store_b.write_raw_chunk(chunk.first_tick, chunk.last_tick, chunk.tick_count, bytes).await.unwrap();
    }
    store_a.commit_raw_chunks().await.unwrap();
    store_b.commit_raw_chunks().await.unwrap();

    for tick in [0u64, 9, 10, 19, 20, 29, 30, 39] {
        let read_back = store_a.read_chunk_containing(tick).await.unwrap();
        assert!(read_back.covers(tick));
    }
    assert!(matches!(
        store_a.read_chunk_containing(40).await,
        Err(ArchiveError::TickNotFound { tick: 40 })
    ));
}
