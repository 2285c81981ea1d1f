// /////////////////////////////////////////////////////////////////////////////
// Tick Archive
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Archive Configuration
//!
//! Layered configuration for the tick archive storage engine: built-in
//! defaults, overlaid with an optional TOML file, overlaid with `TICK_ARCHIVE_*`
//! environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tick_archive_domain::value_objects::OrganismStrategy;

/// The complete, validated configuration surface: chosen codec, chosen
/// organism strategy, `chunk_directory`, `max_files_per_directory`,
/// shutdown grace timeout, metrics window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// The codec name (`"identity"`, `"zstd"`, or `"gzip"`) used when writing
    /// new chunk blobs. Reads always auto-detect regardless of this value.
    pub codec: String,
    /// Compression level passed to the zstd encoder.
    pub zstd_level: i32,
    /// Compression level passed to the gzip encoder.
    pub gzip_level: u32,
    /// Which organism-archive physical layout this process writes.
    pub organism_strategy: OrganismStrategy,
    /// Root directory under which `<run_namespace>/<bucket>/chunk_*` files
    /// are written.
    pub chunk_directory: String,
    /// Cap on chunk files per bucket subdirectory (C8).
    pub max_files_per_directory: u64,
    /// Seconds a `PROCESSING` session is given to reach `WAITING` before the
    /// shutdown coordinator forces an interrupt.
    pub shutdown_grace_period_secs: u64,
    /// Width, in seconds, of the sliding window the ingest writer's
    /// throughput and latency percentile estimators maintain (C9/A4).
    pub metrics_window_secs: u64,
    /// SQLite connection URL.
    pub database_url: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            codec: "zstd".to_string(),
            zstd_level: 3,
            gzip_level: 6,
            organism_strategy: OrganismStrategy::RowPerOrganism,
            chunk_directory: "./data/chunks".to_string(),
            max_files_per_directory: tick_archive_domain::value_objects::DEFAULT_MAX_FILES_PER_DIRECTORY,
            shutdown_grace_period_secs: 5,
            metrics_window_secs: 5,
            database_url: "sqlite://./data/archive.db".to_string(),
        }
    }
}

impl ArchiveConfig {
    /// Builds configuration from, in ascending precedence: compiled-in
    /// defaults, an optional TOML file at `config_path` (silently skipped if
    /// absent), and `TICK_ARCHIVE_*` environment variables
    /// (`TICK_ARCHIVE_CHUNK_DIRECTORY`, `TICK_ARCHIVE_MAX_FILES_PER_DIRECTORY`,
    /// etc).
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = ArchiveConfig::default();
        let mut builder = Config::builder()
            .set_default("codec", defaults.codec)?
            .set_default("zstd_level", defaults.zstd_level as i64)?
            .set_default("gzip_level", defaults.gzip_level as i64)?
            .set_default("organism_strategy", "RowPerOrganism")?
            .set_default("chunk_directory", defaults.chunk_directory)?
            .set_default("max_files_per_directory", defaults.max_files_per_directory as i64)?
            .set_default("shutdown_grace_period_secs", defaults.shutdown_grace_period_secs as i64)?
            .set_default("metrics_window_secs", defaults.metrics_window_secs as i64)?
            .set_default("database_url", defaults.database_url)?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("TICK_ARCHIVE").separator("_"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = ArchiveConfig::default();
        assert_eq!(cfg.organism_strategy, OrganismStrategy::RowPerOrganism);
        assert!(cfg.max_files_per_directory > 0);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let cfg = ArchiveConfig::load(Some("/nonexistent/path/does-not-exist.toml")).unwrap();
        assert_eq!(cfg.codec, "zstd");
        assert_eq!(cfg.chunk_directory, "./data/chunks");
    }

    #[test]
    fn env_override_wins_over_default() {
        std::env::set_var("TICK_ARCHIVE_CHUNK_DIRECTORY", "/tmp/override-chunks");
        let cfg = ArchiveConfig::load(None).unwrap();
        assert_eq!(cfg.chunk_directory, "/tmp/override-chunks");
        std::env::remove_var("TICK_ARCHIVE_CHUNK_DIRECTORY");
    }
}
