//! Content-addressed persistent cache for extraction results.
//!
//! A single SQLite file maps the SHA-256 digest of an input document to the
//! condensed guide produced for it, so byte-identical inputs are never
//! reprocessed — across requests and across process restarts. The cache is
//! a performance layer, not a correctness dependency: a corrupt or
//! unreadable backing store is discarded and treated as empty, never
//! surfaced as a request failure.
//!
//! Each `put` is committed before it returns, and SQLite's transactional
//! journal makes every write atomic, so concurrent writers (including other
//! processes sharing the file) cannot interleave partial entries. Two
//! writers racing on the same digest is benign: extraction is deterministic,
//! so last-writer-wins overwrites an equal value.

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::Config;

/// Stable digest of raw input bytes, used as the cache key.
///
/// Deterministic and collision-resistant: byte-identical inputs always map
/// to the same key, distinct inputs to distinct keys.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// One cached extraction result. Never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub digest: String,
    pub guide: String,
    pub recorded_at: i64,
    pub source_label: String,
}

/// Entry count and approximate serialized size, for operational visibility.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: i64,
    pub approx_bytes: i64,
}

/// Disk-backed digest → guide store.
pub struct ExtractCache {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl ExtractCache {
    /// Open (or create) the cache at `path`.
    ///
    /// A store that cannot be opened or migrated is deleted and recreated;
    /// if even that fails the cache runs in-memory for this process. Losing
    /// the file only costs recomputation, never correctness, so none of
    /// this is allowed to fail a request path.
    pub async fn open(path: &Path) -> Result<Self> {
        match Self::try_open(path).await {
            Ok(pool) => Ok(Self {
                pool,
                path: Some(path.to_path_buf()),
            }),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %path.display(),
                    "extraction cache unusable, discarding backing store"
                );
                remove_store_files(path);
                match Self::try_open(path).await {
                    Ok(pool) => Ok(Self {
                        pool,
                        path: Some(path.to_path_buf()),
                    }),
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "extraction cache unrecoverable on disk, running in-memory"
                        );
                        let pool = SqlitePoolOptions::new()
                            .max_connections(1)
                            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                            .await?;
                        migrate(&pool).await?;
                        Ok(Self { pool, path: None })
                    }
                }
            }
        }
    }

    async fn try_open(path: &Path) -> Result<SqlitePool> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        migrate(&pool).await?;
        Ok(pool)
    }

    /// Look up an entry by digest. Local disk read only; a failed read is
    /// logged and reported as a miss.
    pub async fn get(&self, digest: &str) -> Option<CacheEntry> {
        let row = sqlx::query(
            "SELECT digest, guide, recorded_at, source_label FROM extract_cache WHERE digest = ?",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some(row)) => Some(CacheEntry {
                digest: row.get("digest"),
                guide: row.get("guide"),
                recorded_at: row.get("recorded_at"),
                source_label: row.get("source_label"),
            }),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Insert or overwrite an entry. Idempotent, last-writer-wins; the
    /// write is committed before this returns.
    pub async fn put(&self, entry: &CacheEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO extract_cache (digest, guide, recorded_at, source_label)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(digest) DO UPDATE SET
                guide = excluded.guide,
                recorded_at = excluded.recorded_at,
                source_label = excluded.source_label
            "#,
        )
        .bind(&entry.digest)
        .bind(&entry.guide)
        .bind(entry.recorded_at)
        .bind(&entry.source_label)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM extract_cache")
            .fetch_one(&self.pool)
            .await?;

        let approx_bytes: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(LENGTH(digest) + LENGTH(guide) + LENGTH(source_label)), 0) \
             FROM extract_cache",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CacheStats {
            entries,
            approx_bytes,
        })
    }

    /// Remove all entries and the backing store. Maintenance only — request
    /// handling never calls this.
    pub async fn clear(self) -> Result<()> {
        sqlx::query("DELETE FROM extract_cache")
            .execute(&self.pool)
            .await?;
        self.pool.close().await;
        if let Some(path) = &self.path {
            remove_store_files(path);
        }
        Ok(())
    }
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS extract_cache (
            digest TEXT PRIMARY KEY,
            guide TEXT NOT NULL,
            recorded_at INTEGER NOT NULL,
            source_label TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete the SQLite file and its WAL/SHM siblings, ignoring missing files.
fn remove_store_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut candidate = path.as_os_str().to_os_string();
        candidate.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(candidate));
    }
}

/// CLI entry point for `pch cache stats`.
pub async fn run_cache_stats(config: &Config) -> Result<()> {
    let cache = ExtractCache::open(&config.cache.path).await?;
    let stats = cache.stats().await?;

    println!("Paper Harness — Extraction Cache");
    println!("================================");
    println!();
    println!("  Store:   {}", config.cache.path.display());
    println!("  Entries: {}", stats.entries);
    println!("  Size:    {}", format_bytes(stats.approx_bytes as u64));
    println!();

    Ok(())
}

/// CLI entry point for `pch cache clear`.
pub async fn run_cache_clear(config: &Config) -> Result<()> {
    let cache = ExtractCache::open(&config.cache.path).await?;
    let stats = cache.stats().await?;
    cache.clear().await?;
    println!("Cleared {} cached entries.", stats.entries);
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
