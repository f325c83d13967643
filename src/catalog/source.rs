//! Loading `ContentCatalog` tables from content files on disk, with an
//! optional compiled-cache decorator (spec §6: "content files are compiled
//! once at startup... a binary cache may be kept alongside the source").
//!
//! Grounded in the teacher's `HeightmapTerrain` cache (`terrain.rs`): a
//! derived artifact keyed by a cheap freshness check, rebuilt lazily when
//! the source is newer. Here the cache format is `serde_json` rather than
//! a bespoke binary layout, since the catalog is already JSON end to end
//! and the crate carries no other binary-serialization dependency worth
//! adding for this alone (see DESIGN.md).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

use crate::error::CatalogError;

/// Supplies the raw record list for a named table. Implementations decide
/// where those records come from; `ContentCatalogBuilder` only needs the
/// `Vec<Value>` they produce.
pub trait CatalogSource {
    fn load_table(&self, name: &str) -> Result<Vec<Value>, CatalogError>;
}

/// Reads `<content_dir>/<name>.json`, each file a JSON array of records.
pub struct JsonCatalogSource {
    content_dir: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    fn source_path(&self, name: &str) -> PathBuf {
        self.content_dir.join(format!("{name}.json"))
    }
}

impl CatalogSource for JsonCatalogSource {
    fn load_table(&self, name: &str) -> Result<Vec<Value>, CatalogError> {
        load_json_array(&self.source_path(name))
    }
}

/// Wraps a [`JsonCatalogSource`], compiling each table into a `.cache` file
/// alongside it. A cache is considered fresh when it exists and is not
/// older than its source file; otherwise it is rebuilt from source and
/// rewritten.
///
/// The cache holds the same decoded records as the source, just without
/// re-running JSON parsing on every process start — it buys nothing on
/// structure, only on parse cost for large tables.
pub struct CachedJsonCatalogSource {
    inner: JsonCatalogSource,
    cache_dir: PathBuf,
}

impl CachedJsonCatalogSource {
    pub fn new(content_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: JsonCatalogSource::new(content_dir),
            cache_dir: cache_dir.into(),
        }
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{name}.cache"))
    }

    fn is_cache_fresh(&self, source: &Path, cache: &Path) -> bool {
        let (Ok(source_meta), Ok(cache_meta)) = (fs::metadata(source), fs::metadata(cache)) else {
            return false;
        };
        let (Ok(source_mtime), Ok(cache_mtime)) =
            (source_meta.modified(), cache_meta.modified())
        else {
            return false;
        };
        cache_mtime >= source_mtime
    }
}

impl CatalogSource for CachedJsonCatalogSource {
    fn load_table(&self, name: &str) -> Result<Vec<Value>, CatalogError> {
        let source_path = self.inner.source_path(name);
        let cache_path = self.cache_path(name);

        if self.is_cache_fresh(&source_path, &cache_path) {
            if let Ok(records) = load_json_array(&cache_path) {
                return Ok(records);
            }
            // Cache unreadable despite looking fresh; fall through to source.
        }

        let records = self.inner.load_table(name)?;
        if let Err(err) = write_cache(&cache_path, &records) {
            tracing::warn!(table = name, error = %err, "failed to write catalog cache");
        }
        Ok(records)
    }
}

fn load_json_array(path: &Path) -> Result<Vec<Value>, CatalogError> {
    let bytes = fs::read(path)
        .map_err(|e| CatalogError::Io(path.display().to_string(), e.to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CatalogError::Malformed(path.display().to_string(), e.to_string()))
}

fn write_cache(path: &Path, records: &[Value]) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CatalogError::Io(parent.display().to_string(), e.to_string()))?;
    }
    let bytes = serde_json::to_vec(records)
        .map_err(|e| CatalogError::Malformed(path.display().to_string(), e.to_string()))?;
    fs::write(path, bytes).map_err(|e| CatalogError::Io(path.display().to_string(), e.to_string()))?;
    // Touch the mtime forward of "now" is unnecessary; fs::write already
    // stamps it at write time, which is what is_cache_fresh compares against.
    let _ = SystemTime::now();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_source(dir: &Path, name: &str, json: &str) {
        let mut f = fs::File::create(dir.join(format!("{name}.json"))).unwrap();
        f.write_all(json.as_bytes()).unwrap();
    }

    #[test]
    fn json_source_reads_array_of_records() {
        let dir = tempdir();
        write_source(dir.path(), "creatures", r#"[{"id": 1, "name": "Wolf"}]"#);
        let source = JsonCatalogSource::new(dir.path());
        let records = source.load_table("creatures").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn cached_source_rebuilds_when_cache_missing_then_reuses_it() {
        let content_dir = tempdir();
        let cache_dir = tempdir();
        write_source(content_dir.path(), "items", r#"[{"id": 1}, {"id": 2}]"#);
        let source = CachedJsonCatalogSource::new(content_dir.path(), cache_dir.path());

        let first = source.load_table("items").unwrap();
        assert_eq!(first.len(), 2);
        assert!(cache_dir.path().join("items.cache").exists());

        // Remove the source; a fresh cache should still serve the records.
        fs::remove_file(content_dir.path().join("items.json")).unwrap();
        let second = source.load_table("items").unwrap();
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn stale_cache_is_ignored_in_favor_of_source() {
        let content_dir = tempdir();
        let cache_dir = tempdir();
        write_source(content_dir.path(), "items", r#"[{"id": 1}]"#);
        let source = CachedJsonCatalogSource::new(content_dir.path(), cache_dir.path());
        source.load_table("items").unwrap();

        // Rewrite source with different content and force its mtime ahead.
        std::thread::sleep(std::time::Duration::from_millis(10));
        write_source(content_dir.path(), "items", r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#);

        let records = source.load_table("items").unwrap();
        assert_eq!(records.len(), 3);
    }

    /// Minimal self-cleaning temp directory, since the crate otherwise has
    /// no reason to depend on `tempfile` outside this test module.
    struct TempDir(PathBuf);
    impl TempDir {
        fn path(&self) -> &Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }
    fn tempdir() -> TempDir {
        let mut base = std::env::temp_dir();
        let unique = format!(
            "realm-core-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        );
        base.push(unique);
        fs::create_dir_all(&base).unwrap();
        TempDir(base)
    }
}
