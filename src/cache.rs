//! The key-value cache contract consumed by the pipeline (§6 Persisted
//! state). No implementation ships here: the SQLite-backed index/category
//! caches are out-of-scope external collaborators.

/// A generic get/put cache keyed by opaque string keys and storing opaque
/// JSON values. Implementations are responsible for their own eviction and
/// persistence policy (e.g. per-entry TTL for the category cache, or
/// `(source-path, source-size, source-mtime, schema-version)` keying for the
/// parsed-index cache).
pub trait KvCache {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn put(&self, key: &str, value: serde_json::Value);
}
