//! Disk-backed cache for remote API responses and analysis results
//!
//! Provides a `CacheStore` that memoizes serializable payloads as JSON files
//! keyed by a fingerprint of the logical request, with optional read-time
//! expiry so collector entries refresh while analysis entries live forever.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Deterministic identifier for a logical request, used as the storage key.
///
/// Derived from a SHA-256 hash of `"{source}:{key}"`, so identical inputs map
/// to the identical fingerprint across runs and processes. Collisions are not
/// detected; the hash strength makes them negligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint for a logical request.
    ///
    /// # Arguments
    /// * `source` - Tag for the originating collaborator (e.g. "semantic_scholar")
    /// * `key` - The request's identifying fields, joined by the caller
    pub fn of(source: &str, key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(b":");
        hasher.update(key.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Returns the hex digest backing this fingerprint
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wrapper struct for cached payloads stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry<T> {
    /// When the payload was written
    stored_at: DateTime<Utc>,
    /// The cached payload
    payload: T,
}

/// Manages reading and writing cached payloads to disk
///
/// One JSON file per fingerprint under a configurable root directory, created
/// on first write. The store is an explicit handle: every workflow that wants
/// caching receives its own `CacheStore` rather than sharing global state.
///
/// Expiry is a read-time judgment. `get` with `Some(max_age)` treats entries
/// older than `max_age` as absent; `get` with `None` never expires an entry,
/// which is the behavior the analysis workflow relies on.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    root: PathBuf,
}

impl CacheStore {
    /// Creates a new CacheStore rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a new CacheStore in the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/paperscope/` on Linux, or the equivalent path on other
    /// platforms. Returns `None` if no home directory can be determined.
    pub fn open_default() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "paperscope")?;
        Some(Self::new(project_dirs.cache_dir()))
    }

    /// Returns a store rooted at a subdirectory of this store's root
    ///
    /// Used to keep analysis entries separate from collector entries.
    pub fn subdir(&self, name: &str) -> Self {
        Self::new(self.root.join(name))
    }

    /// Returns the path to the cache file for the given fingerprint
    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("{}.json", fingerprint))
    }

    /// Ensures the cache root exists
    fn ensure_root(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Reads a payload from the cache.
    ///
    /// Returns `None` when the entry is missing, older than `max_age` (if one
    /// is given), or cannot be parsed. A malformed entry is logged and treated
    /// as a miss rather than an error, so a truncated write never aborts the
    /// calling workflow.
    pub fn get<T: DeserializeOwned>(
        &self,
        fingerprint: &Fingerprint,
        max_age: Option<Duration>,
    ) -> Option<T> {
        let path = self.entry_path(fingerprint);
        let content = fs::read_to_string(&path).ok()?;

        let entry: StoredEntry<T> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(fingerprint = %fingerprint, error = %err, "invalid cache entry, treating as miss");
                return None;
            }
        };

        if let Some(max_age) = max_age {
            let age = Utc::now().signed_duration_since(entry.stored_at);
            if age > max_age {
                info!(fingerprint = %fingerprint, "cache entry expired");
                return None;
            }
        }

        debug!(fingerprint = %fingerprint, "cache hit");
        Some(entry.payload)
    }

    /// Writes a payload to the cache, replacing any prior entry.
    ///
    /// No guarantee is made about partial writes: a crash mid-write may leave
    /// a truncated file, which `get` treats as a miss. Callers that must not
    /// fail on an unwritable cache should log the error and continue.
    pub fn put<T: Serialize>(
        &self,
        fingerprint: &Fingerprint,
        payload: &T,
    ) -> std::io::Result<()> {
        self.ensure_root()?;

        let entry = StoredEntry {
            stored_at: Utc::now(),
            payload,
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(self.entry_path(fingerprint), json)?;
        debug!(fingerprint = %fingerprint, "cache entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestPayload {
        name: String,
        value: i32,
    }

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::new(temp_dir.path());
        (store, temp_dir)
    }

    fn sample_payload() -> TestPayload {
        TestPayload {
            name: "sample".to_string(),
            value: 42,
        }
    }

    /// Writes an entry with an explicit stored_at, for expiry tests
    fn put_backdated(store: &CacheStore, fingerprint: &Fingerprint, age: Duration) {
        let entry = StoredEntry {
            stored_at: Utc::now() - age,
            payload: sample_payload(),
        };
        fs::create_dir_all(&store.root).expect("Failed to create cache dir");
        fs::write(
            store.entry_path(fingerprint),
            serde_json::to_string_pretty(&entry).expect("Failed to serialize entry"),
        )
        .expect("Failed to write entry");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::of("semantic_scholar", "microservice architecture:50:title");
        let b = Fingerprint::of("semantic_scholar", "microservice architecture:50:title");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_distinguishes_inputs() {
        let a = Fingerprint::of("semantic_scholar", "microservice architecture:50:title");
        let b = Fingerprint::of("semantic_scholar", "microservice architecture:51:title");
        let c = Fingerprint::of("arxiv", "microservice architecture:50:title");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let fp = Fingerprint::of("details", "649def34f8be52c8b66281af98ae884c09aef38b");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_get_returns_none_for_missing_entry() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("semantic_scholar", "nothing here");

        let result: Option<TestPayload> = store.get(&fp, None);

        assert!(result.is_none(), "Should return None for missing entry");
    }

    #[test]
    fn test_round_trip_without_expiry() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("analysis", "paper-1:comprehensive");
        let payload = sample_payload();

        store.put(&fp, &payload).expect("Write should succeed");
        let result: TestPayload = store.get(&fp, None).expect("Should read back entry");

        assert_eq!(result, payload, "Payload should survive the round trip");
    }

    #[test]
    fn test_fresh_entry_is_returned_within_max_age() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("semantic_scholar", "fresh");
        put_backdated(&store, &fp, Duration::hours(23));

        let result: Option<TestPayload> = store.get(&fp, Some(Duration::hours(24)));

        assert!(result.is_some(), "Entry younger than max_age should hit");
    }

    #[test]
    fn test_stale_entry_is_a_miss() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("semantic_scholar", "stale");
        put_backdated(&store, &fp, Duration::hours(25));

        let result: Option<TestPayload> = store.get(&fp, Some(Duration::hours(24)));

        assert!(result.is_none(), "Entry older than max_age should miss");
    }

    #[test]
    fn test_stale_entry_persists_until_overwritten() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("semantic_scholar", "stale but present");
        put_backdated(&store, &fp, Duration::hours(48));

        let miss: Option<TestPayload> = store.get(&fp, Some(Duration::hours(24)));
        assert!(miss.is_none());
        assert!(
            store.entry_path(&fp).exists(),
            "Expiry is a read-time judgment; the file stays on disk"
        );

        store.put(&fp, &sample_payload()).expect("Write should succeed");
        let hit: Option<TestPayload> = store.get(&fp, Some(Duration::hours(24)));
        assert!(hit.is_some(), "Overwrite should make the entry fresh again");
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_not_a_panic() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("semantic_scholar", "corrupt");

        fs::create_dir_all(&store.root).expect("Failed to create cache dir");
        fs::write(store.entry_path(&fp), "{ not valid json").expect("Failed to write");

        let result: Option<TestPayload> = store.get(&fp, None);
        assert!(result.is_none(), "Corrupt entry should degrade to a miss");
    }

    #[test]
    fn test_wrong_shape_entry_is_a_miss() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("semantic_scholar", "wrong shape");

        // Valid JSON, but not the stored-entry wrapper
        fs::create_dir_all(&store.root).expect("Failed to create cache dir");
        fs::write(store.entry_path(&fp), r#"{"unexpected": true}"#).expect("Failed to write");

        let result: Option<TestPayload> = store.get(&fp, None);
        assert!(result.is_none());
    }

    #[test]
    fn test_put_replaces_prior_entry() {
        let (store, _temp_dir) = create_test_store();
        let fp = Fingerprint::of("semantic_scholar", "overwrite");
        let first = TestPayload {
            name: "first".to_string(),
            value: 1,
        };
        let second = TestPayload {
            name: "second".to_string(),
            value: 2,
        };

        store.put(&fp, &first).expect("First write should succeed");
        store.put(&fp, &second).expect("Second write should succeed");

        let result: TestPayload = store.get(&fp, None).expect("Should read entry");
        assert_eq!(result, second, "Cache should contain the latest payload");
    }

    #[test]
    fn test_put_creates_root_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("cache");
        let store = CacheStore::new(nested.clone());

        store
            .put(&Fingerprint::of("arxiv", "q:10"), &sample_payload())
            .expect("Write should succeed");

        assert!(nested.exists(), "Root directory should be created on write");
    }

    #[test]
    fn test_put_surfaces_write_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("Failed to write blocker file");

        // Root path has a regular file as a component, so the write must fail
        let store = CacheStore::new(blocker.join("cache"));
        let result = store.put(&Fingerprint::of("semantic_scholar", "q"), &sample_payload());

        assert!(result.is_err(), "Unwritable root should surface an error");
    }

    #[test]
    fn test_subdir_isolates_entries() {
        let (store, _temp_dir) = create_test_store();
        let llm = store.subdir("llm");
        let fp = Fingerprint::of("analysis", "paper-1:comprehensive");

        llm.put(&fp, &sample_payload()).expect("Write should succeed");

        let from_llm: Option<TestPayload> = llm.get(&fp, None);
        let from_root: Option<TestPayload> = store.get(&fp, None);
        assert!(from_llm.is_some());
        assert!(from_root.is_none(), "Parent store should not see subdir entries");
    }

    #[test]
    fn test_open_default_uses_project_path() {
        if let Some(store) = CacheStore::open_default() {
            let path_str = store.root.to_string_lossy();
            assert!(
                path_str.contains("paperscope"),
                "Cache path should contain project name"
            );
        }
        // Passes if open_default() returns None (e.g. no home directory in CI)
    }
}
