//! Persistence layer for query caching and session logging.
//!
//! Uses SQLite to store:
//! - Request/Response Cache (hashed by input)
//! - Session History (audit logs)

use rusqlite::{params, Connection, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Local database manager
#[derive(Debug, Clone)]
pub struct LocalDb {
    conn: Arc<Mutex<Connection>>,
}

impl LocalDb {
    /// Initialize the local database
    pub fn init() -> anyhow::Result<Self> {
        let db_path = get_db_path()?;

        info!("Initializing local database at {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        conn.execute("PRAGMA journal_mode=WAL;", [])?;
        create_tables(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// An in-memory database with the same schema, for tests and for
    /// other crates' unit tests that need a `LocalDb` without touching
    /// disk.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Cache key for a snippet fetch, unique per `(repo, commit, file_path, start_line, end_line)`.
    pub fn snippet_cache_key(repo: &str, commit_sha: &str, file_path: &str, start_line: usize, end_line: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(repo.as_bytes());
        hasher.update(b"|");
        hasher.update(commit_sha.as_bytes());
        hasher.update(b"|");
        hasher.update(file_path.as_bytes());
        hasher.update(b"|");
        hasher.update(start_line.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(end_line.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Fetch a cached snippet, evicting it first if it is older than
    /// `ttl_seconds`. Returns `None` on both "absent" and "expired".
    pub fn get_cached_snippet(&self, cache_key: &str, ttl_seconds: i64) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| rusqlite::Error::InvalidParameterName("Mutex poisoned".to_string()))?;

        conn.execute(
            "DELETE FROM snippet_cache WHERE cache_key = ?1 AND \
             (strftime('%s','now') - strftime('%s', created_at)) >= ?2",
            params![cache_key, ttl_seconds],
        )?;

        let mut stmt = conn.prepare("SELECT snippet_json FROM snippet_cache WHERE cache_key = ?1")?;
        let mut rows = stmt.query(params![cache_key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// Insert or replace a cached snippet.
    #[allow(clippy::too_many_arguments)]
    pub fn cache_snippet(
        &self,
        cache_key: &str,
        repo: &str,
        commit_sha: &str,
        file_path: &str,
        start_line: usize,
        end_line: usize,
        snippet_json: &str,
    ) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| rusqlite::Error::InvalidParameterName("Mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO snippet_cache
                (cache_key, repo, commit_sha, file_path, start_line, end_line, snippet_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, CURRENT_TIMESTAMP)",
            params![cache_key, repo, commit_sha, file_path, start_line as i64, end_line as i64, snippet_json],
        )?;
        debug!("Cached snippet for key {}", cache_key);
        Ok(())
    }

    /// Calculate hash for a request
    pub fn calculate_hash(model: &str, messages_json: &str, params_json: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(b"|");
        hasher.update(messages_json.as_bytes());
        hasher.update(b"|");
        hasher.update(params_json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Get cached response
    pub fn get_cached_response(&self, hash: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| rusqlite::Error::InvalidParameterName("Mutex poisoned".to_string()))?;
        let mut stmt = conn.prepare("SELECT response_json FROM request_cache WHERE hash = ?1")?;

        let mut rows = stmt.query(params![hash])?;

        if let Some(row) = rows.next()? {
            // Update last accessed time asynchronously (fire and forget pattern ideally, but sync here for safety)
            let _ = conn.execute(
                "UPDATE request_cache SET last_accessed_at = CURRENT_TIMESTAMP WHERE hash = ?",
                params![hash],
            );
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// Store response in cache
    pub fn cache_response(
        &self,
        hash: &str,
        model: &str,
        prompt: &str,
        response: &str,
    ) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| rusqlite::Error::InvalidParameterName("Mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO request_cache (hash, model, prompt_json, response_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![hash, model, prompt, response],
        )?;
        debug!("Cached response for hash {}", hash);
        Ok(())
    }

    /// Log a session interaction
    pub fn log_interaction(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
        metadata: Option<&str>,
    ) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| rusqlite::Error::InvalidParameterName("Mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO session_log (session_id, role, content, metadata_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, role, content, metadata],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_db_init() {
        // Use in-memory DB for testing if init() supported it, but init() uses file.
        // We'll trust init() works or needs refactoring for testability if we wanted pure unit tests.
        // However, we can test hashing.
        let hash = LocalDb::calculate_hash("gpt-4", r#"{"role":"user"}"#, r#"{}"#);
        assert_eq!(hash.len(), 64); // SHA256 hex string
    }

    #[test]
    fn test_hash_stability() {
        let h1 = LocalDb::calculate_hash("model", "msg", "params");
        let h2 = LocalDb::calculate_hash("model", "msg", "params");
        assert_eq!(h1, h2);

        let h3 = LocalDb::calculate_hash("model2", "msg", "params");
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_hash_uniqueness() {
        // Different inputs should produce different hashes
        let h1 = LocalDb::calculate_hash("gpt-4", "message", "{}");
        let h2 = LocalDb::calculate_hash("gpt-3", "message", "{}");
        let h3 = LocalDb::calculate_hash("gpt-4", "different", "{}");
        let h4 = LocalDb::calculate_hash("gpt-4", "message", "{\"temp\":0.7}");

        assert_ne!(h1, h2, "Different models should produce different hashes");
        assert_ne!(h1, h3, "Different messages should produce different hashes");
        assert_ne!(h1, h4, "Different params should produce different hashes");
    }

    #[test]
    fn test_hash_empty_inputs() {
        // Empty inputs should still produce valid hashes
        let hash = LocalDb::calculate_hash("", "", "");
        assert_eq!(hash.len(), 64);
        // Hash of "|||" (empty model + separator + empty message + separator + empty params)
        assert_eq!(
            hash,
            "565d240f5343e625ae579a4d45a770f1f02c6368b5ed4d06da4fbe6f47c28866"
        );
    }

    #[test]
    fn test_hash_special_characters() {
        // Special characters should be handled correctly
        let hash1 = LocalDb::calculate_hash("model", "{\"key\": \"value with spaces\"}", "{}");
        let hash2 = LocalDb::calculate_hash("model", "{\"key\": \"value with spaces\"}", "{}");
        assert_eq!(
            hash1, hash2,
            "Same special characters should produce same hash"
        );
    }

    #[test]
    fn test_hash_unicode() {
        // Unicode characters should be handled correctly
        let hash = LocalDb::calculate_hash("model", "日本語テキスト", "{}");
        assert_eq!(hash.len(), 64);

        // Same unicode should produce same hash
        let hash2 = LocalDb::calculate_hash("model", "日本語テキスト", "{}");
        assert_eq!(hash, hash2);
    }

    #[test]
    fn test_hash_order_matters() {
        // Order of parameters matters
        let h1 = LocalDb::calculate_hash("a", "b", "c");
        let h2 = LocalDb::calculate_hash("c", "b", "a");
        assert_ne!(h1, h2, "Different order should produce different hashes");
    }

    #[test]
    fn test_hash_long_content() {
        // Long content should still produce valid hashes
        let long_message = "a".repeat(10000);
        let hash = LocalDb::calculate_hash("model", &long_message, "{}");
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn snippet_cache_key_is_stable_and_path_sensitive() {
        let k1 = LocalDb::snippet_cache_key("org/repo", "abc123", "a.py", 1, 10);
        let k2 = LocalDb::snippet_cache_key("org/repo", "abc123", "a.py", 1, 10);
        let k3 = LocalDb::snippet_cache_key("org/repo", "abc123", "b.py", 1, 10);
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn snippet_cache_roundtrip_and_ttl_eviction() {
        let db = LocalDb::in_memory().unwrap();
        let key = LocalDb::snippet_cache_key("org/repo", "abc123", "a.py", 1, 10);
        db.cache_snippet(&key, "org/repo", "abc123", "a.py", 1, 10, r#"{"text":"hi"}"#)
            .unwrap();

        let fresh = db.get_cached_snippet(&key, 3600).unwrap();
        assert_eq!(fresh, Some(r#"{"text":"hi"}"#.to_string()));

        let expired = db.get_cached_snippet(&key, 0).unwrap();
        assert_eq!(expired, None);
    }
}

fn create_tables(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS request_cache (
            hash TEXT PRIMARY KEY,
            model TEXT NOT NULL,
            prompt_json TEXT NOT NULL,
            response_json TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            last_accessed_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_log (
            id INTEGER PRIMARY KEY,
            session_id TEXT NOT NULL,
            timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata_json TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snippet_cache (
            cache_key TEXT PRIMARY KEY,
            repo TEXT NOT NULL,
            commit_sha TEXT NOT NULL,
            file_path TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            snippet_json TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

fn get_db_path() -> anyhow::Result<PathBuf> {
    let mut path = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    path.push("veritas");
    path.push("veritas.db");
    Ok(path)
}
