//! Dependency-aware persistent proof cache.
//!
//! A successful proof depends on the specific axioms the prover used,
//! not on the entire context: if only unrelated axioms changed since a
//! success was cached, the cached verdict is still valid. Failures, by
//! contrast, are only replayed when the whole context matches exactly.
//!
//! Storage is a single SQLite file with one table:
//!
//! ```sql
//! proofs(id INTEGER PRIMARY KEY AUTOINCREMENT,
//!        goal_hash TEXT, dependencies TEXT, result BOOLEAN, context_hash TEXT)
//! ```
//!
//! `goal_hash` is the SHA-256 digest of the goal's canonical string;
//! `dependencies` is a JSON list of axiom digests (the full available
//! set when the prover reported none — the conservative fallback);
//! `context_hash` digests the sorted axiom digests plus the goal.
//!
//! The connection sits behind a mutex, which gives workers single-writer
//! discipline; SQLite's own locking covers cross-process access.

use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use naproche_logic::Formula;

/// Default cache location, created on first use and kept across runs.
pub const CACHE_FILE: &str = ".naproche_cache.db";

/// Cache storage error.
#[derive(Debug)]
pub enum CacheError {
    Sqlite(rusqlite::Error),
    Serialization(serde_json::Error),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Sqlite(e) => write!(f, "cache storage error: {}", e),
            CacheError::Serialization(e) => write!(f, "cache serialization error: {}", e),
        }
    }
}

impl Error for CacheError {}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Sqlite(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e)
    }
}

/// SHA-256 digest of a formula's canonical string, hex-encoded.
pub fn formula_digest(formula: &Formula) -> String {
    let mut hasher = Sha256::new();
    hasher.update(formula.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of a whole obligation context: the sorted axiom digests joined
/// and suffixed with the goal hash. Sorting makes the digest independent
/// of axiom order.
pub fn context_digest(axiom_digests: &[String], goal_hash: &str) -> String {
    let mut sorted: Vec<&str> = axiom_digests.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    for d in sorted {
        hasher.update(d.as_bytes());
    }
    hasher.update(b"|GOAL:");
    hasher.update(goal_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// The persistent proof store.
pub struct ProofCache {
    conn: Mutex<Connection>,
}

impl ProofCache {
    /// Open (creating if necessary) the cache at `path`.
    pub fn open(path: &Path) -> Result<ProofCache, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS proofs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                goal_hash TEXT,
                dependencies TEXT,
                result BOOLEAN,
                context_hash TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_goal_hash ON proofs (goal_hash);",
        )?;
        Ok(ProofCache {
            conn: Mutex::new(conn),
        })
    }

    /// Open the default cache file in the current directory.
    pub fn open_default() -> Result<ProofCache, CacheError> {
        ProofCache::open(Path::new(CACHE_FILE))
    }

    /// Look up a goal against the currently available axioms.
    ///
    /// - `Some(true)`: a stored success has all its dependencies present;
    /// - `Some(false)`: a stored failure matches the context exactly;
    /// - `None`: unknown, the prover must run.
    pub fn lookup(
        &self,
        goal_hash: &str,
        available: &HashSet<String>,
        context_hash: &str,
    ) -> Result<Option<bool>, CacheError> {
        // A panicked worker must not wedge caching for its peers.
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT dependencies, result, context_hash FROM proofs WHERE goal_hash = ?1",
        )?;
        let rows = stmt.query_map([goal_hash], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (deps_json, result, stored_context) = row?;
            if result {
                let Ok(deps) = serde_json::from_str::<Vec<String>>(&deps_json) else {
                    continue;
                };
                if deps.iter().all(|d| available.contains(d)) {
                    return Ok(Some(true));
                }
            } else if stored_context == context_hash {
                return Ok(Some(false));
            }
        }
        Ok(None)
    }

    /// Insert a terminal result, deduplicated on the full tuple.
    pub fn store(
        &self,
        goal_hash: &str,
        dependencies: &[String],
        result: bool,
        context_hash: &str,
    ) -> Result<(), CacheError> {
        let deps_json = serde_json::to_string(dependencies)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM proofs
                 WHERE goal_hash = ?1 AND dependencies = ?2 AND result = ?3 AND context_hash = ?4",
                rusqlite::params![goal_hash, deps_json, result, context_hash],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        if existing.is_some() {
            return Ok(());
        }
        conn.execute(
            "INSERT INTO proofs (goal_hash, dependencies, result, context_hash)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![goal_hash, deps_json, result, context_hash],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use naproche_logic::Term;

    fn scratch_cache() -> (tempfile::TempDir, ProofCache) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ProofCache::open(&dir.path().join("cache.db")).expect("open cache");
        (dir, cache)
    }

    fn digest_of(name: &str) -> String {
        formula_digest(&Formula::pred(name, vec![Term::constant("m")]))
    }

    #[test]
    fn digests_are_deterministic_and_content_sensitive() {
        let a = Formula::equal(Term::constant("1"), Term::constant("1"));
        let b = Formula::equal(Term::constant("1"), Term::constant("2"));
        assert_eq!(formula_digest(&a), formula_digest(&a));
        assert_ne!(formula_digest(&a), formula_digest(&b));
    }

    #[test]
    fn context_digest_ignores_axiom_order() {
        let d1 = digest_of("set");
        let d2 = digest_of("class");
        let goal = digest_of("goal");
        assert_eq!(
            context_digest(&[d1.clone(), d2.clone()], &goal),
            context_digest(&[d2, d1], &goal)
        );
    }

    #[test]
    fn success_hits_on_dependency_superset_only() {
        let (_dir, cache) = scratch_cache();
        let goal = digest_of("goal");
        let dep = digest_of("a1");
        let ctx = context_digest(&[dep.clone()], &goal);
        cache
            .store(&goal, std::slice::from_ref(&dep), true, &ctx)
            .expect("store");

        let mut available: HashSet<String> = [dep.clone(), digest_of("a9")].into();
        assert_eq!(
            cache.lookup(&goal, &available, "other").expect("lookup"),
            Some(true),
            "superset of dependencies must hit"
        );

        available.remove(&dep);
        assert_eq!(
            cache.lookup(&goal, &available, "other").expect("lookup"),
            None,
            "missing dependency must miss"
        );
    }

    #[test]
    fn empty_dependency_success_always_hits() {
        let (_dir, cache) = scratch_cache();
        let goal = digest_of("trivial");
        cache.store(&goal, &[], true, "ctx").expect("store");
        assert_eq!(
            cache
                .lookup(&goal, &HashSet::new(), "whatever")
                .expect("lookup"),
            Some(true)
        );
    }

    #[test]
    fn failures_replay_only_on_exact_context() {
        let (_dir, cache) = scratch_cache();
        let goal = digest_of("goal");
        cache.store(&goal, &[], false, "ctx-a").expect("store");
        let available = HashSet::new();
        assert_eq!(
            cache.lookup(&goal, &available, "ctx-a").expect("lookup"),
            Some(false)
        );
        assert_eq!(
            cache.lookup(&goal, &available, "ctx-b").expect("lookup"),
            None
        );
    }

    #[test]
    fn store_deduplicates_identical_records() {
        let (_dir, cache) = scratch_cache();
        let goal = digest_of("goal");
        cache.store(&goal, &[], true, "ctx").expect("store");
        cache.store(&goal, &[], true, "ctx").expect("store again");
        let conn = cache.conn.lock().expect("lock");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM proofs", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn cache_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.db");
        let goal = digest_of("goal");
        {
            let cache = ProofCache::open(&path).expect("open");
            cache.store(&goal, &[], true, "ctx").expect("store");
        }
        let cache = ProofCache::open(&path).expect("reopen");
        assert_eq!(
            cache
                .lookup(&goal, &HashSet::new(), "ctx")
                .expect("lookup"),
            Some(true)
        );
    }
}
