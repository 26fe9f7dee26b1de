//! Opt-in memoisation of [`load_survey`] keyed by file identity.
//!
//! Nothing is cached implicitly: callers that re-run the pipeline over the
//! same export hold a [`LoadCache`] and pass it in. An entry is reused only
//! while the file's canonical path, length and modification time all match
//! what was seen at load time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use survey_core::error::{Result, SurveyError};
use survey_core::models::Relation;

use crate::reader::load_survey;

// ── FileIdentity ──────────────────────────────────────────────────────────────

/// What has to stay the same for a cached relation to be reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileIdentity {
    /// Stat `path`. Fails with [`SurveyError::FileRead`] when it cannot be
    /// resolved.
    pub fn of(path: &Path) -> Result<Self> {
        let to_err = |source| SurveyError::FileRead {
            path: path.to_path_buf(),
            source,
        };
        let canonical = path.canonicalize().map_err(to_err)?;
        let meta = std::fs::metadata(&canonical).map_err(to_err)?;
        Ok(Self {
            path: canonical,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

// ── LoadCache ─────────────────────────────────────────────────────────────────

/// Loaded relations by canonical path, with hit/miss counters.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<PathBuf, (FileIdentity, Rc<Relation>)>,
    hits: u64,
    misses: u64,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached relation for `path` when the file is unchanged,
    /// otherwise load it and remember the result.
    ///
    /// Load failures are returned as is and leave no entry behind.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Rc<Relation>> {
        let identity = FileIdentity::of(path)?;

        if let Some((seen, relation)) = self.entries.get(&identity.path) {
            if *seen == identity {
                self.hits += 1;
                tracing::debug!(path = %identity.path.display(), "load cache hit");
                return Ok(Rc::clone(relation));
            }
        }

        self.misses += 1;
        tracing::debug!(path = %identity.path.display(), "load cache miss");
        self.entries.remove(&identity.path);

        let relation = Rc::new(load_survey(path)?);
        self.entries
            .insert(identity.path.clone(), (identity, Rc::clone(&relation)));
        Ok(relation)
    }

    /// Drop every entry.
    pub fn invalidate(&mut self) {
        self.entries.clear();
        tracing::debug!("load cache invalidated");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::schema::COUNTRY;
    use tempfile::TempDir;

    fn write_survey(dir: &Path, rows: &[&str]) -> PathBuf {
        let path = dir.join("survey.csv");
        let mut body = format!("\"{}\"\n", COUNTRY);
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_second_load_is_a_hit() {
        let dir = TempDir::new().unwrap();
        let path = write_survey(dir.path(), &["United States", "France"]);
        let mut cache = LoadCache::new();

        let first = cache.get_or_load(&path).unwrap();
        let second = cache.get_or_load(&path).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_changed_file_reloads() {
        let dir = TempDir::new().unwrap();
        let path = write_survey(dir.path(), &["United States"]);
        let mut cache = LoadCache::new();

        assert_eq!(cache.get_or_load(&path).unwrap().len(), 1);
        write_survey(dir.path(), &["United States", "France", "Peru"]);
        assert_eq!(cache.get_or_load(&path).unwrap().len(), 3);

        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        let path = write_survey(dir.path(), &["France"]);
        let mut cache = LoadCache::new();

        cache.get_or_load(&path).unwrap();
        cache.invalidate();
        assert!(cache.is_empty());
        cache.get_or_load(&path).unwrap();
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("survey.csv");
        std::fs::write(&path, "Name\nx\n").unwrap();
        let mut cache = LoadCache::new();

        assert!(cache.get_or_load(&path).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file_is_file_read_error() {
        let dir = TempDir::new().unwrap();
        let mut cache = LoadCache::new();
        let err = cache.get_or_load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, SurveyError::FileRead { .. }));
    }
}
