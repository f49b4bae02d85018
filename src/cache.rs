//! Memoization of pipeline stages.
//!
//! Derived batches are keyed by the content hash of the uploaded file,
//! filter results by `(batch id, filter spec)`. Nothing is ever evicted
//! piecemeal: a new upload tears the whole cache down.

use crate::error::Result;
use crate::filter::{apply, FilterSpec, Filtered};
use crate::loader::{content_id, load_bytes, LoadReport};
use crate::types::{BatchId, TaskBatch};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub batch: TaskBatch,
    pub report: LoadReport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Default)]
pub struct PipelineCache {
    derived: HashMap<BatchId, Arc<Loaded>>,
    filtered: HashMap<(BatchId, FilterSpec), Arc<Filtered>>,
    stats: CacheStats,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived batch for `bytes`, loading it on a miss. Content not seen
    /// before is a new upload and invalidates every entry first. Schema
    /// errors are not cached.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<Loaded>> {
        let id = content_id(bytes);
        if let Some(hit) = self.derived.get(&id) {
            self.stats.hits += 1;
            debug!(batch = %id, "derived batch cache hit");
            return Ok(Arc::clone(hit));
        }
        self.stats.misses += 1;
        debug!(batch = %id, "derived batch cache miss");
        self.invalidate();
        let (batch, report) = load_bytes(bytes)?;
        let loaded = Arc::new(Loaded { batch, report });
        self.derived.insert(id, Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn filter(&mut self, batch: &TaskBatch, spec: &FilterSpec) -> Arc<Filtered> {
        let key = (batch.id.clone(), spec.clone());
        if let Some(hit) = self.filtered.get(&key) {
            self.stats.hits += 1;
            debug!(batch = %batch.id, "filter cache hit");
            return Arc::clone(hit);
        }
        self.stats.misses += 1;
        let result = Arc::new(apply(batch, spec));
        self.filtered.insert(key, Arc::clone(&result));
        result
    }

    /// Drop every entry.
    pub fn invalidate(&mut self) {
        debug!(
            derived = self.derived.len(),
            filtered = self.filtered.len(),
            "invalidating pipeline cache"
        );
        self.derived.clear();
        self.filtered.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.derived.len() + self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One user's view of the pipeline: the current upload and a private
/// cache namespace.
#[derive(Debug, Default)]
pub struct Session {
    cache: PipelineCache,
    current: Option<Arc<Loaded>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bytes` the current snapshot. Re-uploading identical content
    /// keeps the cache; anything else invalidates it first. On a schema
    /// error the previous snapshot is gone as well.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<Arc<Loaded>> {
        let id = content_id(bytes);
        let same = self.current.as_ref().is_some_and(|c| c.batch.id == id);
        if !same {
            self.cache.invalidate();
            self.current = None;
        }
        let loaded = self.cache.load(bytes)?;
        self.current = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn current(&self) -> Option<&Arc<Loaded>> {
        self.current.as_ref()
    }

    /// Filter the current snapshot; `None` before the first upload.
    pub fn filter(&mut self, spec: &FilterSpec) -> Option<Arc<Filtered>> {
        let current = self.current.clone()?;
        Some(self.cache.filter(&current.batch, spec))
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &PipelineCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Selection;

    const FIRST: &[u8] = b"Name,Start Date,Due Date,Assignee\nA,2024-01-01,2024-01-02,Alice\nB,,,Bob\n";
    const SECOND: &[u8] = b"Name,Start Date,Due Date\nC,,\n";

    #[test]
    fn identical_upload_hits_cache() {
        let mut s = Session::new();
        let a = s.upload(FIRST).unwrap();
        let b = s.upload(FIRST).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(s.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn filter_results_are_memoized() {
        let mut s = Session::new();
        s.upload(FIRST).unwrap();
        let spec = FilterSpec {
            assignees: Selection::only(["Alice"]),
            ..FilterSpec::default()
        };
        let a = s.filter(&spec).unwrap();
        let b = s.filter(&spec).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.batch.len(), 1);
        assert_eq!(s.cache().len(), 2);
    }

    #[test]
    fn new_upload_tears_down_everything() {
        let mut s = Session::new();
        s.upload(FIRST).unwrap();
        s.filter(&FilterSpec::default()).unwrap();
        assert_eq!(s.cache().len(), 2);

        let loaded = s.upload(SECOND).unwrap();
        assert_eq!(s.cache().len(), 1);
        assert_eq!(loaded.batch.tasks[0].name, "C");
    }

    #[test]
    fn direct_load_of_new_content_drops_old_entries() {
        let mut cache = PipelineCache::new();
        let first = cache.load(FIRST).unwrap();
        cache.filter(&first.batch, &FilterSpec::default());
        assert_eq!(cache.len(), 2);

        cache.load(SECOND).unwrap();
        assert_eq!(cache.len(), 1);

        cache.load(FIRST).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 4 });
    }

    #[test]
    fn schema_error_leaves_no_snapshot() {
        let mut s = Session::new();
        s.upload(FIRST).unwrap();
        assert!(s.upload(b"Name\nX\n").is_err());
        assert!(s.current().is_none());
        assert!(s.filter(&FilterSpec::default()).is_none());
        assert!(s.cache().is_empty());
    }

    #[test]
    fn sessions_do_not_share_entries() {
        let mut a = Session::new();
        let mut b = Session::new();
        a.upload(FIRST).unwrap();
        b.upload(FIRST).unwrap();
        assert_eq!(a.stats().misses, 1);
        assert_eq!(b.stats().misses, 1);
        assert_eq!(b.stats().hits, 0);
    }
}
