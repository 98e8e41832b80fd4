//! Write-behind file pool: a bounded LRU of [`FileEntry`] values keyed by
//! path.
//!
//! Mutations touch only the cached representation; disk is rewritten when an
//! entry is evicted to make room or when `flush` is called. Eviction flushes
//! synchronously at the mutating call site, so a full disk or permission
//! error surfaces on the operation that caused it rather than being deferred.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::sorted::FileEntry;

/// Default number of file entries held in memory. A sizing knob, not a
/// correctness parameter.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

pub struct CachingFileManager {
    cache: LruCache<PathBuf, FileEntry>,
}

impl CachingFileManager {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        CachingFileManager { cache: LruCache::new(capacity) }
    }

    /// Insert `line` into the file at `path`, maintaining sort order.
    /// No-op when the line is already present.
    pub fn add_line(&mut self, path: &Path, line: String) -> Result<()> {
        self.entry(path)?.insert(line);
        Ok(())
    }

    /// Remove the exact `line` from the file at `path`. No-op when the file
    /// does not contain it.
    pub fn remove_line(&mut self, path: &Path, line: &str) -> Result<()> {
        self.entry(path)?.remove(line);
        Ok(())
    }

    /// Remove every line matching `pattern` from the file at `path`,
    /// returning the removed lines in their stored order.
    pub fn remove_lines_matching(&mut self, path: &Path, pattern: &Regex) -> Result<Vec<String>> {
        Ok(self.entry(path)?.remove_matching(pattern))
    }

    /// Iterate the current in-memory lines of the file at `path`. An absent
    /// file yields an empty iterator.
    pub fn iter_lines(&mut self, path: &Path) -> Result<impl Iterator<Item = &str>> {
        Ok(self.entry(path)?.iter())
    }

    /// Load the file at `path` into the cache without mutating it. Loading
    /// sorts the lines in memory, so a later flush rewrites the file in
    /// canonical order — the whole mechanism behind the sort pass.
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.entry(path)?;
        Ok(())
    }

    /// Write every cached entry to disk. Order is irrelevant; entries stay
    /// cached.
    pub fn flush(&mut self) -> Result<()> {
        for (_, entry) in self.cache.iter_mut() {
            entry.flush()?;
        }
        Ok(())
    }

    fn entry(&mut self, path: &Path) -> Result<&mut FileEntry> {
        if !self.cache.contains(path) {
            let loaded = FileEntry::load(path)?;
            if let Some((evicted_path, evicted)) = self.cache.push(path.to_path_buf(), loaded) {
                debug!(path = %evicted_path.display(), "evicting cached file entry");
                evicted.flush()?;
            }
        }
        Ok(self.cache.get_mut(path).expect("entry present after insert"))
    }
}
