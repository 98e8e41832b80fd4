//! In-memory sorted line sets and their file binding.
//!
//! Every quad file on disk is the textual form of a [`SortedSet`]: strictly
//! ascending lexicographic order, no duplicates, every line `\n`-terminated.
//! [`FileEntry`] ties a set to a path — load on construction, full rewrite
//! on flush — which is also what makes the sort pass work: loading and
//! flushing an unsorted file normalizes it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

// ---------------------------------------------------------------------------
// SortedSet
// ---------------------------------------------------------------------------

/// Duplicate-free, lexicographically sorted list of strings with
/// binary-search insert and remove.
#[derive(Debug, Default, Clone)]
pub struct SortedSet {
    items: Vec<String>,
}

impl SortedSet {
    pub fn new() -> Self {
        SortedSet { items: Vec::new() }
    }

    /// Build from arbitrary lines, sorting and deduplicating.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut items: Vec<String> = lines.into_iter().collect();
        items.sort();
        items.dedup();
        SortedSet { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.items.binary_search_by(|probe| probe.as_str().cmp(value)).is_ok()
    }

    /// Insert `value` at its sorted position. No-op (returns false) when the
    /// value is already present.
    pub fn insert(&mut self, value: String) -> bool {
        match self.items.binary_search(&value) {
            Ok(_) => false,
            Err(pos) => {
                self.items.insert(pos, value);
                true
            }
        }
    }

    /// Remove an exact value. Returns false when absent.
    pub fn remove(&mut self, value: &str) -> bool {
        match self.items.binary_search_by(|probe| probe.as_str().cmp(value)) {
            Ok(pos) => {
                self.items.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Remove every element matching `pattern` in one pass, returning the
    /// removed elements in their original order.
    pub fn remove_matching(&mut self, pattern: &Regex) -> Vec<String> {
        let mut removed = Vec::new();
        self.items.retain(|line| {
            if pattern.is_match(line) {
                removed.push(line.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// FileEntry
// ---------------------------------------------------------------------------

/// A [`SortedSet`] bound to a file path. Construction reads the file's
/// lines (empty set when the file does not exist); `flush` rewrites the
/// whole file, creating parent directories as needed.
#[derive(Debug)]
pub struct FileEntry {
    path: PathBuf,
    lines: SortedSet,
}

impl FileEntry {
    pub fn load(path: &Path) -> io::Result<Self> {
        let lines = match fs::read_to_string(path) {
            Ok(content) => {
                SortedSet::from_lines(content.lines().map(|l| format!("{l}\n")))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => SortedSet::new(),
            Err(e) => return Err(e),
        };
        Ok(FileEntry { path: path.to_path_buf(), lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&mut self, line: String) -> bool {
        self.lines.insert(line)
    }

    pub fn remove(&mut self, line: &str) -> bool {
        self.lines.remove(line)
    }

    pub fn remove_matching(&mut self, pattern: &Regex) -> Vec<String> {
        self.lines.remove_matching(pattern)
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.contains(line)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Rewrite the file with the current contents.
    pub fn flush(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = String::new();
        for line in self.lines.iter() {
            content.push_str(line);
        }
        fs::write(&self.path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_dedups() {
        let mut set = SortedSet::new();
        assert!(set.insert("b\n".into()));
        assert!(set.insert("a\n".into()));
        assert!(set.insert("c\n".into()));
        assert!(!set.insert("b\n".into()));
        let items: Vec<&str> = set.iter().collect();
        assert_eq!(items, vec!["a\n", "b\n", "c\n"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_from_lines_sorts_and_dedups() {
        let set = SortedSet::from_lines(vec!["c\n".into(), "a\n".into(), "c\n".into()]);
        let items: Vec<&str> = set.iter().collect();
        assert_eq!(items, vec!["a\n", "c\n"]);
    }

    #[test]
    fn test_contains_and_remove() {
        let mut set = SortedSet::from_lines(vec!["a\n".into(), "b\n".into()]);
        assert!(set.contains("a\n"));
        assert!(!set.contains("z\n"));
        assert!(set.remove("a\n"));
        assert!(!set.remove("a\n"));
        assert!(!set.contains("a\n"));
    }

    #[test]
    fn test_remove_matching_preserves_original_order() {
        let mut set = SortedSet::from_lines(vec![
            "apple\n".into(),
            "banana\n".into(),
            "apricot\n".into(),
            "cherry\n".into(),
        ]);
        let re = Regex::new("^ap").unwrap();
        let removed = set.remove_matching(&re);
        assert_eq!(removed, vec!["apple\n".to_string(), "apricot\n".to_string()]);
        let rest: Vec<&str> = set.iter().collect();
        assert_eq!(rest, vec!["banana\n", "cherry\n"]);
    }

    #[test]
    fn test_file_entry_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entry = FileEntry::load(&dir.path().join("absent")).unwrap();
        assert!(entry.is_empty());
    }

    #[test]
    fn test_file_entry_load_flush_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aa").join("deadbeef.nqo");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "b\nb\na\n").unwrap();

        let entry = FileEntry::load(&path).unwrap();
        entry.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_file_entry_flush_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ab").join("cafe.nqo");
        let mut entry = FileEntry::load(&path).unwrap();
        entry.insert("x\n".into());
        entry.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n");
    }
}
