//! The content-addressed quad store.
//!
//! Quads are stored one per line in sorted NQuads files sharded by the
//! SHA-1 of the subject's N3 rendering: `<root>/<h[0..2]>/<h>.nqo`. All
//! mutation flows through the write-behind [`CachingFileManager`]; every
//! top-level mutating operation flushes before it returns, so a subsequent
//! read in the same process observes the change on disk.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use regex::Regex;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::cache::{CachingFileManager, DEFAULT_CACHE_CAPACITY};
use crate::config::{QuinceConfig, CONFIG_FILE};
use crate::error::Result;
use crate::grammar;
use crate::term::{Term, TermPattern, DEFAULT_GRAPH_IRI};

/// Extension of the subject-out quad files.
pub const NQOUT: &str = ".nqo";

// ---------------------------------------------------------------------------
// Line assembly and pattern compilation
// ---------------------------------------------------------------------------

/// The canonical NQuad line for four terms: `S P O G .\n`.
pub fn make_nquad(s: &Term, p: &Term, o: &Term, g: &Term) -> String {
    format!("{} {} {} {} .\n", s.n3(), p.n3(), o.n3(), g.n3())
}

/// Compile a four-position pattern into a regex over canonical lines.
/// Concrete terms are escaped literally; a wildcard subject, predicate, or
/// graph matches any IRI, a wildcard object any IRI or literal.
pub fn make_nquad_pattern(
    s: &TermPattern,
    p: &TermPattern,
    o: &TermPattern,
    g: &TermPattern,
) -> Regex {
    let pattern = format!(
        r"^{}\s+{}\s+{}\s+{}\s+\.",
        position_fragment(s, grammar::IRI_MATCH),
        position_fragment(p, grammar::IRI_MATCH),
        position_fragment(o, &grammar::iri_or_literal_match()),
        position_fragment(g, grammar::IRI_MATCH),
    );
    Regex::new(&pattern).expect("quad pattern is valid")
}

fn position_fragment(position: &TermPattern, wildcard: &str) -> String {
    match position {
        TermPattern::Concrete(term) => regex::escape(&term.clone().skolemize().n3()),
        TermPattern::Any => wildcard.to_string(),
    }
}

// ---------------------------------------------------------------------------
// QuinceStore
// ---------------------------------------------------------------------------

pub struct QuinceStore {
    root: PathBuf,
    default_graph: Term,
    manager: CachingFileManager,
    config: QuinceConfig,
}

impl QuinceStore {
    /// Open the store rooted at `root` (the `.quince` directory). When
    /// `default_graph` is `None` the well-known default-graph IRI is used.
    pub fn open(root: &Path, default_graph: Option<Term>) -> Result<Self> {
        let config = QuinceConfig::open(&root.join(CONFIG_FILE))?;
        Ok(QuinceStore {
            root: root.to_path_buf(),
            default_graph: default_graph.unwrap_or_else(|| Term::iri(DEFAULT_GRAPH_IRI)),
            manager: CachingFileManager::new(DEFAULT_CACHE_CAPACITY),
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_graph(&self) -> &Term {
        &self.default_graph
    }

    /// Path of the shard file holding quads whose subject is `term`:
    /// `<root>/<h[0..2]>/<h>.nqo` for `h = SHA-1(N3(term))`.
    pub fn shard_path(&self, term: &Term) -> PathBuf {
        let digest = Sha1::digest(term.n3().as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.root.join(&hex[..2]).join(format!("{hex}{NQOUT}"))
    }

    // -----------------------------------------------------------------------
    // Quad operations
    // -----------------------------------------------------------------------

    /// Add a quad. Blank nodes are skolemized first; asserting a quad that
    /// is already present is a no-op.
    pub fn assert_quad(&mut self, s: &Term, p: &Term, o: &Term, g: Option<&Term>) -> Result<()> {
        let s = s.clone().skolemize();
        let p = p.clone().skolemize();
        let o = o.clone().skolemize();
        let g = match g {
            Some(g) => g.clone().skolemize(),
            None => self.default_graph.clone(),
        };
        let line = make_nquad(&s, &p, &o, &g);
        let path = self.shard_path(&s);
        self.manager.add_line(&path, line)
    }

    /// Remove every quad matching the pattern, returning the removed lines.
    /// A concrete subject routes to its single shard; a wildcard subject
    /// scans every shard file.
    pub fn retract_quad(
        &mut self,
        s: &TermPattern,
        p: &TermPattern,
        o: &TermPattern,
        g: Option<&TermPattern>,
    ) -> Result<Vec<String>> {
        let default = TermPattern::Concrete(self.default_graph.clone());
        let pattern = make_nquad_pattern(s, p, o, g.unwrap_or(&default));
        match s {
            TermPattern::Concrete(term) => {
                let path = self.shard_path(&term.clone().skolemize());
                self.manager.remove_lines_matching(&path, &pattern)
            }
            TermPattern::Any => {
                let mut removed = Vec::new();
                for path in self.quad_file_paths() {
                    removed.extend(self.manager.remove_lines_matching(&path, &pattern)?);
                }
                Ok(removed)
            }
        }
    }

    /// The read-only version of retract's match step: every stored line
    /// matching the pattern.
    pub fn exists(
        &mut self,
        s: &TermPattern,
        p: &TermPattern,
        o: &TermPattern,
        g: Option<&TermPattern>,
    ) -> Result<Vec<String>> {
        let default = TermPattern::Concrete(self.default_graph.clone());
        let pattern = make_nquad_pattern(s, p, o, g.unwrap_or(&default));
        let paths = match s {
            TermPattern::Concrete(term) => vec![self.shard_path(&term.clone().skolemize())],
            TermPattern::Any => self.quad_file_paths(),
        };
        let mut matches = Vec::new();
        for path in paths {
            matches.extend(
                self.manager
                    .iter_lines(&path)?
                    .filter(|line| pattern.is_match(line))
                    .map(String::from),
            );
        }
        Ok(matches)
    }

    /// Iterate every stored line, optionally restricted to the given
    /// graphs. Reads straight from disk without populating the cache.
    pub fn all_quads(&self, graphs: Option<&[Term]>) -> QuadLines {
        let filter = graphs.map(|graphs| {
            let alternation = graphs
                .iter()
                .map(|g| regex::escape(&g.n3()))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(
                r"^{iri}\s+{iri}\s+{obj}\s+(?:{alternation})\s+\.",
                iri = grammar::IRI_MATCH,
                obj = grammar::iri_or_literal_match(),
            );
            Regex::new(&pattern).expect("graph filter pattern is valid")
        });
        QuadLines { files: self.quad_file_paths().into_iter(), current: Vec::new().into_iter(), filter }
    }

    /// Rewrite the given quad files (or all of them) in canonical sorted
    /// order, by loading each through the cache and flushing. Running this
    /// twice in a row leaves the tree byte-identical after the first pass.
    pub fn sort_quads(&mut self, paths: Option<&[PathBuf]>) -> Result<usize> {
        let targets: Vec<PathBuf> = match paths {
            Some(list) => list.to_vec(),
            None => self.quad_file_paths(),
        };
        for path in &targets {
            self.manager.touch(path)?;
        }
        self.manager.flush()?;
        debug!(files = targets.len(), "checked sort order");
        Ok(targets.len())
    }

    /// Write all pending changes to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.manager.flush()
    }

    // -----------------------------------------------------------------------
    // Namespaces and remotes
    // -----------------------------------------------------------------------

    pub fn namespaces(&self) -> Result<std::collections::BTreeMap<String, String>> {
        self.config.namespaces()
    }

    pub fn add_namespace(&mut self, prefix: &str, iri: &str) -> Result<()> {
        self.config.add_namespace(prefix, iri)
    }

    pub fn remove_namespace(&mut self, prefix: &str) -> Result<()> {
        self.config.remove_namespace(prefix)
    }

    pub fn expand_prefix(&self, prefix: &str) -> Result<String> {
        self.config.expand_prefix(prefix)
    }

    pub fn remotes(&self) -> Result<std::collections::BTreeMap<String, String>> {
        self.config.remotes()
    }

    pub fn add_remote(&mut self, name: &str, endpoint: &str) -> Result<()> {
        self.config.add_remote(name, endpoint)
    }

    pub fn remove_remote(&mut self, name: &str) -> Result<()> {
        self.config.remove_remote(name)
    }

    // -----------------------------------------------------------------------
    // Shard walking
    // -----------------------------------------------------------------------

    /// Every `.nqo` file under the store root, sorted for deterministic
    /// iteration. Unreadable directory entries are skipped.
    fn quad_file_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .build()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().map(|ext| ext == "nqo").unwrap_or(false))
            .collect();
        paths.sort();
        paths
    }
}

// ---------------------------------------------------------------------------
// All-quads iterator
// ---------------------------------------------------------------------------

/// Lazy, file-at-a-time iterator over stored lines.
pub struct QuadLines {
    files: std::vec::IntoIter<PathBuf>,
    current: std::vec::IntoIter<String>,
    filter: Option<Regex>,
}

impl Iterator for QuadLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.current.next() {
                match &self.filter {
                    Some(filter) if !filter.is_match(&line) => continue,
                    _ => return Some(Ok(line)),
                }
            }
            let path = self.files.next()?;
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let lines: Vec<String> =
                        content.lines().map(|l| format!("{l}\n")).collect();
                    self.current = lines.into_iter();
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
