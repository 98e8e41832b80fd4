//! The diff engine: turning a Git unified diff of the `.quince` tree into
//! an RDF change set, with an optional SPARQL-Update rendering.
//!
//! Hunk lines beginning `+` or `-` are parsed against the canonical NQuad
//! line regex (starting after the sign); everything before the first `@@`
//! of a file diff is header noise and skipped.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::git;
use crate::grammar;

/// Insertions and deletions extracted from a patch, as canonical lines
/// with the sign and trailing newline stripped.
#[derive(Debug, Default, Serialize)]
pub struct QuadDiffList {
    pub insertions: Vec<String>,
    pub deletions: Vec<String>,
}

impl QuadDiffList {
    /// Parse unified-diff text. `subject` and `graph` filter on the
    /// respective positions; each accepts an IRI with or without the `<>`
    /// delimiters.
    pub fn from_patch(patch: &str, subject: Option<&str>, graph: Option<&str>) -> Self {
        let line_regex = grammar::nquad_line_regex();
        let subject = subject.map(normalize_iri_filter);
        let graph = graph.map(normalize_iri_filter);

        let mut diffs = QuadDiffList::default();
        let mut in_hunk = false;
        for line in patch.lines() {
            if line.starts_with("diff --git") {
                in_hunk = false;
                continue;
            }
            if line.starts_with("@@") {
                in_hunk = true;
                continue;
            }
            if !in_hunk {
                continue;
            }
            let sign = match line.as_bytes().first() {
                Some(b'+') => '+',
                Some(b'-') => '-',
                _ => continue,
            };
            let Some(caps) = line_regex.captures(&line[1..]) else {
                continue;
            };
            if let Some(wanted) = &subject {
                if &caps["s"] != wanted.as_str() {
                    continue;
                }
            }
            if let Some(wanted) = &graph {
                if &caps["g"] != wanted.as_str() {
                    continue;
                }
            }
            let change = line[1..].trim_end().to_string();
            match sign {
                '+' => diffs.insertions.push(change),
                _ => diffs.deletions.push(change),
            }
        }
        diffs
    }

    pub fn len(&self) -> usize {
        self.insertions.len() + self.deletions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.deletions.is_empty()
    }

    /// The nquad_diff report: deletions, a `||` separator, insertions.
    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len() + 1);
        out.extend(self.deletions.iter().cloned());
        out.push("||".to_string());
        out.extend(self.insertions.iter().cloned());
        out
    }
}

/// Run the diff pipeline: extract the patch for the given refs and parse
/// it into a change set.
pub fn generate_diffs(
    worktree: &Path,
    refs: &[String],
    subject: Option<&str>,
    graph: Option<&str>,
) -> Result<QuadDiffList> {
    let patch = git::diff_patch(worktree, refs)?;
    Ok(QuadDiffList::from_patch(&patch, subject, graph))
}

// ---------------------------------------------------------------------------
// SPARQL rendering
// ---------------------------------------------------------------------------

/// Change set grouped by graph, rendered as `DELETE DATA`/`INSERT DATA`
/// blocks of `GRAPH` clauses.
#[derive(Debug)]
pub struct SparqlDiffList {
    line_regex: Regex,
    insertions: BTreeMap<String, Vec<String>>,
    deletions: BTreeMap<String, Vec<String>>,
    count: usize,
}

impl SparqlDiffList {
    pub fn new() -> Self {
        SparqlDiffList {
            line_regex: grammar::nquad_line_regex(),
            insertions: BTreeMap::new(),
            deletions: BTreeMap::new(),
            count: 0,
        }
    }

    pub fn from_changes(changes: &QuadDiffList) -> Self {
        let mut list = SparqlDiffList::new();
        for deletion in &changes.deletions {
            list.add(&format!("-{deletion}"));
        }
        for insertion in &changes.insertions {
            list.add(&format!("+{insertion}"));
        }
        list
    }

    /// Add one signed change line (`+` or `-` followed by a canonical NQuad
    /// line). Returns false when the line does not parse.
    pub fn add(&mut self, change: &str) -> bool {
        let target = match change.as_bytes().first() {
            Some(b'+') => &mut self.insertions,
            Some(b'-') => &mut self.deletions,
            _ => return false,
        };
        let Some(caps) = self.line_regex.captures(&change[1..]) else {
            return false;
        };
        let triple = format!("{} {} {} .", &caps["s"], &caps["p"], &caps["o"]);
        target.entry(caps["g"].to_string()).or_default().push(triple);
        self.count += 1;
        true
    }

    pub fn any(&self) -> bool {
        self.count > 0
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The SPARQL-Update text: a `DELETE DATA` block, then an `INSERT DATA`
    /// block, each holding one `GRAPH` clause per graph. Empty blocks are
    /// omitted.
    pub fn render(&self) -> String {
        let mut blocks = Vec::new();
        if !self.deletions.is_empty() {
            blocks.push(render_block("DELETE DATA", &self.deletions));
        }
        if !self.insertions.is_empty() {
            blocks.push(render_block("INSERT DATA", &self.insertions));
        }
        blocks.join("\n")
    }
}

impl Default for SparqlDiffList {
    fn default() -> Self {
        Self::new()
    }
}

fn render_block(keyword: &str, graphs: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = format!("{keyword} {{\n");
    for (graph, triples) in graphs {
        out.push_str(&format!("GRAPH {graph} {{\n"));
        for triple in triples {
            out.push_str(triple);
            out.push('\n');
        }
        out.push_str("}\n");
    }
    out.push('}');
    out
}

fn normalize_iri_filter(iri: &str) -> String {
    let bare = iri.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(iri);
    format!("<{bare}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
diff --git a/.quince/aa/0011.nqo b/.quince/aa/0011.nqo
index e69de29..4b825dc 100644
--- a/.quince/aa/0011.nqo
+++ b/.quince/aa/0011.nqo
@@ -1,2 +1,2 @@
 <http://x/s> <http://x/p> <http://x/o1> <http://x/g> .
+<http://x/s> <http://x/p> <http://x/o2> <http://x/g> .
-<http://x/s2> <http://x/p> <http://x/o3> <http://x/g2> .
";

    #[test]
    fn test_from_patch_collects_signed_lines() {
        let diffs = QuadDiffList::from_patch(PATCH, None, None);
        assert_eq!(diffs.insertions.len(), 1);
        assert_eq!(diffs.deletions.len(), 1);
        assert_eq!(diffs.insertions[0], "<http://x/s> <http://x/p> <http://x/o2> <http://x/g> .");
        assert_eq!(diffs.deletions[0], "<http://x/s2> <http://x/p> <http://x/o3> <http://x/g2> .");
    }

    #[test]
    fn test_from_patch_skips_file_headers() {
        // The `---`/`+++` header lines must not be read as deletions or
        // insertions even though they start with the right signs.
        let diffs = QuadDiffList::from_patch(PATCH, None, None);
        assert_eq!(diffs.len(), 2);
    }

    #[test]
    fn test_subject_filter() {
        let diffs = QuadDiffList::from_patch(PATCH, Some("http://x/s"), None);
        assert_eq!(diffs.insertions.len(), 1);
        assert!(diffs.deletions.is_empty());
        // Angle-bracketed form selects the same subject
        let diffs = QuadDiffList::from_patch(PATCH, Some("<http://x/s>"), None);
        assert_eq!(diffs.insertions.len(), 1);
    }

    #[test]
    fn test_graph_filter() {
        let diffs = QuadDiffList::from_patch(PATCH, None, Some("http://x/g2"));
        assert!(diffs.insertions.is_empty());
        assert_eq!(diffs.deletions.len(), 1);
    }

    #[test]
    fn test_render_nquad_diff_shape() {
        let diffs = QuadDiffList::from_patch(PATCH, None, None);
        let report = diffs.render();
        assert_eq!(report.len(), 3);
        assert!(report[0].starts_with("<http://x/s2>"));
        assert_eq!(report[1], "||");
        assert!(report[2].starts_with("<http://x/s>"));
    }

    #[test]
    fn test_single_addition_yields_only_insert_data() {
        let mut diff = SparqlDiffList::new();
        assert!(diff.add(
            "+<http://example.org/s> <http://example.org/p> <http://example.org/o> <http://example.org/g> ."
        ));
        assert!(diff.any());
        assert_eq!(diff.len(), 1);
        let rendered = diff.render();
        assert!(!rendered.contains("DELETE DATA"));
        assert_eq!(
            rendered,
            "INSERT DATA {\n\
             GRAPH <http://example.org/g> {\n\
             <http://example.org/s> <http://example.org/p> <http://example.org/o> .\n\
             }\n\
             }"
        );
    }

    #[test]
    fn test_single_deletion_yields_only_delete_data() {
        let mut diff = SparqlDiffList::new();
        assert!(diff.add(
            "-<http://example.org/s> <http://example.org/p> <http://example.org/o> <http://example.org/g> ."
        ));
        let rendered = diff.render();
        assert!(!rendered.contains("INSERT DATA"));
        assert_eq!(
            rendered,
            "DELETE DATA {\n\
             GRAPH <http://example.org/g> {\n\
             <http://example.org/s> <http://example.org/p> <http://example.org/o> .\n\
             }\n\
             }"
        );
    }

    #[test]
    fn test_multiple_insertions_in_same_graph_share_a_graph_clause() {
        let mut diff = SparqlDiffList::new();
        diff.add("+<http://example.org/s> <http://example.org/p> <http://example.org/o> <http://example.org/g> .");
        diff.add("+<http://example.org/s2> <http://example.org/p> <http://example.org/o> <http://example.org/g> .");
        assert_eq!(diff.len(), 2);
        assert_eq!(
            diff.render(),
            "INSERT DATA {\n\
             GRAPH <http://example.org/g> {\n\
             <http://example.org/s> <http://example.org/p> <http://example.org/o> .\n\
             <http://example.org/s2> <http://example.org/p> <http://example.org/o> .\n\
             }\n\
             }"
        );
    }

    #[test]
    fn test_insertions_in_different_graphs_get_separate_graph_clauses() {
        let mut diff = SparqlDiffList::new();
        diff.add("+<http://example.org/s> <http://example.org/p> <http://example.org/o> <http://example.org/g> .");
        diff.add("+<http://example.org/s2> <http://example.org/p> <http://example.org/o> <http://example.org/g2> .");
        let rendered = diff.render();
        assert!(rendered.contains(
            "INSERT DATA {\n\
             GRAPH <http://example.org/g> {\n\
             <http://example.org/s> <http://example.org/p> <http://example.org/o> .\n\
             }"
        ));
        assert!(rendered.contains(
            "GRAPH <http://example.org/g2> {\n\
             <http://example.org/s2> <http://example.org/p> <http://example.org/o> .\n\
             }\n\
             }"
        ));
    }

    #[test]
    fn test_unsigned_line_is_rejected() {
        let mut diff = SparqlDiffList::new();
        assert!(!diff.add("<http://x/s> <http://x/p> <http://x/o> <http://x/g> ."));
        assert!(!diff.any());
    }
}
