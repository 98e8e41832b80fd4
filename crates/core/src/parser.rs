//! Streaming, line-oriented NTriples/NQuads parser.
//!
//! Each non-empty, non-comment line yields one statement into a
//! [`QuadSink`]: `triple(s, p, o)` for three terms, `quad(s, p, o, g)` when
//! a context follows the object. Anything after the terminating `.` is a
//! parse error, and whole-file errors carry the offending line verbatim.

use std::io::BufRead;
use std::path::Path;

use regex::Regex;

use crate::error::{QuinceError, Result};
use crate::sink::QuadSink;
use crate::term::{unescape, Term};

/// The input syntaxes quince accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    NQuads,
}

impl RdfFormat {
    /// Infer the format from a file extension: `.nt` is NTriples,
    /// `.nq`/`.nquads` is NQuads.
    pub fn from_path(path: &Path) -> Option<RdfFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "nt" => Some(RdfFormat::NTriples),
            "nq" | "nquads" => Some(RdfFormat::NQuads),
            _ => None,
        }
    }
}

pub struct RdfParser {
    format: RdfFormat,
    uriref: Regex,
    bnode: Regex,
    literal: Regex,
}

type ScanResult<T> = std::result::Result<T, String>;
type ParsedLine = (Term, Term, Term, Option<Term>);

impl RdfParser {
    pub fn new(format: RdfFormat) -> Self {
        RdfParser {
            format,
            uriref: Regex::new(r"^<([^>]*)>").expect("uriref token regex is valid"),
            bnode: Regex::new(r"^_:([A-Za-z0-9_][A-Za-z0-9_\-.]*)")
                .expect("bnode token regex is valid"),
            literal: Regex::new(
                r#"^"([^"\\]*(?:\\.[^"\\]*)*)"(?:\^\^<([^>]*)>|@([a-zA-Z]+(?:-[a-zA-Z0-9]+)*))?"#,
            )
            .expect("literal token regex is valid"),
        }
    }

    /// Parse the whole source, dispatching every statement into `sink`.
    /// `source_name` labels errors for diagnostics.
    pub fn parse<R, S>(&self, reader: R, source_name: &str, sink: &mut S) -> Result<()>
    where
        R: BufRead,
        S: QuadSink,
    {
        for line in reader.lines() {
            let line = line?;
            match self.scan_line(&line) {
                Ok(None) => continue,
                Ok(Some((s, p, o, None))) => sink.triple(s, p, o)?,
                Ok(Some((s, p, o, Some(g)))) => sink.quad(s, p, o, g)?,
                Err(message) => {
                    return Err(QuinceError::Parse {
                        source_name: source_name.to_string(),
                        message: format!("invalid line ({message}): {line:?}"),
                    })
                }
            }
        }
        Ok(())
    }

    /// Scan one line into its terms. `Ok(None)` for blank and comment
    /// lines; `Err` carries a syntax message.
    fn scan_line(&self, line: &str) -> ScanResult<Option<ParsedLine>> {
        let mut rest = line.trim_start();
        if rest.is_empty() || rest.starts_with('#') {
            return Ok(None);
        }

        let subject = self
            .resource(&mut rest)?
            .ok_or("subject must be an IRI or blank node")?;
        rest = rest.trim_start();

        let predicate = self.uriref(&mut rest)?.ok_or("predicate must be an IRI")?;
        rest = rest.trim_start();

        let object = self
            .object(&mut rest)?
            .ok_or("object must be an IRI, blank node or literal")?;
        rest = rest.trim_start();

        let context = match self.format {
            RdfFormat::NQuads => {
                let c = self.resource(&mut rest)?;
                if c.is_some() {
                    rest = rest.trim_start();
                }
                c
            }
            RdfFormat::NTriples => None,
        };

        let after = rest
            .strip_prefix('.')
            .ok_or("expected '.' at end of statement")?;
        if !after.trim().is_empty() {
            return Err("trailing garbage".to_string());
        }
        Ok(Some((subject, predicate, object, context)))
    }

    /// An IRI or a blank node.
    fn resource<'t>(&self, rest: &mut &'t str) -> ScanResult<Option<Term>> {
        if let Some(iri) = self.uriref(rest)? {
            return Ok(Some(iri));
        }
        let text: &'t str = *rest;
        if let Some(caps) = self.bnode.captures(text) {
            let label = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string();
            *rest = &text[caps.get(0).map(|m| m.end()).unwrap_or_default()..];
            return Ok(Some(Term::blank(label)));
        }
        Ok(None)
    }

    fn uriref<'t>(&self, rest: &mut &'t str) -> ScanResult<Option<Term>> {
        let text: &'t str = *rest;
        let Some(caps) = self.uriref.captures(text) else {
            return Ok(None);
        };
        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        *rest = &text[caps.get(0).map(|m| m.end()).unwrap_or_default()..];
        Ok(Some(Term::iri(unescape(raw)?)))
    }

    /// An IRI, blank node, or literal with optional datatype or language.
    fn object<'t>(&self, rest: &mut &'t str) -> ScanResult<Option<Term>> {
        if let Some(term) = self.resource(rest)? {
            return Ok(Some(term));
        }
        let text: &'t str = *rest;
        let Some(caps) = self.literal.captures(text) else {
            return Ok(None);
        };
        let lexical = unescape(caps.get(1).map(|m| m.as_str()).unwrap_or_default())?;
        let datatype = caps.get(2).map(|m| m.as_str().to_string());
        let language = caps.get(3).map(|m| m.as_str().to_string());
        *rest = &text[caps.get(0).map(|m| m.end()).unwrap_or_default()..];
        Ok(Some(Term::Literal { lexical, language, datatype }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[derive(Default)]
    struct CollectingSink {
        triples: Vec<(Term, Term, Term)>,
        quads: Vec<(Term, Term, Term, Term)>,
    }

    impl QuadSink for CollectingSink {
        fn triple(&mut self, s: Term, p: Term, o: Term) -> Result<()> {
            self.triples.push((s, p, o));
            Ok(())
        }

        fn quad(&mut self, s: Term, p: Term, o: Term, g: Term) -> Result<()> {
            self.quads.push((s, p, o, g));
            Ok(())
        }
    }

    fn parse_nt(input: &str) -> CollectingSink {
        let mut sink = CollectingSink::default();
        RdfParser::new(RdfFormat::NTriples)
            .parse(input.as_bytes(), "test", &mut sink)
            .unwrap();
        sink
    }

    fn parse_nq(input: &str) -> CollectingSink {
        let mut sink = CollectingSink::default();
        RdfParser::new(RdfFormat::NQuads)
            .parse(input.as_bytes(), "test", &mut sink)
            .unwrap();
        sink
    }

    #[test]
    fn test_simple_triple() {
        let sink = parse_nt("<http://example.org/s> <http://example.org/p> <http://example.org/o> .");
        assert_eq!(sink.triples.len(), 1);
        let (s, p, o) = &sink.triples[0];
        assert_eq!(s, &Term::iri("http://example.org/s"));
        assert_eq!(p, &Term::iri("http://example.org/p"));
        assert_eq!(o, &Term::iri("http://example.org/o"));
    }

    #[test]
    fn test_literal_objects() {
        let sink = parse_nt(concat!(
            "<http://x/s> <http://x/p> \"hello world\" .\n",
            "<http://x/s> <http://x/p> \"hallo\"@de .\n",
            "<http://x/s> <http://x/p> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n",
        ));
        assert_eq!(sink.triples.len(), 3);
        assert_eq!(sink.triples[0].2, Term::literal("hello world"));
        assert_eq!(sink.triples[1].2, Term::literal_lang("hallo", "de"));
        assert_eq!(
            sink.triples[2].2,
            Term::literal_typed("1", "http://www.w3.org/2001/XMLSchema#integer")
        );
    }

    #[test]
    fn test_escaped_literal_is_decoded() {
        let sink = parse_nt(r#"<http://x/s> <http://x/p> "say \"hi\"\nagain" ."#);
        assert_eq!(sink.triples[0].2, Term::literal("say \"hi\"\nagain"));
    }

    #[test]
    fn test_quad_with_context() {
        let sink = parse_nq("<http://x/s> <http://x/p> <http://x/o> <http://x/g> .");
        assert_eq!(sink.quads.len(), 1);
        assert_eq!(sink.quads[0].3, Term::iri("http://x/g"));
    }

    #[test]
    fn test_quads_input_without_context_is_a_triple() {
        let sink = parse_nq("<http://x/s> <http://x/p> <http://x/o> .");
        assert_eq!(sink.triples.len(), 1);
        assert!(sink.quads.is_empty());
    }

    #[test]
    fn test_blank_nodes() {
        let sink = parse_nt("_:a <http://x/p> _:b .");
        assert_eq!(sink.triples[0].0, Term::blank("a"));
        assert_eq!(sink.triples[0].2, Term::blank("b"));
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let sink = parse_nt("# a comment\n\n<http://x/s> <http://x/p> <http://x/o> .\n");
        assert_eq!(sink.triples.len(), 1);
    }

    #[test]
    fn test_trailing_garbage_is_an_error() {
        let mut sink = CollectingSink::default();
        let err = RdfParser::new(RdfFormat::NTriples)
            .parse(
                "<http://x/s> <http://x/p> <http://x/o> . junk".as_bytes(),
                "bad.nt",
                &mut sink,
            )
            .unwrap_err();
        match err {
            QuinceError::Parse { source_name, message } => {
                assert_eq!(source_name, "bad.nt");
                assert!(message.contains("junk"), "message should carry the line: {message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_dot_is_an_error() {
        let mut sink = CollectingSink::default();
        let err = RdfParser::new(RdfFormat::NTriples)
            .parse("<http://x/s> <http://x/p> <http://x/o>".as_bytes(), "bad.nt", &mut sink)
            .unwrap_err();
        assert!(matches!(err, QuinceError::Parse { .. }));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RdfFormat::from_path(Path::new("data.nt")), Some(RdfFormat::NTriples));
        assert_eq!(RdfFormat::from_path(Path::new("data.nq")), Some(RdfFormat::NQuads));
        assert_eq!(RdfFormat::from_path(Path::new("data.nquads")), Some(RdfFormat::NQuads));
        assert_eq!(RdfFormat::from_path(Path::new("data.ttl")), None);
        assert_eq!(RdfFormat::from_path(Path::new("noext")), None);
    }
}
