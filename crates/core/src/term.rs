//! RDF term model: IRIs, blank nodes, and literals, with canonical N3
//! rendering and blank-node skolemization.
//!
//! The N3 rendering here is the single definition of how a term appears in a
//! stored NQuad line; the path hasher, pattern matcher, and serializers all
//! consume it.

use std::fmt;

/// IRI of the graph used whenever a quad is stored without an explicit one.
pub const DEFAULT_GRAPH_IRI: &str = "http://networkedplanet.com/quince/.well-known/default-graph";

/// Authority under which blank nodes are skolemized into globally
/// addressable IRIs.
pub const SKOLEM_AUTHORITY: &str = "http://networkedplanet.com/quince/.well-known/genid/";

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// An RDF term. Literals carry an optional language tag or datatype IRI;
/// the two are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal {
        lexical: String,
        language: Option<String>,
        datatype: Option<String>,
    },
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal { lexical: lexical.into(), language: None, datatype: None }
    }

    pub fn literal_lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal { lexical: lexical.into(), language: Some(language.into()), datatype: None }
    }

    pub fn literal_typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal { lexical: lexical.into(), language: None, datatype: Some(datatype.into()) }
    }

    /// Canonical N3 rendering: `<iri>` for IRIs, `_:label` for blank nodes,
    /// quoted-and-escaped forms for literals.
    pub fn n3(&self) -> String {
        match self {
            Term::Iri(iri) => format!("<{iri}>"),
            Term::BlankNode(label) => format!("_:{label}"),
            Term::Literal { lexical, language: Some(lang), .. } => {
                format!("\"{}\"@{}", escape_literal(lexical), lang)
            }
            Term::Literal { lexical, datatype: Some(dt), .. } => {
                format!("\"{}\"^^<{}>", escape_literal(lexical), dt)
            }
            Term::Literal { lexical, .. } => format!("\"{}\"", escape_literal(lexical)),
        }
    }

    /// Replace a blank node with an IRI unique to its label, making it
    /// addressable on disk. IRIs and literals pass through unchanged.
    pub fn skolemize(self) -> Term {
        match self {
            Term::BlankNode(label) => Term::Iri(format!("{SKOLEM_AUTHORITY}{label}")),
            other => other,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.n3())
    }
}

// ---------------------------------------------------------------------------
// Pattern positions
// ---------------------------------------------------------------------------

/// One position of a quad pattern: a concrete term, or the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    Concrete(Term),
    Any,
}

impl TermPattern {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, TermPattern::Any)
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        TermPattern::Concrete(term)
    }
}

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape a literal's lexical form for canonical rendering: `\\`, `\"`,
/// `\n`, `\r` plus `\uXXXX`/`\UXXXXXXXX` for everything outside printable
/// ASCII. The output is pure ASCII, so the stored line sorts bytewise.
pub fn escape_literal(lexical: &str) -> String {
    let mut out = String::with_capacity(lexical.len());
    for c in lexical.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let code = c as u32;
                if code <= 0xFFFF {
                    out.push_str(&format!("\\u{code:04X}"));
                } else {
                    out.push_str(&format!("\\U{code:08X}"));
                }
            }
        }
    }
    out
}

/// Decode the escape sequences accepted on input: the single-character
/// escapes of N-Triples plus `\uXXXX` and `\UXXXXXXXX`.
pub fn unescape(text: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('u') => out.push(decode_codepoint(&mut chars, 4)?),
            Some('U') => out.push(decode_codepoint(&mut chars, 8)?),
            Some(other) => return Err(format!("invalid escape sequence '\\{other}'")),
            None => return Err("trailing backslash".to_string()),
        }
    }
    Ok(out)
}

fn decode_codepoint(
    chars: &mut std::str::Chars<'_>,
    digits: usize,
) -> std::result::Result<char, String> {
    let hex: String = chars.take(digits).collect();
    if hex.len() != digits {
        return Err(format!("truncated \\u escape '{hex}'"));
    }
    let code = u32::from_str_radix(&hex, 16).map_err(|_| format!("invalid \\u escape '{hex}'"))?;
    char::from_u32(code).ok_or_else(|| format!("invalid codepoint U+{code:X}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iri_rendering() {
        assert_eq!(Term::iri("http://example.org/s").n3(), "<http://example.org/s>");
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Term::literal("hello").n3(), "\"hello\"");
        assert_eq!(Term::literal_lang("hello", "en").n3(), "\"hello\"@en");
        assert_eq!(
            Term::literal_typed("1", "http://www.w3.org/2001/XMLSchema#integer").n3(),
            "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn test_literal_escapes() {
        assert_eq!(Term::literal("say \"hi\"").n3(), "\"say \\\"hi\\\"\"");
        assert_eq!(Term::literal("a\nb").n3(), "\"a\\nb\"");
        assert_eq!(Term::literal("back\\slash").n3(), "\"back\\\\slash\"");
        assert_eq!(Term::literal("tab\there").n3(), "\"tab\\u0009here\"");
        assert_eq!(Term::literal("caf\u{e9}").n3(), "\"caf\\u00E9\"");
        assert_eq!(Term::literal("\u{1F600}").n3(), "\"\\U0001F600\"");
    }

    #[test]
    fn test_blank_node_rendering_and_skolemization() {
        let b = Term::blank("b0");
        assert_eq!(b.n3(), "_:b0");
        let skolemized = b.skolemize();
        assert_eq!(
            skolemized,
            Term::iri("http://networkedplanet.com/quince/.well-known/genid/b0")
        );
        // IRIs and literals are untouched
        assert_eq!(Term::iri("http://x/").skolemize(), Term::iri("http://x/"));
        assert_eq!(Term::literal("x").skolemize(), Term::literal("x"));
    }

    #[test]
    fn test_unescape_round_trip() {
        let original = "line one\nline \"two\" with \\ and caf\u{e9}";
        let escaped = escape_literal(original);
        assert_eq!(unescape(&escaped).unwrap(), original);
    }

    #[test]
    fn test_unescape_codepoints() {
        assert_eq!(unescape("\\u00E9").unwrap(), "\u{e9}");
        assert_eq!(unescape("\\U0001F600").unwrap(), "\u{1F600}");
        assert!(unescape("\\u00").is_err());
        assert!(unescape("\\q").is_err());
        assert!(unescape("dangling\\").is_err());
    }
}
