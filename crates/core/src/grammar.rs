//! Line grammar shared across the store: the regex fragments matching an
//! IRI, a literal, and a whole NQuad line.
//!
//! The pattern matcher, the serializers, and the diff filter all compose
//! from these fragments — one source of truth, so they cannot drift.

use regex::Regex;

/// An N3-rendered IRI: `<...>`.
pub const IRI_MATCH: &str = r"<[^>]*>";

/// An N3-rendered literal, with optional datatype or language tag.
pub const LITERAL_MATCH: &str =
    r#""[^"\\]*(?:\\.[^"\\]*)*"(?:\^\^<[^>]*>)?(?:@[^\s]*)?"#;

/// RFC 3987 IRI shape: a scheme, a colon, then anything that is not
/// whitespace, a control character, or an N3 delimiter. Scheme-less
/// strings fail, which is what rejects bare words at the CLI surface.
pub const ABSOLUTE_IRI: &str = r#"[A-Za-z][A-Za-z0-9+.\-]*:[^\x00-\x20<>"{}|^`\\]*"#;

/// An object position: IRI or literal, grouped so the alternation composes.
pub fn iri_or_literal_match() -> String {
    format!("(?:{IRI_MATCH}|{LITERAL_MATCH})")
}

/// Regex over a whole canonical NQuad line, with named captures for the
/// four positions. Tolerates (and consumes) a trailing newline.
pub fn nquad_line_regex() -> Regex {
    let pattern = format!(
        r"^(?P<s>{iri})\s+(?P<p>{iri})\s+(?P<o>{obj})\s+(?P<g>{iri})\s*\.\s*$",
        iri = IRI_MATCH,
        obj = iri_or_literal_match(),
    );
    Regex::new(&pattern).expect("nquad line regex is valid")
}

/// Anchored RFC 3987 rule used to validate CLI-supplied IRIs.
pub fn absolute_iri_regex() -> Regex {
    Regex::new(&format!("^(?:{ABSOLUTE_IRI})$")).expect("absolute IRI regex is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(fragment: &str) -> Regex {
        Regex::new(&format!("^(?:{fragment})$")).unwrap()
    }

    #[test]
    fn test_iri_match() {
        let re = full(IRI_MATCH);
        assert!(re.is_match("<http://example.org/s>"));
        assert!(!re.is_match("http://example.org/s"));
        assert!(!re.is_match("\"hello\""));
    }

    #[test]
    fn test_literal_match() {
        let re = full(LITERAL_MATCH);
        assert!(re.is_match("\"hello\""));
        assert!(re.is_match("\"hello\"^^<http://www.w3.org/2001/XMLSchema#string>"));
        assert!(re.is_match("\"hello\"@en"));
        assert!(re.is_match("\"bonjour\"@fr-be"));
        assert!(re.is_match("\"hello \\\"world\\\"\""));
        assert!(re.is_match(
            "\"This is a multi-line\\nliteral with many quotes(\\\"\\\"\\\"\\\")\\nand two apostrophes ('').\""
        ));
        assert!(!re.is_match("hello"));
        assert!(!re.is_match("<http://example.org/s>"));
    }

    #[test]
    fn test_nquad_line_regex_captures() {
        let re = nquad_line_regex();
        let caps = re
            .captures("<http://x/s> <http://x/p> \"v\"@en <http://x/g> .\n")
            .unwrap();
        assert_eq!(&caps["s"], "<http://x/s>");
        assert_eq!(&caps["p"], "<http://x/p>");
        assert_eq!(&caps["o"], "\"v\"@en");
        assert_eq!(&caps["g"], "<http://x/g>");
    }

    #[test]
    fn test_nquad_line_regex_rejects_triples() {
        let re = nquad_line_regex();
        assert!(!re.is_match("<http://x/s> <http://x/p> <http://x/o> ."));
        assert!(!re.is_match("not a quad at all"));
    }

    #[test]
    fn test_absolute_iri() {
        let re = absolute_iri_regex();
        assert!(re.is_match("http://example.org/s"));
        assert!(re.is_match("urn:uuid:1234"));
        assert!(re.is_match("http://www.w3.org/2001/XMLSchema#string"));
        assert!(!re.is_match("hello"));
        assert!(!re.is_match("not an iri"));
        assert!(!re.is_match("\"hello\""));
    }
}
