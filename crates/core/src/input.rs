//! Parsing of user-supplied term arguments.
//!
//! Each position accepts, in order: a safe CURIE `[prefix:local]` expanded
//! through the store's namespace table, an absolute IRI, and — in object
//! position — a quoted literal with optional `^^<dt>` or `@lang`. The
//! assert/retract wrappers validate every position before failing, so the
//! user sees all problems in one pass.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{QuinceError, Result};
use crate::grammar;
use crate::term::{unescape, Term, TermPattern};

const CURIE_PATTERN: &str = r"^\[(?P<prefix>[^:]+):(?P<reference>[^\]]+)\]$";
const LITERAL_PATTERN: &str =
    r#"^"(?P<lit>[^"\\]*(?:\\.[^"\\]*)*)"(?:\^\^<(?P<dt>[^>]*)>)?(?:@(?P<lang>\S*))?$"#;

type Namespaces = BTreeMap<String, String>;

/// Parse the four concrete positions of an assert. Accumulates every
/// per-position failure into a single [`QuinceError::Multi`].
pub fn make_quad(
    namespaces: &Namespaces,
    subject: &str,
    predicate: &str,
    object: &str,
    graph: Option<&str>,
) -> Result<(Term, Term, Term, Option<Term>)> {
    let mut errors = Vec::new();
    let s = collect(&mut errors, make_node(subject, namespaces, false));
    let p = collect(&mut errors, make_node(predicate, namespaces, false));
    let o = collect(&mut errors, make_node(object, namespaces, true));
    let g = match graph {
        Some(g) => collect(&mut errors, make_node(g, namespaces, false)),
        None => None,
    };
    if !errors.is_empty() {
        return Err(QuinceError::Multi(errors));
    }
    match (s, p, o) {
        (Some(s), Some(p), Some(o)) => Ok((s, p, o, g)),
        _ => Err(QuinceError::Argument("missing quad position".to_string())),
    }
}

/// Parse the four positions of a retract, where any position may be the
/// `*` wildcard.
pub fn make_quad_pattern(
    namespaces: &Namespaces,
    subject: &str,
    predicate: &str,
    object: &str,
    graph: Option<&str>,
) -> Result<(TermPattern, TermPattern, TermPattern, Option<TermPattern>)> {
    let mut errors = Vec::new();
    let s = collect(&mut errors, make_position(subject, namespaces, false));
    let p = collect(&mut errors, make_position(predicate, namespaces, false));
    let o = collect(&mut errors, make_position(object, namespaces, true));
    let g = match graph {
        Some(g) => collect(&mut errors, make_position(g, namespaces, false)),
        None => None,
    };
    if !errors.is_empty() {
        return Err(QuinceError::Multi(errors));
    }
    match (s, p, o) {
        (Some(s), Some(p), Some(o)) => Ok((s, p, o, g)),
        _ => Err(QuinceError::Argument("missing quad position".to_string())),
    }
}

fn collect<T>(errors: &mut Vec<QuinceError>, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

fn make_position(value: &str, namespaces: &Namespaces, allow_literals: bool) -> Result<TermPattern> {
    if value == "*" {
        return Ok(TermPattern::Any);
    }
    make_node(value, namespaces, allow_literals).map(TermPattern::Concrete)
}

/// Resolve one position into a term, or an argument error naming the forms
/// that were tried.
pub fn make_node(value: &str, namespaces: &Namespaces, allow_literals: bool) -> Result<Term> {
    if allow_literals {
        if let Some(literal) = parse_literal(value) {
            return Ok(literal);
        }
    }
    match expand_iri(value, namespaces) {
        Some(term) => Ok(term),
        None if allow_literals => Err(QuinceError::Argument(format!(
            "could not parse \"{value}\" as a literal, safe CURIE or absolute IRI"
        ))),
        None => Err(QuinceError::Argument(format!(
            "could not parse \"{value}\" as a safe CURIE or absolute IRI"
        ))),
    }
}

/// Expand a safe CURIE through the namespace table, then validate the
/// result (or the raw input) as an absolute IRI.
fn expand_iri(value: &str, namespaces: &Namespaces) -> Option<Term> {
    let curie = Regex::new(CURIE_PATTERN).expect("curie regex is valid");
    let mut candidate = value.to_string();
    if let Some(caps) = curie.captures(value) {
        if let Some(expansion) = namespaces.get(&caps["prefix"]) {
            candidate = format!("{expansion}{}", &caps["reference"]);
        }
    }
    if grammar::absolute_iri_regex().is_match(&candidate) {
        Some(Term::iri(candidate))
    } else {
        None
    }
}

/// Parse a quoted literal. Escape sequences are decoded; a literal cannot
/// carry both a datatype and a language tag.
fn parse_literal(value: &str) -> Option<Term> {
    let literal = Regex::new(LITERAL_PATTERN).expect("literal regex is valid");
    let caps = literal.captures(value)?;
    let lexical = unescape(caps.name("lit")?.as_str()).ok()?;
    let datatype = caps.name("dt").map(|m| m.as_str().to_string());
    let language = caps.name("lang").map(|m| m.as_str().to_string());
    if datatype.is_some() && language.is_some() {
        return None;
    }
    Some(Term::Literal { lexical, language, datatype })
}
