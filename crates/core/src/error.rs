//! Error taxonomy for the quad store and its update pipeline.
//!
//! Everything user-facing funnels through [`QuinceError`]; the CLI maps each
//! variant to a message and an exit code.

use thiserror::Error;

use crate::sink::UpdateMode;
use crate::term::Term;

pub type Result<T> = std::result::Result<T, QuinceError>;

#[derive(Debug, Error)]
pub enum QuinceError {
    /// A source file (or URL) could not be parsed as RDF.
    #[error("error parsing '{source_name}'. Parser reports: {message}")]
    Parse { source_name: String, message: String },

    /// No parser is registered for the file's extension.
    #[error("no parser available for the file {0}")]
    NoParser(String),

    /// No serializer is registered for the requested output format.
    #[error("no serializer available for the format '{0}'")]
    NoSerializer(String),

    /// An `Exists`/`NotExists` sink saw a quad that violated its expectation.
    #[error("precondition failed: {mode} for {subject} {predicate} {object} {graph}",
        subject = .subject.n3(), predicate = .predicate.n3(), object = .object.n3(), graph = .graph.n3())]
    PreconditionFailed {
        mode: UpdateMode,
        subject: Term,
        predicate: Term,
        object: Term,
        graph: Term,
    },

    #[error("a mapping already exists for the namespace prefix \"{0}\"")]
    NamespaceExists(String),

    #[error("no namespace mapping found for the prefix \"{0}\"")]
    NoSuchNamespace(String),

    #[error("a remote with the name \"{0}\" already exists")]
    RemoteExists(String),

    #[error("no remote with the name \"{0}\"")]
    NoSuchRemote(String),

    /// A single CLI position failed to parse as a term.
    #[error("{0}")]
    Argument(String),

    /// Several positions failed at once; carries every inner error so the
    /// user sees all problems in one pass.
    #[error("multiple errors were raised")]
    Multi(Vec<QuinceError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Git(#[from] git2::Error),
}

impl QuinceError {
    /// Flatten this error into its user-visible messages, one per inner
    /// error for [`QuinceError::Multi`], a single message otherwise.
    pub fn messages(&self) -> Vec<String> {
        match self {
            QuinceError::Multi(inner) => inner.iter().flat_map(|e| e.messages()).collect(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_error_flattens_messages() {
        let err = QuinceError::Multi(vec![
            QuinceError::Argument("first".into()),
            QuinceError::Argument("second".into()),
        ]);
        assert_eq!(err.messages(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_single_error_message() {
        let err = QuinceError::NoSuchNamespace("foaf".into());
        assert_eq!(err.messages().len(), 1);
        assert!(err.messages()[0].contains("foaf"));
    }
}
