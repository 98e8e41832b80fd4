//! The adapter between the parser and the store: a sink carries an update
//! mode and dispatches each parsed triple or quad accordingly.
//!
//! `Exists`/`NotExists` turn the sink into a precondition checker; failures
//! either raise immediately or accumulate for inspection after the whole
//! source has been processed, so bulk loads don't abort on the first
//! mismatch.

use std::fmt;

use crate::error::{QuinceError, Result};
use crate::store::QuinceStore;
use crate::term::{Term, TermPattern};

/// What receiving a quad means to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Assert,
    Retract,
    Exists,
    NotExists,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpdateMode::Assert => "assert",
            UpdateMode::Retract => "retract",
            UpdateMode::Exists => "exists",
            UpdateMode::NotExists => "not-exists",
        };
        f.write_str(label)
    }
}

/// Receiver for parsed statements.
pub trait QuadSink {
    fn triple(&mut self, s: Term, p: Term, o: Term) -> Result<()>;
    fn quad(&mut self, s: Term, p: Term, o: Term, g: Term) -> Result<()>;
}

/// A quad that violated an `Exists`/`NotExists` expectation.
#[derive(Debug, Clone)]
pub struct FailedPrecondition {
    pub mode: UpdateMode,
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Term,
}

/// Mode-dispatched sink over a [`QuinceStore`].
pub struct UpdateSink<'a> {
    store: &'a mut QuinceStore,
    mode: UpdateMode,
    throw_on_failed_precondition: bool,
    failed_preconditions: Vec<FailedPrecondition>,
}

impl<'a> UpdateSink<'a> {
    pub fn new(store: &'a mut QuinceStore, mode: UpdateMode) -> Self {
        UpdateSink {
            store,
            mode,
            throw_on_failed_precondition: false,
            failed_preconditions: Vec::new(),
        }
    }

    /// Raise on the first failed precondition instead of accumulating.
    pub fn throw_on_failed_precondition(mut self, throw: bool) -> Self {
        self.throw_on_failed_precondition = throw;
        self
    }

    pub fn failed_preconditions(&self) -> &[FailedPrecondition] {
        &self.failed_preconditions
    }

    fn apply(&mut self, s: Term, p: Term, o: Term, g: Option<Term>) -> Result<()> {
        match self.mode {
            UpdateMode::Assert => self.store.assert_quad(&s, &p, &o, g.as_ref()),
            UpdateMode::Retract => {
                let graph: Option<TermPattern> = g.map(Into::into);
                self.store
                    .retract_quad(&s.into(), &p.into(), &o.into(), graph.as_ref())
                    .map(|_| ())
            }
            UpdateMode::Exists => {
                let graph: Option<TermPattern> = g.clone().map(Into::into);
                let matches = self.store.exists(
                    &s.clone().into(),
                    &p.clone().into(),
                    &o.clone().into(),
                    graph.as_ref(),
                )?;
                if matches.is_empty() {
                    self.failed_precondition(s, p, o, g)?;
                }
                Ok(())
            }
            UpdateMode::NotExists => {
                let graph: Option<TermPattern> = g.clone().map(Into::into);
                let matches = self.store.exists(
                    &s.clone().into(),
                    &p.clone().into(),
                    &o.clone().into(),
                    graph.as_ref(),
                )?;
                if !matches.is_empty() {
                    self.failed_precondition(s, p, o, g)?;
                }
                Ok(())
            }
        }
    }

    fn failed_precondition(&mut self, s: Term, p: Term, o: Term, g: Option<Term>) -> Result<()> {
        let graph = g.unwrap_or_else(|| self.store.default_graph().clone());
        if self.throw_on_failed_precondition {
            return Err(QuinceError::PreconditionFailed {
                mode: self.mode,
                subject: s,
                predicate: p,
                object: o,
                graph,
            });
        }
        self.failed_preconditions.push(FailedPrecondition {
            mode: self.mode,
            subject: s,
            predicate: p,
            object: o,
            graph,
        });
        Ok(())
    }
}

impl QuadSink for UpdateSink<'_> {
    fn triple(&mut self, s: Term, p: Term, o: Term) -> Result<()> {
        self.apply(s, p, o, None)
    }

    fn quad(&mut self, s: Term, p: Term, o: Term, g: Term) -> Result<()> {
        self.apply(s, p, o, Some(g))
    }
}
