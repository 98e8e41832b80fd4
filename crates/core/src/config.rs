//! Store configuration: the `.quince/config` INI document.
//!
//! Namespace prefix mappings live in a `[namespaces]` section and remote
//! endpoints in `[remote "<name>"]` sections. The file is read and written
//! through `git2::Config`, whose dialect is exactly this section/subsection
//! INI shape. Mutations are written through immediately.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use git2::ErrorCode;

use crate::error::{QuinceError, Result};

pub const CONFIG_FILE: &str = "config";

pub struct QuinceConfig {
    path: PathBuf,
    inner: git2::Config,
}

impl QuinceConfig {
    /// Open (creating if absent) the config file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        OpenOptions::new().create(true).append(true).open(path)?;
        let inner = git2::Config::open(path)?;
        Ok(QuinceConfig { path: path.to_path_buf(), inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -----------------------------------------------------------------------
    // Namespaces
    // -----------------------------------------------------------------------

    /// All prefix → IRI mappings, sorted by prefix.
    pub fn namespaces(&self) -> Result<BTreeMap<String, String>> {
        let mut mappings = BTreeMap::new();
        let mut entries = self.inner.entries(Some("^namespaces\\."))?;
        while let Some(entry) = entries.next() {
            let entry = entry?;
            if let (Some(name), Some(value)) = (entry.name(), entry.value()) {
                if let Some(prefix) = name.strip_prefix("namespaces.") {
                    mappings.insert(prefix.to_string(), value.to_string());
                }
            }
        }
        Ok(mappings)
    }

    /// Add a prefix mapping. Fails when the prefix is already mapped.
    pub fn add_namespace(&mut self, prefix: &str, iri: &str) -> Result<()> {
        let key = format!("namespaces.{prefix}");
        match self.inner.get_string(&key) {
            Ok(_) => Err(QuinceError::NamespaceExists(prefix.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => {
                self.inner.set_str(&key, strip_angles(iri))?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a prefix mapping. Fails when the prefix is not mapped.
    pub fn remove_namespace(&mut self, prefix: &str) -> Result<()> {
        let key = format!("namespaces.{prefix}");
        match self.inner.remove(&key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(QuinceError::NoSuchNamespace(prefix.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The IRI a prefix expands to.
    pub fn expand_prefix(&self, prefix: &str) -> Result<String> {
        let key = format!("namespaces.{prefix}");
        match self.inner.get_string(&key) {
            Ok(iri) => Ok(iri),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(QuinceError::NoSuchNamespace(prefix.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Remotes
    // -----------------------------------------------------------------------

    /// All remote name → endpoint pairs, sorted by name.
    pub fn remotes(&self) -> Result<BTreeMap<String, String>> {
        let mut remotes = BTreeMap::new();
        let mut entries = self.inner.entries(Some("^remote\\."))?;
        while let Some(entry) = entries.next() {
            let entry = entry?;
            if let (Some(name), Some(value)) = (entry.name(), entry.value()) {
                if let Some(rest) = name.strip_prefix("remote.") {
                    if let Some(remote) = rest.strip_suffix(".endpoint") {
                        remotes.insert(remote.to_string(), value.to_string());
                    }
                }
            }
        }
        Ok(remotes)
    }

    /// Track a new remote endpoint. Fails when the name is taken.
    pub fn add_remote(&mut self, name: &str, endpoint: &str) -> Result<()> {
        let key = format!("remote.{name}.endpoint");
        match self.inner.get_string(&key) {
            Ok(_) => Err(QuinceError::RemoteExists(name.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => {
                self.inner.set_str(&key, endpoint)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop tracking a remote. Fails when the name is unknown.
    pub fn remove_remote(&mut self, name: &str) -> Result<()> {
        let key = format!("remote.{name}.endpoint");
        match self.inner.remove(&key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(QuinceError::NoSuchRemote(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Namespace IRIs may be given with or without the `<>` delimiters.
fn strip_angles(iri: &str) -> &str {
    iri.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(iri)
}
