//! Test harness: a throwaway Quince repository inside a real Git working
//! tree, driven through the library API plus subprocess `git` for commits.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use quince_core::QuinceStore;
use tempfile::TempDir;

pub struct TestRepo {
    pub root: PathBuf,
    _temp_dir: TempDir,
}

impl TestRepo {
    /// An initialized Quince repository with the store committed empty.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().canonicalize().expect("canonicalize temp dir");
        quince_core::git::init(&root).expect("quince init failed");
        let repo = TestRepo { root, _temp_dir: temp_dir };
        repo.commit_all("Initial commit");
        repo
    }

    pub fn store(&self) -> QuinceStore {
        QuinceStore::open(&self.quince_dir(), None).expect("Failed to open store")
    }

    pub fn quince_dir(&self) -> PathBuf {
        self.root.join(".quince")
    }

    pub fn git(&self, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .expect("git failed to run");
        assert!(status.success(), "git {args:?} failed");
    }

    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&[
            "-c",
            "user.email=test@test.com",
            "-c",
            "user.name=Test",
            "commit",
            "--allow-empty",
            "-m",
            message,
        ]);
    }

    /// Flush the store and stage new shard files, as the CLI does after
    /// every mutating command.
    pub fn finish(&self, store: &mut QuinceStore) {
        store.flush().expect("flush failed");
        quince_core::git::add_untracked(&self.root).expect("staging failed");
    }
}

pub fn iri(value: &str) -> quince_core::Term {
    quince_core::Term::iri(value)
}

#[allow(dead_code)]
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("Failed to read file")
        .lines()
        .map(String::from)
        .collect()
}
