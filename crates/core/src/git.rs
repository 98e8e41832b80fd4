//! Git integration: repository discovery, store initialization, staging,
//! and unified-diff extraction over the `.quince` tree.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use git2::{Delta, DiffFormat, DiffOptions, Repository, Status, StatusOptions, Tree};
use tracing::debug;

use crate::error::{QuinceError, Result};

/// Name of the store directory inside the Git working tree.
pub const QUINCE_DIR: &str = ".quince";

const POST_MERGE_COMMAND: &str = "quince sort -s \"HEAD^\"";

/// Walk up from `start` to the enclosing Git working tree, if any.
pub fn find_working_tree(start: &Path) -> Option<PathBuf> {
    let repo = Repository::discover(start).ok()?;
    repo.workdir().map(Path::to_path_buf)
}

/// The `.quince` directory of the working tree enclosing `start`.
pub fn find_quince_dir(start: &Path) -> Option<PathBuf> {
    find_working_tree(start).map(|root| root.join(QUINCE_DIR))
}

#[derive(Debug, Clone, Copy)]
pub struct InitOutcome {
    pub created_repository: bool,
    pub created_store: bool,
}

/// Make `path` a Quince repository: create the Git repository when there is
/// none, create `.quince/` with an empty config file, and install the
/// post-merge hook that re-sorts merged quad files.
pub fn init(path: &Path) -> Result<InitOutcome> {
    let (repo, created_repository) = match Repository::discover(path) {
        Ok(repo) => (repo, false),
        Err(_) => (Repository::init(path)?, true),
    };

    let worktree = repo
        .workdir()
        .ok_or_else(|| QuinceError::Argument("cannot initialize a bare repository".to_string()))?
        .to_path_buf();

    let quince_dir = worktree.join(QUINCE_DIR);
    let created_store = !quince_dir.exists();
    fs::create_dir_all(&quince_dir)?;
    let config = quince_dir.join("config");
    if !config.exists() {
        fs::write(&config, "")?;
    }

    install_post_merge_hook(&repo)?;
    Ok(InitOutcome { created_repository, created_store })
}

/// Append (or create) the `post-merge` hook invoking the sort pass, so
/// every merge leaves the tree in canonical order for the next three-way
/// merge.
fn install_post_merge_hook(repo: &Repository) -> Result<()> {
    let hooks_dir = repo.path().join("hooks");
    fs::create_dir_all(&hooks_dir)?;
    let hook_path = hooks_dir.join("post-merge");

    let existing = match fs::read_to_string(&hook_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if existing.contains(POST_MERGE_COMMAND) {
        return Ok(());
    }

    let mut file = fs::OpenOptions::new().create(true).append(true).open(&hook_path)?;
    if existing.is_empty() {
        writeln!(file, "#!/bin/sh")?;
    }
    writeln!(file, "{POST_MERGE_COMMAND}")?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&hook_path, perms)?;
    }
    Ok(())
}

/// Stage every untracked path under `.quince/`, readying the working tree
/// to commit. Returns the number of newly staged files.
pub fn add_untracked(worktree: &Path) -> Result<usize> {
    let repo = Repository::open(worktree)?;
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true).pathspec(QUINCE_DIR);
    let statuses = repo.statuses(Some(&mut opts))?;

    let mut index = repo.index()?;
    let mut staged = 0;
    for entry in statuses.iter() {
        if !entry.status().contains(Status::WT_NEW) {
            continue;
        }
        if let Some(path) = entry.path() {
            index.add_path(Path::new(path))?;
            staged += 1;
        }
    }
    if staged > 0 {
        index.write()?;
        debug!(files = staged, "staged untracked store files");
    }
    Ok(staged)
}

/// Unified diff (patch text) over `.quince/**` for the given commit refs:
/// none diffs the working tree against HEAD, one against that commit, two
/// diff the commits against each other.
pub fn diff_patch(worktree: &Path, refs: &[String]) -> Result<String> {
    let repo = Repository::open(worktree)?;
    let mut opts = quince_diff_options();

    let diff = match refs {
        [] => repo.diff_tree_to_workdir_with_index(head_tree(&repo).as_ref(), Some(&mut opts))?,
        [commit] => {
            let tree = repo.revparse_single(commit)?.peel_to_tree()?;
            repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?
        }
        [old, new] => {
            let old_tree = repo.revparse_single(old)?.peel_to_tree()?;
            let new_tree = repo.revparse_single(new)?.peel_to_tree()?;
            repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?
        }
        _ => {
            return Err(QuinceError::Argument(
                "diff accepts at most two commit references".to_string(),
            ))
        }
    };

    let mut buf = Vec::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => buf.push(line.origin() as u8),
            _ => {}
        }
        buf.extend_from_slice(line.content());
        true
    })?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Quad files changed between HEAD (or `since`) and the working tree,
/// excluding deletions — the worklist of the incremental sort pass.
pub fn modified_quad_paths(worktree: &Path, since: Option<&str>) -> Result<Vec<PathBuf>> {
    let repo = Repository::open(worktree)?;
    let mut opts = quince_diff_options();

    let base = match since {
        Some(rev) => Some(repo.revparse_single(rev)?.peel_to_tree()?),
        None => head_tree(&repo),
    };
    let diff = repo.diff_tree_to_workdir_with_index(base.as_ref(), Some(&mut opts))?;

    let mut paths = Vec::new();
    for delta in diff.deltas() {
        if delta.status() == Delta::Deleted {
            continue;
        }
        if let Some(path) = delta.new_file().path() {
            if path.extension().map(|ext| ext == "nqo").unwrap_or(false) {
                paths.push(worktree.join(path));
            }
        }
    }
    paths.sort();
    Ok(paths)
}

fn quince_diff_options() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.pathspec(QUINCE_DIR)
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .show_untracked_content(true);
    opts
}

fn head_tree(repo: &Repository) -> Option<Tree<'_>> {
    repo.head().ok().and_then(|head| head.peel_to_tree().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_repository_store_and_hook() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = init(dir.path()).unwrap();
        assert!(outcome.created_repository);
        assert!(outcome.created_store);
        assert!(dir.path().join(".git").is_dir());
        assert!(dir.path().join(".quince/config").is_file());

        let hook = std::fs::read_to_string(dir.path().join(".git/hooks/post-merge")).unwrap();
        assert!(hook.starts_with("#!/bin/sh"));
        assert!(hook.contains("quince sort -s \"HEAD^\""));
    }

    #[test]
    fn test_init_adopts_existing_repository() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let outcome = init(dir.path()).unwrap();
        assert!(!outcome.created_repository);
        assert!(outcome.created_store);
    }

    #[test]
    fn test_init_is_idempotent_on_the_hook() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        init(dir.path()).unwrap();
        let hook = std::fs::read_to_string(dir.path().join(".git/hooks/post-merge")).unwrap();
        assert_eq!(hook.matches("quince sort").count(), 1);
    }

    #[test]
    fn test_find_working_tree_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let found = find_working_tree(&nested).unwrap();
        assert_eq!(found.canonicalize().unwrap(), dir.path().canonicalize().unwrap());
        assert!(find_quince_dir(&nested).unwrap().ends_with(".quince"));
    }

    #[test]
    fn test_add_untracked_stages_store_files_only() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        let shard_dir = dir.path().join(".quince/ab");
        std::fs::create_dir_all(&shard_dir).unwrap();
        std::fs::write(shard_dir.join("cafe.nqo"), "line\n").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let staged = add_untracked(dir.path()).unwrap();
        // config + the shard file; the file outside .quince is untouched
        assert_eq!(staged, 2);

        let repo = Repository::open(dir.path()).unwrap();
        let index = repo.index().unwrap();
        assert!(index.get_path(Path::new(".quince/ab/cafe.nqo"), 0).is_some());
        assert!(index.get_path(Path::new("unrelated.txt"), 0).is_none());
    }
}
