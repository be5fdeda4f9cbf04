//! Git metadata extraction via the `git` CLI.
//!
//! Coveralls renders commit and branch details alongside coverage, but a
//! missing or broken repository must never sink a submission: every lookup
//! failure degrades to "no git metadata" with a log line.

use serde::Serialize;
use std::path::Path;
use std::process::Command;

/// HEAD commit details, shaped for the payload's `git.head` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitHead {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    pub message: String,
}

/// One configured remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRemote {
    pub name: String,
    pub url: String,
}

/// Repository metadata sent with the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitStats {
    pub head: GitHead,
    pub branch: String,
    pub remotes: Vec<GitRemote>,
}

/// Collect metadata for the repository at `repo_dir`.
///
/// Returns `None` when `repo_dir` is not a git work tree, has no commits,
/// or `git` itself is unavailable.
pub fn git_stats(repo_dir: &Path) -> Option<GitStats> {
    let inside = run_git(repo_dir, &["rev-parse", "--is-inside-work-tree"])?;
    if inside != "true" {
        tracing::debug!("{} is not inside a git work tree", repo_dir.display());
        return None;
    }

    let head = head_commit(repo_dir)?;
    let branch = resolve_branch(repo_dir);
    let remotes = remotes(repo_dir);
    Some(GitStats {
        head,
        branch,
        remotes,
    })
}

fn head_commit(repo_dir: &Path) -> Option<GitHead> {
    // Unit separator keeps multi-word fields intact without quoting games.
    let raw = run_git(
        repo_dir,
        &["log", "-1", "--format=%H%x1f%an%x1f%ae%x1f%cn%x1f%ce%x1f%s"],
    )?;
    let mut fields = raw.split('\x1f').map(str::to_string);
    Some(GitHead {
        id: fields.next()?,
        author_name: fields.next()?,
        author_email: fields.next()?,
        committer_name: fields.next()?,
        committer_email: fields.next()?,
        message: fields.next()?,
    })
}

/// Name the ref the submission ran from.
///
/// An attached HEAD reports its branch. A detached HEAD reports the tag
/// pointing at the commit when there is exactly one, then the branch
/// pointing at it when there is exactly one, and otherwise plain `HEAD`.
fn resolve_branch(repo_dir: &Path) -> String {
    if let Some(branch) = run_git(repo_dir, &["symbolic-ref", "--short", "--quiet", "HEAD"]) {
        return branch;
    }
    if let Some(tag) = unique_ref(repo_dir, &["tag", "--points-at", "HEAD"]) {
        return tag;
    }
    if let Some(branch) = unique_ref(
        repo_dir,
        &[
            "for-each-ref",
            "--points-at",
            "HEAD",
            "--format=%(refname:short)",
            "refs/heads",
        ],
    ) {
        return branch;
    }
    "HEAD".to_string()
}

fn unique_ref(repo_dir: &Path, args: &[&str]) -> Option<String> {
    let output = run_git(repo_dir, args)?;
    let mut lines = output.lines().filter(|line| !line.is_empty());
    let first = lines.next()?;
    if lines.next().is_some() {
        return None;
    }
    Some(first.to_string())
}

fn remotes(repo_dir: &Path) -> Vec<GitRemote> {
    let Some(names) = run_git(repo_dir, &["remote"]) else {
        return Vec::new();
    };
    names
        .lines()
        .filter(|name| !name.is_empty())
        .filter_map(|name| {
            let url = run_git(repo_dir, &["remote", "get-url", name])?;
            Some(GitRemote {
                name: name.to_string(),
                url,
            })
        })
        .collect()
}

/// Run git in `repo_dir`, returning trimmed stdout on success.
fn run_git(repo_dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(
            "git {} exited with {:?}",
            args.join(" "),
            output.status.code()
        );
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
