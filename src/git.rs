use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Whether a `git` binary is reachable at all.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Wraps the `git` subprocess for one repository. The repository root is
/// held explicitly and every command runs against it, so no component ever
/// depends on the ambient working directory.
pub struct GitInspector {
    root: PathBuf,
}

impl GitInspector {
    /// Locate the repository containing `path`. Returns `None` rather than
    /// an error when `path` is not inside a git repository.
    pub fn discover(path: &Path) -> Option<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        Some(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable identifier for this clone, used to scope history entries.
    pub fn repo_id(&self) -> String {
        self.root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone())
            .display()
            .to_string()
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("failed to run git {}", args.join(" ")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        } else {
            Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    /// Diff of staged changes; empty string when nothing is staged.
    pub fn staged_diff(&self) -> String {
        self.run(&["diff", "--staged"]).unwrap_or_default()
    }

    /// Diff of all changes against HEAD; empty string when there are none
    /// (including the no-commits-yet case).
    pub fn all_diff(&self) -> String {
        self.run(&["diff", "HEAD"]).unwrap_or_default()
    }

    /// Untracked files in the order git reports them.
    pub fn untracked_files(&self) -> Vec<String> {
        self.run(&["ls-files", "--others", "--exclude-standard"])
            .map(|out| {
                out.lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn stage(&self, paths: &[String]) -> Result<()> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run(&args)
            .map(drop)
            .context("failed to stage files")
    }

    /// Commit with the given message; `all` passes `-a` so unstaged
    /// modifications to tracked files are included. Returns the new commit
    /// id. Fails when there is nothing to commit.
    pub fn commit(&self, message: &str, all: bool) -> Result<String> {
        let mut args = vec!["commit"];
        if all {
            args.push("-a");
        }
        args.push("-m");
        args.push(message);
        self.run(&args).context("commit failed")?;

        self.run(&["rev-parse", "HEAD"])
            .context("commit succeeded but HEAD could not be resolved")
    }

    /// Push the branch, setting its upstream. Git's own stderr is surfaced
    /// verbatim on failure.
    pub fn push(&self, branch: &str) -> Result<()> {
        self.run(&["push", "--set-upstream", "origin", branch])
            .map(drop)
            .context("push failed")
    }

    pub fn current_branch(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }
}
