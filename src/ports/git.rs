//! Process-backed `GitPort` using the `git` CLI

use super::GitPort;
use super::process::CommandRunner;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// `GitPort` that shells out to `git`
#[derive(Debug, Clone)]
pub struct GitCli {
    runner: CommandRunner,
}

impl GitCli {
    /// Create a port invoking the given git binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            runner: CommandRunner::new(program),
        }
    }

    /// Top-level directory of the repository containing `path`
    pub fn repo_root(&self, path: &Path) -> Result<PathBuf> {
        let root = self.runner.run(path, &["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(root.trim()))
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitPort for GitCli {
    fn current_branch(&self, repo_root: &Path) -> Result<Option<String>> {
        let name = self.runner.run(repo_root, &["branch", "--show-current"])?;
        let name = name.trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }

    fn checkout(&self, repo_root: &Path, branch: &str) -> Result<()> {
        self.runner.run(repo_root, &["checkout", branch])?;
        Ok(())
    }

    fn fetch(&self, repo_root: &Path, remote: &str, branch: &str) -> Result<()> {
        self.runner.run(repo_root, &["fetch", remote, branch])?;
        Ok(())
    }

    fn pull_ff_only(&self, repo_root: &Path, remote: &str, branch: &str) -> Result<()> {
        self.runner
            .run(repo_root, &["pull", "--ff-only", remote, branch])?;
        Ok(())
    }

    fn commit_sha(&self, repo_root: &Path, reference: &str) -> Result<String> {
        let rev = format!("{reference}^{{commit}}");
        let sha = self
            .runner
            .run(repo_root, &["rev-parse", "--verify", "--quiet", &rev])
            .map_err(|_| Error::BranchNotFound(reference.to_string()))?;
        Ok(sha.trim().to_string())
    }

    fn commits_ahead(&self, repo_root: &Path, base: &str) -> Result<u32> {
        let range = format!("{base}..HEAD");
        let count = self
            .runner
            .run(repo_root, &["rev-list", "--count", &range])?;
        count.trim().parse().map_err(|e| {
            Error::Internal(format!("unexpected `rev-list --count` output '{count}': {e}"))
        })
    }

    fn conflicted_files(&self, repo_root: &Path) -> Result<Vec<String>> {
        let out = self
            .runner
            .run(repo_root, &["diff", "--name-only", "--diff-filter=U"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}
