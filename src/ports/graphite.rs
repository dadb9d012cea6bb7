//! Process-backed `StackGraphPort` using the Graphite CLI (`gt`)
//!
//! `gt parent` / `gt children` only answer for the checked-out branch. Reads
//! about any other branch go to the per-branch metadata refs the tool keeps
//! under `refs/branch-metadata/`, so no read ever requires a checkout.

use super::StackGraphPort;
use super::process::CommandRunner;
use crate::error::Result;
use crate::types::SubmitFlags;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

const METADATA_PREFIX: &str = "refs/branch-metadata/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchMetadata {
    parent_branch_name: Option<String>,
}

/// `StackGraphPort` that shells out to `gt` (and `git` for metadata reads)
#[derive(Debug, Clone)]
pub struct GraphiteCli {
    gt: CommandRunner,
    git: CommandRunner,
    trunk: String,
}

impl GraphiteCli {
    /// Create a port invoking the given stack tool and git binaries
    pub fn new(program: impl Into<String>, git: impl Into<String>, trunk: impl Into<String>) -> Self {
        Self {
            gt: CommandRunner::new(program),
            git: CommandRunner::new(git),
            trunk: trunk.into(),
        }
    }

    fn current_branch(&self, repo_root: &Path) -> Result<Option<String>> {
        let name = self.git.run(repo_root, &["branch", "--show-current"])?;
        let name = name.trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }

    fn is_current(&self, repo_root: &Path, branch: &str) -> Result<bool> {
        Ok(self.current_branch(repo_root)?.as_deref() == Some(branch))
    }

    /// Parent recorded in the branch's metadata ref; `None` when untracked
    fn metadata_parent(&self, repo_root: &Path, branch: &str) -> Result<Option<String>> {
        let reference = format!("{METADATA_PREFIX}{branch}");
        let output = self.git.output(repo_root, &["cat-file", "-p", &reference])?;
        if !output.success {
            debug!(branch, "no stack metadata");
            return Ok(None);
        }
        let meta: BranchMetadata = serde_json::from_str(&output.stdout)?;
        Ok(meta.parent_branch_name.filter(|p| !p.is_empty()))
    }

    fn tracked_branches(&self, repo_root: &Path) -> Result<Vec<String>> {
        let out = self.git.run(
            repo_root,
            &[
                "for-each-ref",
                "--format=%(refname)",
                METADATA_PREFIX,
            ],
        )?;
        Ok(out
            .lines()
            .filter_map(|l| l.trim().strip_prefix(METADATA_PREFIX))
            .map(String::from)
            .collect())
    }

    /// Run `gt` on `branch`, switching to it first when necessary
    fn run_on_branch(&self, repo_root: &Path, branch: &str, args: &[&str]) -> Result<()> {
        let previous = self.current_branch(repo_root)?;
        let switch = previous.as_deref() != Some(branch);
        if switch {
            self.git.run(repo_root, &["checkout", branch])?;
        }

        let result = self.gt.run(repo_root, args).map(|_| ());

        match previous {
            Some(previous) if switch => {
                let restored = self.git.run(repo_root, &["checkout", &previous]).map(|_| ());
                first_error(result, restored, &previous)
            }
            _ => result,
        }
    }
}

/// Combine a command's result with the checkout that follows it
///
/// The command's own error wins; a failed restore is then only logged.
fn first_error(result: Result<()>, restored: Result<()>, previous: &str) -> Result<()> {
    match (result, restored) {
        (Err(e), Err(restore)) => {
            warn!(previous, error = %restore, "could not switch back after a failed command");
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn non_empty_lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

impl StackGraphPort for GraphiteCli {
    fn parent(&self, repo_root: &Path, branch: &str) -> Result<Option<String>> {
        if branch == self.trunk {
            return Ok(None);
        }
        if self.is_current(repo_root, branch)? {
            let out = self.gt.run(repo_root, &["parent"])?;
            return Ok(non_empty_lines(&out).into_iter().next());
        }
        self.metadata_parent(repo_root, branch)
    }

    fn children(&self, repo_root: &Path, branch: &str) -> Result<Vec<String>> {
        if self.is_current(repo_root, branch)? {
            let out = self.gt.run(repo_root, &["children"])?;
            return Ok(non_empty_lines(&out));
        }

        let mut children = Vec::new();
        for candidate in self.tracked_branches(repo_root)? {
            if self.metadata_parent(repo_root, &candidate)?.as_deref() == Some(branch) {
                children.push(candidate);
            }
        }
        Ok(children)
    }

    fn is_trunk(&self, _repo_root: &Path, branch: &str) -> Result<bool> {
        Ok(branch == self.trunk)
    }

    fn restack(&self, repo_root: &Path) -> Result<()> {
        self.gt.run(repo_root, &["restack", "--no-interactive"])?;
        Ok(())
    }

    fn submit(&self, repo_root: &Path, branch: &str, flags: SubmitFlags) -> Result<()> {
        let mut args = vec!["submit", "--no-edit", "--no-interactive"];
        if flags.publish {
            args.push("--publish");
        }
        if flags.restack {
            args.push("--restack");
        }
        self.run_on_branch(repo_root, branch, &args)
    }

    fn squash(&self, repo_root: &Path) -> Result<()> {
        self.gt.run(repo_root, &["squash", "--no-interactive"])?;
        Ok(())
    }

    fn sync(&self, repo_root: &Path) -> Result<()> {
        self.gt.run(repo_root, &["sync", "-f"])?;
        Ok(())
    }
}
