//! Narrow interfaces to the three external systems the engine coordinates
//!
//! ```text
//!                 ┌──────────────┐
//!                 │  land::*     │
//!                 └──┬────┬────┬─┘
//!          GitPort   │    │    │   HostPort
//!        ┌───────────┘    │    └───────────┐
//!        v          StackGraphPort         v
//!   GitCli / DryRunGit    │        GitHubCli / DryRunHost
//!                         v
//!              GraphiteCli / DryRunStackGraph
//! ```
//!
//! The engine depends only on these traits. Process-backed implementations
//! shell out to `git`, the stack tool, and the host CLI; the dry-run wrappers
//! record mutations instead of executing them.

mod dry_run;
mod git;
mod github;
mod graphite;
mod process;

pub use dry_run::{DryRunGit, DryRunHost, DryRunJournal, DryRunStackGraph};
pub use git::GitCli;
pub use github::GitHubCli;
pub use graphite::GraphiteCli;
pub use process::CommandRunner;
pub(crate) use process::raw_message;

use crate::error::Result;
use crate::types::{PrLink, PrStatus, SubmitFlags};
use std::path::Path;

/// Primitive local git operations
///
/// Every method takes the repository root explicitly; nothing relies on the
/// process's current directory.
pub trait GitPort {
    /// Currently checked-out branch (`None` when HEAD is detached)
    fn current_branch(&self, repo_root: &Path) -> Result<Option<String>>;

    /// Check out an existing branch
    fn checkout(&self, repo_root: &Path, branch: &str) -> Result<()>;

    /// Fetch a single branch from a remote
    fn fetch(&self, repo_root: &Path, remote: &str, branch: &str) -> Result<()>;

    /// Pull a branch, refusing anything but a fast-forward
    fn pull_ff_only(&self, repo_root: &Path, remote: &str, branch: &str) -> Result<()>;

    /// Commit SHA a ref resolves to
    fn commit_sha(&self, repo_root: &Path, reference: &str) -> Result<String>;

    /// Number of commits on HEAD that are not on `base`
    fn commits_ahead(&self, repo_root: &Path, base: &str) -> Result<u32>;

    /// Paths currently in a conflicted state
    fn conflicted_files(&self, repo_root: &Path) -> Result<Vec<String>>;
}

/// Stack metadata: which branch is stacked on which
pub trait StackGraphPort {
    /// Parent of `branch` (`None` for trunk or untracked branches)
    fn parent(&self, repo_root: &Path, branch: &str) -> Result<Option<String>>;

    /// Direct children of `branch`
    fn children(&self, repo_root: &Path, branch: &str) -> Result<Vec<String>>;

    /// Whether `branch` is the trunk
    fn is_trunk(&self, repo_root: &Path, branch: &str) -> Result<bool>;

    /// Rebase every tracked branch onto its parent's tip.
    ///
    /// Branches whose parent has been merged into trunk end up parented on
    /// trunk. Treated as atomic: on error nothing about the graph is assumed.
    fn restack(&self, repo_root: &Path) -> Result<()>;

    /// Force-push `branch` and create or update its PR
    fn submit(&self, repo_root: &Path, branch: &str, flags: SubmitFlags) -> Result<()>;

    /// Squash the checked-out branch's commits into one
    fn squash(&self, repo_root: &Path) -> Result<()>;

    /// Sync with the remote and delete branches whose PRs are merged
    fn sync(&self, repo_root: &Path) -> Result<()>;
}

/// Pull-request operations against the code host
pub trait HostPort {
    /// Squash-merge a PR
    fn merge_pr(&self, repo_root: &Path, pr_number: u64) -> Result<()>;

    /// Number and state of the PR whose head is `branch`, if any
    fn pr_status(&self, repo_root: &Path, branch: &str) -> Result<Option<PrStatus>>;

    /// Number and URL of the PR whose head is `branch`, if any
    fn pr_link(&self, repo_root: &Path, branch: &str) -> Result<Option<PrLink>>;

    /// Base branch the host has on file for a PR
    fn pr_base(&self, repo_root: &Path, pr_number: u64) -> Result<String>;

    /// Change a PR's base branch
    fn edit_pr_base(&self, repo_root: &Path, pr_number: u64, base: &str) -> Result<()>;

    /// Mark a draft PR ready for review
    fn mark_ready(&self, repo_root: &Path, pr_number: u64) -> Result<()>;
}
