//! Dry-run wrappers: same interfaces, mutations described instead of executed
//!
//! Reads go to the wrapped port. Mutations are appended to a shared
//! [`DryRunJournal`] and never reach the wrapped port. The journal also keeps
//! just enough simulated state (checked-out branch, merged branches,
//! fast-forwarded refs) that later phases of a multi-branch preview read back
//! what the skipped mutations would have produced.

use super::{GitPort, HostPort, StackGraphPort};
use crate::error::Result;
use crate::types::{PrLink, PrStatus, SubmitFlags};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Shared record of what a dry run would have done
#[derive(Debug)]
pub struct DryRunJournal {
    trunk: String,
    remote: String,
    entries: RefCell<Vec<String>>,
    current_branch: RefCell<Option<String>>,
    merged: RefCell<BTreeSet<String>>,
    fast_forwarded: RefCell<BTreeSet<String>>,
}

impl DryRunJournal {
    /// Create an empty journal for a repository with the given trunk and remote
    pub fn new(trunk: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            trunk: trunk.into(),
            remote: remote.into(),
            entries: RefCell::new(Vec::new()),
            current_branch: RefCell::new(None),
            merged: RefCell::new(BTreeSet::new()),
            fast_forwarded: RefCell::new(BTreeSet::new()),
        }
    }

    /// Descriptions of every skipped mutation, in order
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Whether nothing would have been mutated
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn record(&self, description: String) {
        info!(action = %description, "dry run");
        self.entries.borrow_mut().push(description);
    }

    fn is_merged(&self, branch: &str) -> bool {
        self.merged.borrow().contains(branch)
    }
}

/// `GitPort` wrapper for dry runs
pub struct DryRunGit<'a, G> {
    inner: G,
    journal: &'a DryRunJournal,
}

impl<'a, G: GitPort> DryRunGit<'a, G> {
    /// Wrap `inner`, recording into `journal`
    pub const fn new(inner: G, journal: &'a DryRunJournal) -> Self {
        Self { inner, journal }
    }
}

impl<G: GitPort> GitPort for DryRunGit<'_, G> {
    fn current_branch(&self, repo_root: &Path) -> Result<Option<String>> {
        if let Some(branch) = self.journal.current_branch.borrow().clone() {
            return Ok(Some(branch));
        }
        // First live read seeds the simulation
        let branch = self.inner.current_branch(repo_root)?;
        self.journal.current_branch.borrow_mut().clone_from(&branch);
        Ok(branch)
    }

    fn checkout(&self, _repo_root: &Path, branch: &str) -> Result<()> {
        self.journal.record(format!("checkout {branch}"));
        *self.journal.current_branch.borrow_mut() = Some(branch.to_string());
        Ok(())
    }

    fn fetch(&self, _repo_root: &Path, remote: &str, branch: &str) -> Result<()> {
        self.journal.record(format!("fetch {remote} {branch}"));
        Ok(())
    }

    fn pull_ff_only(&self, _repo_root: &Path, remote: &str, branch: &str) -> Result<()> {
        self.journal
            .record(format!("fast-forward {branch} from {remote}/{branch}"));
        self.journal
            .fast_forwarded
            .borrow_mut()
            .insert(branch.to_string());
        Ok(())
    }

    fn commit_sha(&self, repo_root: &Path, reference: &str) -> Result<String> {
        if self.journal.fast_forwarded.borrow().contains(reference) {
            let remote_ref = format!("{}/{reference}", self.journal.remote);
            return self.inner.commit_sha(repo_root, &remote_ref);
        }
        self.inner.commit_sha(repo_root, reference)
    }

    fn commits_ahead(&self, repo_root: &Path, base: &str) -> Result<u32> {
        self.inner.commits_ahead(repo_root, base)
    }

    fn conflicted_files(&self, repo_root: &Path) -> Result<Vec<String>> {
        self.inner.conflicted_files(repo_root)
    }
}

/// `StackGraphPort` wrapper for dry runs
pub struct DryRunStackGraph<'a, S> {
    inner: S,
    journal: &'a DryRunJournal,
}

impl<'a, S: StackGraphPort> DryRunStackGraph<'a, S> {
    /// Wrap `inner`, recording into `journal`
    pub const fn new(inner: S, journal: &'a DryRunJournal) -> Self {
        Self { inner, journal }
    }
}

impl<S: StackGraphPort> StackGraphPort for DryRunStackGraph<'_, S> {
    fn parent(&self, repo_root: &Path, branch: &str) -> Result<Option<String>> {
        let parent = self.inner.parent(repo_root, branch)?;
        // A restack would have moved children of merged branches onto trunk
        Ok(parent.map(|p| {
            if self.journal.is_merged(&p) {
                self.journal.trunk.clone()
            } else {
                p
            }
        }))
    }

    fn children(&self, repo_root: &Path, branch: &str) -> Result<Vec<String>> {
        let mut children: Vec<String> = self
            .inner
            .children(repo_root, branch)?
            .into_iter()
            .filter(|c| !self.journal.is_merged(c))
            .collect();

        if branch == self.journal.trunk {
            let merged: Vec<String> = self.journal.merged.borrow().iter().cloned().collect();
            for landed in merged {
                for child in self.inner.children(repo_root, &landed)? {
                    if !self.journal.is_merged(&child) && !children.contains(&child) {
                        children.push(child);
                    }
                }
            }
        }
        Ok(children)
    }

    fn is_trunk(&self, repo_root: &Path, branch: &str) -> Result<bool> {
        self.inner.is_trunk(repo_root, branch)
    }

    fn restack(&self, _repo_root: &Path) -> Result<()> {
        self.journal.record("restack all tracked branches".to_string());
        Ok(())
    }

    fn submit(&self, _repo_root: &Path, branch: &str, flags: SubmitFlags) -> Result<()> {
        let mut description = format!("submit {branch} (force-push)");
        if flags.publish {
            description.push_str(" and publish");
        }
        if flags.restack {
            description.push_str(" after restacking");
        }
        self.journal.record(description);
        Ok(())
    }

    fn squash(&self, _repo_root: &Path) -> Result<()> {
        self.journal
            .record("squash commits on the current branch".to_string());
        Ok(())
    }

    fn sync(&self, _repo_root: &Path) -> Result<()> {
        self.journal
            .record("sync and delete merged branches".to_string());
        Ok(())
    }
}

/// `HostPort` wrapper for dry runs
pub struct DryRunHost<'a, H> {
    inner: H,
    journal: &'a DryRunJournal,
}

impl<'a, H: HostPort> DryRunHost<'a, H> {
    /// Wrap `inner`, recording into `journal`
    pub const fn new(inner: H, journal: &'a DryRunJournal) -> Self {
        Self { inner, journal }
    }
}

impl<H: HostPort> HostPort for DryRunHost<'_, H> {
    fn merge_pr(&self, _repo_root: &Path, pr_number: u64) -> Result<()> {
        self.journal.record(format!("squash-merge PR #{pr_number}"));
        let current = self.journal.current_branch.borrow().clone();
        if let Some(branch) = current {
            self.journal.merged.borrow_mut().insert(branch);
        }
        Ok(())
    }

    fn pr_status(&self, repo_root: &Path, branch: &str) -> Result<Option<PrStatus>> {
        self.inner.pr_status(repo_root, branch)
    }

    fn pr_link(&self, repo_root: &Path, branch: &str) -> Result<Option<PrLink>> {
        self.inner.pr_link(repo_root, branch)
    }

    fn pr_base(&self, repo_root: &Path, pr_number: u64) -> Result<String> {
        self.inner.pr_base(repo_root, pr_number)
    }

    fn edit_pr_base(&self, _repo_root: &Path, pr_number: u64, base: &str) -> Result<()> {
        self.journal
            .record(format!("change base of PR #{pr_number} to {base}"));
        Ok(())
    }

    fn mark_ready(&self, _repo_root: &Path, pr_number: u64) -> Result<()> {
        self.journal
            .record(format!("mark PR #{pr_number} ready for review"));
        Ok(())
    }
}
