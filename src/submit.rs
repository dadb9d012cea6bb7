//! Submit one branch and read back its PR
//!
//! Submitting is a write to the host that becomes visible asynchronously. The
//! flow pushes through the stack tool, then polls for the PR on the standard
//! schedule; a PR that has not shown up yet is a soft success.

use crate::error::{Error, Result};
use crate::land::LandContext;
use crate::poll::PollOutcome;
use crate::ports::raw_message;
use crate::progress::ProgressCallback;
use crate::types::{PrLink, SubmitFlags};
use serde::Serialize;
use tracing::{debug, warn};

/// Options for submitting a branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Mark the PR ready for review
    pub publish: bool,
    /// Squash the branch to one commit first
    pub squash: bool,
    /// Restack before pushing
    pub restack: bool,
}

/// What a submit did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    /// Submitted branch
    pub branch: String,
    /// Whether commits were squashed before pushing
    pub squashed: bool,
    /// The PR, once the host reported it
    pub pr: Option<PrLink>,
    /// Reads that did not become visible and other soft failures
    pub warnings: Vec<String>,
}

/// Submit `branch` (default: the checked-out branch) (EFFECTFUL)
///
/// # Errors
/// Fails when the branch cannot be checked out or squashed, or the stack
/// tool's submit fails. Not finding the PR afterwards is not an error.
pub fn submit_branch(
    ctx: &LandContext<'_>,
    branch: Option<&str>,
    options: SubmitOptions,
    progress: &dyn ProgressCallback,
) -> Result<SubmitReport> {
    let git = ctx.ports.git;
    let graph = ctx.ports.graph;
    let host = ctx.ports.host;

    let current = git.current_branch(ctx.repo_root)?;
    let branch = match branch {
        Some(b) => b.to_string(),
        None => current.clone().ok_or(Error::DetachedHead)?,
    };
    if current.as_deref() != Some(branch.as_str()) {
        git.checkout(ctx.repo_root, &branch)?;
    }

    let mut report = SubmitReport {
        branch: branch.clone(),
        squashed: false,
        pr: None,
        warnings: Vec::new(),
    };

    if options.squash {
        let parent = graph
            .parent(ctx.repo_root, &branch)?
            .ok_or_else(|| Error::ParentUnknown(branch.clone()))?;
        let ahead = git.commits_ahead(ctx.repo_root, &parent)?;
        if ahead > 1 {
            progress.on_message(&format!("Squashing {ahead} commits on {branch}"));
            graph.squash(ctx.repo_root)?;
            report.squashed = true;
        } else {
            debug!(branch = %branch, ahead, "nothing to squash");
        }
    }

    progress.on_message(&format!("Submitting {branch}"));
    graph.submit(
        ctx.repo_root,
        &branch,
        SubmitFlags {
            publish: options.publish,
            restack: options.restack,
        },
    )?;

    let poller = ctx.standard_poller();
    match poller.poll("pr link", || host.pr_link(ctx.repo_root, &branch)) {
        PollOutcome::Found { value, retries } => {
            debug!(branch = %branch, pr_number = value.number, retries, "PR visible");
            report.pr = Some(value);
        }
        PollOutcome::NotYetVisible { attempts } => {
            let warning =
                format!("submitted {branch}, but its PR was not visible after {attempts} reads");
            warn!(branch = %branch, attempts, "PR not visible yet");
            progress.on_warning(&warning);
            report.warnings.push(warning);
        }
    }

    if options.publish {
        if let Some(pr) = &report.pr {
            if let Err(e) = host.mark_ready(ctx.repo_root, pr.number) {
                let warning = format!(
                    "could not mark PR #{} ready for review: {}",
                    pr.number,
                    raw_message(&e)
                );
                warn!(pr_number = pr.number, error = %e, "mark ready failed");
                progress.on_warning(&warning);
                report.warnings.push(warning);
            }
        }
    }

    Ok(report)
}
