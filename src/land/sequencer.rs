//! Landing sequencer - effectful
//!
//! Lands a segment one branch at a time. Each branch is a transaction of
//! ordered phases; the first failing phase ends the whole run, branches
//! already landed stay landed, and every later branch is reported as skipped.

use super::LandContext;
use super::cascade::{CascadeReport, repair_cascade};
use crate::error::{Error, Result};
use crate::ports::raw_message;
use crate::progress::ProgressCallback;
use crate::types::{BranchPr, LandingOutcome, LandingPhase, LandingResult, PrState};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Options for a landing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandOptions {
    /// Restack and repair descendants after each landing
    pub restack: bool,
}

impl Default for LandOptions {
    fn default() -> Self {
        Self { restack: true }
    }
}

/// Everything that happened during one landing run
#[derive(Debug, Default)]
pub struct LandingReport {
    /// One outcome per segment branch, in segment order
    pub outcomes: Vec<LandingOutcome>,
    /// Cascade repair performed after each landed branch
    pub cascades: Vec<CascadeReport>,
    /// The error that stopped the run, if any
    pub failure: Option<Error>,
}

impl LandingReport {
    /// Check if every branch landed
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Branches that landed, in order
    pub fn landed_branches(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result == LandingResult::Landed)
            .map(|o| o.branch.as_str())
            .collect()
    }

    /// Last branch that landed
    pub fn last_landed(&self) -> Option<&str> {
        self.landed_branches().last().copied()
    }

    /// Convert into an error if the run stopped early
    pub fn into_result(mut self) -> Result<Self> {
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

/// Where the working copy was left after a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Navigation {
    /// Checked out trunk (nothing left above the landed branch)
    Trunk,
    /// Checked out the single next branch up the stack
    Child {
        /// Checked-out branch
        branch: String,
    },
    /// Several branches sat on the landed branch; checked out trunk instead
    Ambiguous {
        /// Last landed branch
        landed: String,
        /// Candidates, in stack-graph order
        children: Vec<String>,
    },
}

/// Land every branch of `segment` in order (EFFECTFUL)
///
/// Never returns early with an error: a failure is recorded in the report
/// together with an outcome for every branch of the segment.
pub fn land_segment(
    ctx: &LandContext<'_>,
    segment: &[BranchPr],
    options: LandOptions,
    progress: &dyn ProgressCallback,
) -> LandingReport {
    let mut report = LandingReport::default();

    if let Err(e) = validate_options(segment, options) {
        for item in segment {
            report
                .outcomes
                .push(LandingOutcome::skipped(&item.branch, format!("not attempted: {e}")));
        }
        report.failure = Some(e);
        return report;
    }

    let mut landed_in_run: Vec<String> = Vec::new();

    for (index, item) in segment.iter().enumerate() {
        let mut merged = false;
        match land_branch(ctx, item, options, &landed_in_run, progress, &mut merged) {
            Ok(cascade) => {
                info!(branch = %item.branch, pr_number = item.pr_number, "landed");
                report.outcomes.push(LandingOutcome::landed(&item.branch));
                landed_in_run.push(item.branch.clone());
                if let Some(cascade) = cascade {
                    report.cascades.push(cascade);
                }
            }
            Err(e) => {
                warn!(branch = %item.branch, kind = e.kind(), error = %e, "landing stopped");
                let outcome = if merged {
                    LandingOutcome::landed_with(&item.branch, format!("merged, but {e}"))
                } else {
                    LandingOutcome::failed(&item.branch, e.to_string())
                };
                report.outcomes.push(outcome);
                for rest in &segment[index + 1..] {
                    report.outcomes.push(LandingOutcome::skipped(
                        &rest.branch,
                        format!("not attempted: {} did not complete", item.branch),
                    ));
                }
                report.failure = Some(e);
                break;
            }
        }
    }

    report
}

fn validate_options(segment: &[BranchPr], options: LandOptions) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::InvalidOptions("nothing to land".to_string()));
    }
    if !options.restack && segment.len() > 1 {
        return Err(Error::InvalidOptions(
            "landing more than one branch requires restacking between them".to_string(),
        ));
    }
    Ok(())
}

/// One landing transaction
///
/// Sets `merged` as soon as the host accepted the merge, so the caller can
/// tell "failed" from "landed but a later phase failed".
fn land_branch(
    ctx: &LandContext<'_>,
    item: &BranchPr,
    options: LandOptions,
    landed_before: &[String],
    progress: &dyn ProgressCallback,
    merged: &mut bool,
) -> Result<Option<CascadeReport>> {
    let branch = item.branch.as_str();
    let git = ctx.ports.git;
    let graph = ctx.ports.graph;

    progress.on_phase(branch, LandingPhase::Checkout);
    if git.current_branch(ctx.repo_root)?.as_deref() == Some(branch) {
        debug!(branch, "already checked out");
    } else {
        git.checkout(ctx.repo_root, branch)?;
    }

    progress.on_phase(branch, LandingPhase::VerifyTrunkAdjacency);
    let pr_number = verify_trunk_adjacency(ctx, item)?;

    progress.on_phase(branch, LandingPhase::Merge);
    ctx.ports
        .host
        .merge_pr(ctx.repo_root, pr_number)
        .map_err(|e| Error::MergeFailed {
            branch: branch.to_string(),
            pr_number,
            message: raw_message(&e),
        })?;
    *merged = true;

    progress.on_phase(branch, LandingPhase::SyncTrunk);
    sync_trunk(ctx, branch)?;

    if !options.restack {
        debug!(branch, "restack disabled; done");
        return Ok(None);
    }

    progress.on_phase(branch, LandingPhase::Restack);
    let former_children = graph.children(ctx.repo_root, branch).unwrap_or_else(|e| {
        debug!(branch, error = %e, "could not read children before restack");
        Vec::new()
    });
    if let Err(e) = graph.restack(ctx.repo_root) {
        let conflicts = git.conflicted_files(ctx.repo_root).unwrap_or_default();
        return Err(Error::RestackFailed {
            branch: branch.to_string(),
            message: raw_message(&e),
            conflicts,
        });
    }

    progress.on_phase(branch, LandingPhase::CascadeRepair);
    let mut landed_in_run = landed_before.to_vec();
    landed_in_run.push(branch.to_string());
    let cascade = repair_cascade(ctx, branch, &former_children, &landed_in_run, progress);
    for note in &cascade.notes {
        debug!(branch, note = %note, "cascade note");
    }
    Ok(Some(cascade))
}

/// Re-read the parent and the PR right before merging; returns the PR number
fn verify_trunk_adjacency(ctx: &LandContext<'_>, item: &BranchPr) -> Result<u64> {
    let branch = item.branch.as_str();
    match ctx.ports.graph.parent(ctx.repo_root, branch)? {
        Some(parent) if parent == ctx.trunk => {}
        Some(parent) => {
            return Err(Error::ParentNotTrunk {
                branch: branch.to_string(),
                parent,
                trunk: ctx.trunk.clone(),
            });
        }
        None => return Err(Error::ParentUnknown(branch.to_string())),
    }

    let status = ctx
        .ports
        .host
        .pr_status(ctx.repo_root, branch)?
        .ok_or_else(|| Error::PrNotFound(branch.to_string()))?;
    if status.state != PrState::Open {
        return Err(Error::PrNotOpen {
            branch: branch.to_string(),
            pr_number: status.number,
            state: status.state.to_string(),
        });
    }
    if status.number != item.pr_number {
        warn!(
            branch,
            expected = item.pr_number,
            actual = status.number,
            "PR number changed since discovery; using the live one"
        );
    }
    Ok(status.number)
}

/// Fast-forward local trunk and prove it equals the remote, then return to `branch`
fn sync_trunk(ctx: &LandContext<'_>, branch: &str) -> Result<()> {
    let git = ctx.ports.git;
    let sync_failed = |e: Error| Error::TrunkSyncFailed {
        branch: branch.to_string(),
        trunk: ctx.trunk.clone(),
        message: raw_message(&e),
    };

    git.fetch(ctx.repo_root, &ctx.remote, &ctx.trunk)
        .map_err(sync_failed)?;
    git.checkout(ctx.repo_root, &ctx.trunk).map_err(sync_failed)?;
    git.pull_ff_only(ctx.repo_root, &ctx.remote, &ctx.trunk)
        .map_err(sync_failed)?;

    let remote_trunk = ctx.remote_trunk();
    let local_sha = git.commit_sha(ctx.repo_root, &ctx.trunk)?;
    let remote_sha = git.commit_sha(ctx.repo_root, &remote_trunk)?;
    if local_sha != remote_sha {
        return Err(Error::StackIntegrity(format!(
            "local {} is at {local_sha} but {remote_trunk} is at {remote_sha} after fast-forward",
            ctx.trunk
        )));
    }
    debug!(trunk = %ctx.trunk, sha = %local_sha, "trunk in sync");

    git.checkout(ctx.repo_root, branch).map_err(sync_failed)?;
    Ok(())
}

/// Move the working copy off the landed stack (EFFECTFUL)
///
/// With one branch left above the last landed branch, checks it out. With
/// none, or with several, checks out trunk. The several-children case is
/// reported as [`Navigation::Ambiguous`] rather than guessing.
///
/// Candidates are the landed branch's children as the stack graph reports
/// them now, joined with the cascade roots (children the restack may already
/// have moved onto trunk). A land-only run has no cascade and goes to trunk.
pub fn navigate_after_landing(ctx: &LandContext<'_>, report: &LandingReport) -> Result<Navigation> {
    let git = ctx.ports.git;
    let candidates: Vec<String> = match (report.last_landed(), report.cascades.last()) {
        (Some(landed), Some(cascade)) if cascade.landed == landed => {
            successor_candidates(ctx, report, landed, &cascade.roots)
        }
        _ => Vec::new(),
    };

    match candidates.as_slice() {
        [] => {
            git.checkout(ctx.repo_root, &ctx.trunk)?;
            Ok(Navigation::Trunk)
        }
        [only] => {
            git.checkout(ctx.repo_root, only)?;
            Ok(Navigation::Child {
                branch: only.clone(),
            })
        }
        _ => {
            git.checkout(ctx.repo_root, &ctx.trunk)?;
            Ok(Navigation::Ambiguous {
                landed: report.last_landed().unwrap_or_default().to_string(),
                children: candidates,
            })
        }
    }
}

fn successor_candidates(
    ctx: &LandContext<'_>,
    report: &LandingReport,
    landed: &str,
    roots: &[String],
) -> Vec<String> {
    let mut candidates = match ctx.ports.graph.children(ctx.repo_root, landed) {
        Ok(children) => children,
        Err(e) => {
            warn!(landed, error = %e, "could not re-read children; using cascade roots");
            Vec::new()
        }
    };
    for root in roots {
        if !candidates.contains(root) {
            candidates.push(root.clone());
        }
    }
    let landed_in_run = report.landed_branches();
    candidates.retain(|c| !landed_in_run.contains(&c.as_str()));
    candidates
}

/// Delete local branches whose PRs have merged (EFFECTFUL)
///
/// Refuses while navigation was ambiguous, since the working copy may still
/// need one of the landed branches to pick a successor from.
pub fn cleanup_landed(ctx: &LandContext<'_>, navigation: &Navigation) -> Result<()> {
    if let Navigation::Ambiguous { landed, children } = navigation {
        return Err(Error::AmbiguousChildren {
            branch: landed.clone(),
            children: children.clone(),
        });
    }
    ctx.ports.graph.sync(ctx.repo_root)?;
    info!("cleaned up merged branches");
    Ok(())
}
