//! Cascade repair after a landing
//!
//! Once a branch has landed and the stack has been restacked, every remaining
//! descendant has new commits and some of their PRs still point at the landed
//! branch. Repair runs in two strictly ordered steps:
//!
//! 1. Force-push every descendant (breadth-first)
//! 2. Re-point stale PR bases, for pushed branches only
//!
//! A PR base is only moved after its branch was pushed, because the host
//! evaluates the new base against whatever head it currently has. Every
//! failure in here is recorded and skipped; repair never aborts a run.

use super::LandContext;
use crate::ports::raw_message;
use crate::progress::ProgressCallback;
use crate::types::{BranchNode, PrBaseDrift, PrState, SubmitFlags};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Descendants of a landed branch, read fresh from the stack graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSnapshot {
    nodes: Vec<BranchNode>,
}

impl StackSnapshot {
    /// Breadth-first walk from `roots` through their children
    ///
    /// Branches named in `exclude` are neither included nor descended into.
    /// Read failures for one branch are returned as notes and the branch is
    /// still included with what could be read.
    pub fn capture(ctx: &LandContext<'_>, roots: &[String], exclude: &[String]) -> (Self, Vec<String>) {
        let graph = ctx.ports.graph;
        let mut notes = Vec::new();
        let mut nodes = Vec::new();
        let mut seen: HashSet<String> = exclude.iter().cloned().collect();
        let mut queue: VecDeque<String> = VecDeque::new();

        for root in roots {
            if seen.insert(root.clone()) {
                queue.push_back(root.clone());
            }
        }

        while let Some(name) = queue.pop_front() {
            let parent = graph.parent(ctx.repo_root, &name).unwrap_or_else(|e| {
                notes.push(format!("could not read parent of {name}: {}", raw_message(&e)));
                None
            });
            let children = graph.children(ctx.repo_root, &name).unwrap_or_else(|e| {
                notes.push(format!("could not read children of {name}: {}", raw_message(&e)));
                Vec::new()
            });
            let commit_sha = ctx
                .ports
                .git
                .commit_sha(ctx.repo_root, &name)
                .unwrap_or_default();

            for child in &children {
                if seen.insert(child.clone()) {
                    queue.push_back(child.clone());
                }
            }

            nodes.push(BranchNode {
                is_trunk: false,
                name,
                parent,
                children,
                commit_sha,
            });
        }

        (Self { nodes }, notes)
    }

    /// Nodes in breadth-first order
    pub fn nodes(&self) -> &[BranchNode] {
        &self.nodes
    }

    /// Look up one node by name
    pub fn get(&self, name: &str) -> Option<&BranchNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Whether no descendants were found
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// What one cascade repair pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Branch whose landing triggered the repair
    pub landed: String,
    /// Direct descendants of the landed branch
    pub roots: Vec<String>,
    /// Branches force-pushed, in push order
    pub pushed: Vec<String>,
    /// PR bases that were changed
    pub retargeted: Vec<PrBaseDrift>,
    /// Everything that was skipped or failed
    pub notes: Vec<String>,
}

impl CascadeReport {
    /// Whether any step was skipped or failed
    #[must_use]
    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }
}

/// Force-push descendants of `landed` and fix their PR bases
///
/// `former_children` are the children of `landed` as read right before the
/// restack; after a restack the stack graph may already have moved them onto
/// trunk, so they seed the walk together with whatever the graph reports now.
/// `landed_in_run` lists every branch landed so far in this invocation; a
/// descendant whose recorded parent is one of those expects trunk as its base.
///
/// Safe to run twice: a second pass finds no drifted bases and edits nothing.
pub fn repair_cascade(
    ctx: &LandContext<'_>,
    landed: &str,
    former_children: &[String],
    landed_in_run: &[String],
    progress: &dyn ProgressCallback,
) -> CascadeReport {
    let mut report = CascadeReport {
        landed: landed.to_string(),
        ..CascadeReport::default()
    };

    let mut roots: Vec<String> = former_children.to_vec();
    match ctx.ports.graph.children(ctx.repo_root, landed) {
        Ok(children) => {
            for child in children {
                if !roots.contains(&child) {
                    roots.push(child);
                }
            }
        }
        Err(e) => report.notes.push(format!(
            "could not read children of {landed}: {}",
            raw_message(&e)
        )),
    }
    roots.retain(|r| r != landed && !landed_in_run.contains(r));
    report.roots.clone_from(&roots);

    let mut exclude = landed_in_run.to_vec();
    exclude.push(landed.to_string());
    let (snapshot, notes) = StackSnapshot::capture(ctx, &roots, &exclude);
    report.notes.extend(notes);

    if snapshot.is_empty() {
        debug!(landed, "no descendants to repair");
        return report;
    }

    force_push_descendants(ctx, &snapshot, progress, &mut report);
    repair_stale_bases(ctx, &snapshot, landed, landed_in_run, progress, &mut report);

    info!(
        landed,
        pushed = report.pushed.len(),
        retargeted = report.retargeted.len(),
        "cascade repair finished"
    );
    report
}

fn force_push_descendants(
    ctx: &LandContext<'_>,
    snapshot: &StackSnapshot,
    progress: &dyn ProgressCallback,
    report: &mut CascadeReport,
) {
    for node in snapshot.nodes() {
        progress.on_message(&format!("Pushing {}", node.name));
        match ctx
            .ports
            .graph
            .submit(ctx.repo_root, &node.name, SubmitFlags::default())
        {
            Ok(()) => report.pushed.push(node.name.clone()),
            Err(e) => {
                let note = format!("push of {} failed: {}", node.name, raw_message(&e));
                warn!(branch = %node.name, error = %e, "force-push failed");
                progress.on_warning(&note);
                report.notes.push(note);
            }
        }
    }
}

fn repair_stale_bases(
    ctx: &LandContext<'_>,
    snapshot: &StackSnapshot,
    landed: &str,
    landed_in_run: &[String],
    progress: &dyn ProgressCallback,
    report: &mut CascadeReport,
) {
    let host = ctx.ports.host;
    let poller = ctx.fast_poller();

    for branch in report.pushed.clone() {
        let Some(node) = snapshot.get(&branch) else {
            continue;
        };
        let Some(parent) = node.parent.as_deref() else {
            report
                .notes
                .push(format!("{branch} has no recorded parent; base left as is"));
            continue;
        };
        let expected_base = if parent == landed || landed_in_run.iter().any(|l| l == parent) {
            ctx.trunk.as_str()
        } else {
            parent
        };

        let Some(status) = poller
            .poll("pr status", || host.pr_status(ctx.repo_root, &branch))
            .found()
        else {
            debug!(branch = %branch, "no PR visible; nothing to retarget");
            continue;
        };
        if status.state != PrState::Open {
            debug!(branch = %branch, state = %status.state, "PR not open; leaving base");
            continue;
        }

        let current_base = match host.pr_base(ctx.repo_root, status.number) {
            Ok(base) => base,
            Err(e) => {
                report.notes.push(format!(
                    "could not read base of PR #{}: {}",
                    status.number,
                    raw_message(&e)
                ));
                continue;
            }
        };
        if current_base == expected_base {
            continue;
        }

        let drift = PrBaseDrift {
            branch: branch.clone(),
            pr_number: status.number,
            current_base,
            expected_base: expected_base.to_string(),
        };
        progress.on_message(&format!("Retargeting {drift}"));
        match host.edit_pr_base(ctx.repo_root, drift.pr_number, &drift.expected_base) {
            Ok(()) => {
                debug!(pr_number = drift.pr_number, base = %drift.expected_base, "retargeted PR");
                report.retargeted.push(drift);
            }
            Err(e) => {
                let note = format!(
                    "could not retarget PR #{} to {}: {}",
                    drift.pr_number,
                    drift.expected_base,
                    raw_message(&e)
                );
                warn!(pr_number = drift.pr_number, error = %e, "base repair failed");
                progress.on_warning(&note);
                report.notes.push(note);
            }
        }
    }
}
