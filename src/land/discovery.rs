//! Segment discovery - read-only
//!
//! Walks the stack graph from a starting branch down to trunk, optionally
//! extends up through single-child descendants, and pairs every branch with
//! its open PR. Nothing here mutates git, the stack graph, or the host.

use super::LandContext;
use crate::error::{Error, Result};
use crate::types::{BranchPr, LandScope, LandingSegment, PrState};
use std::collections::HashSet;
use tracing::debug;

/// A fork where extending up the stack had to stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    /// Last branch included in the segment
    pub branch: String,
    /// Its children, none of which were included
    pub children: Vec<String>,
}

/// Output of discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Branches to land, trunk-adjacent first
    pub segment: LandingSegment,
    /// Set when a through-leaf walk stopped at a branch with several children
    pub fork: Option<Fork>,
}

impl Discovery {
    /// Branch names in landing order
    pub fn branches(&self) -> Vec<&str> {
        self.segment.iter().map(|b| b.branch.as_str()).collect()
    }
}

/// Build the validated segment to land (READ-ONLY)
///
/// `start` defaults to the checked-out branch. The segment runs from the
/// nearest trunk-adjacent ancestor of `start` through `start` itself, and with
/// [`LandScope::ThroughLeaf`] onwards through single-child descendants.
///
/// # Errors
/// * [`Error::DetachedHead`] when no start is given and HEAD is detached
/// * [`Error::ParentNotTrunk`] / [`Error::ParentUnknown`] when the walk ends
///   somewhere other than trunk
/// * [`Error::StackIntegrity`] on a parent cycle
/// * [`Error::PrNotFound`] / [`Error::PrNotOpen`] when a branch has no open PR
pub fn discover_segment(
    ctx: &LandContext<'_>,
    start: Option<&str>,
    scope: LandScope,
) -> Result<Discovery> {
    let start = match start {
        Some(branch) => branch.to_string(),
        None => ctx
            .ports
            .git
            .current_branch(ctx.repo_root)?
            .ok_or(Error::DetachedHead)?,
    };
    if start == ctx.trunk {
        return Err(Error::InvalidOptions(format!(
            "'{start}' is trunk; check out a stacked branch to land"
        )));
    }

    let mut branches = walk_to_trunk(ctx, &start)?;
    require_trunk_adjacent(ctx, &branches[0])?;

    let fork = match scope {
        LandScope::Branch => None,
        LandScope::ThroughLeaf => extend_to_leaf(ctx, &mut branches)?,
    };

    let mut segment = Vec::with_capacity(branches.len());
    for branch in branches {
        segment.push(open_pr_for(ctx, &branch)?);
    }

    debug!(
        segment = ?segment.iter().map(|b| b.branch.as_str()).collect::<Vec<_>>(),
        "discovered segment"
    );
    Ok(Discovery { segment, fork })
}

/// Ancestors of `start` up to (excluding) trunk, trunk-adjacent first
///
/// Stops early at a branch whose parent is unknown or untracked, so the
/// caller's trunk-adjacency check reports the actual parent.
fn walk_to_trunk(ctx: &LandContext<'_>, start: &str) -> Result<Vec<String>> {
    let graph = ctx.ports.graph;
    let mut chain = vec![start.to_string()];
    let mut seen: HashSet<String> = HashSet::from([start.to_string()]);
    let mut current = start.to_string();

    loop {
        let Some(parent) = graph.parent(ctx.repo_root, &current)? else {
            break;
        };
        if graph.is_trunk(ctx.repo_root, &parent)? {
            break;
        }
        if !seen.insert(parent.clone()) {
            return Err(Error::StackIntegrity(format!(
                "parent cycle through '{parent}'"
            )));
        }
        if graph.parent(ctx.repo_root, &parent)?.is_none() {
            debug!(branch = %current, parent = %parent, "parent is not tracked");
            break;
        }
        chain.push(parent.clone());
        current = parent;
    }

    chain.reverse();
    Ok(chain)
}

fn require_trunk_adjacent(ctx: &LandContext<'_>, branch: &str) -> Result<()> {
    match ctx.ports.graph.parent(ctx.repo_root, branch)? {
        Some(parent) if parent == ctx.trunk => Ok(()),
        Some(parent) => Err(Error::ParentNotTrunk {
            branch: branch.to_string(),
            parent,
            trunk: ctx.trunk.clone(),
        }),
        None => Err(Error::ParentUnknown(branch.to_string())),
    }
}

/// Append single-child descendants of the last branch; report a fork if any
fn extend_to_leaf(ctx: &LandContext<'_>, branches: &mut Vec<String>) -> Result<Option<Fork>> {
    let mut seen: HashSet<String> = branches.iter().cloned().collect();

    loop {
        let Some(tip) = branches.last().cloned() else {
            return Ok(None);
        };
        let children = ctx.ports.graph.children(ctx.repo_root, &tip)?;
        match children.as_slice() {
            [] => return Ok(None),
            [only] => {
                if !seen.insert(only.clone()) {
                    return Err(Error::StackIntegrity(format!(
                        "child cycle through '{only}'"
                    )));
                }
                branches.push(only.clone());
            }
            _ => {
                debug!(branch = %tip, ?children, "stopping at fork");
                return Ok(Some(Fork {
                    branch: tip,
                    children,
                }));
            }
        }
    }
}

fn open_pr_for(ctx: &LandContext<'_>, branch: &str) -> Result<BranchPr> {
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
    Ok(BranchPr::new(branch, status.number))
}
