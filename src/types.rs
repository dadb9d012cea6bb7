//! Core types for stackland

use serde::{Deserialize, Serialize};
use std::fmt;

/// A branch as seen by the stack graph at one instant
///
/// Never cached across landing iterations: every phase builds fresh nodes
/// right before acting on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchNode {
    /// Branch name
    pub name: String,
    /// Parent branch (`None` for trunk or untracked branches)
    pub parent: Option<String>,
    /// Child branches in the order the stack graph reported them
    pub children: Vec<String>,
    /// Whether this branch is the trunk
    pub is_trunk: bool,
    /// Local commit the branch points at
    pub commit_sha: String,
}

/// A branch paired with its pull request: the unit of landing work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchPr {
    /// Head branch name
    pub branch: String,
    /// Pull request number on the host
    pub pr_number: u64,
}

impl BranchPr {
    /// Create a new branch/PR pair
    pub fn new(branch: impl Into<String>, pr_number: u64) -> Self {
        Self {
            branch: branch.into(),
            pr_number,
        }
    }
}

impl fmt::Display for BranchPr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.branch, self.pr_number)
    }
}

/// Ordered branches to land, trunk-adjacent first
pub type LandingSegment = Vec<BranchPr>;

/// What happened to one branch during a landing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingResult {
    /// PR merged and local trunk fast-forwarded
    Landed,
    /// Not attempted because an earlier branch stopped the run
    Skipped,
    /// Landing this branch failed
    Failed,
}

impl fmt::Display for LandingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Landed => write!(f, "landed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Per-branch record kept for the duration of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingOutcome {
    /// Branch name
    pub branch: String,
    /// Result for this branch
    pub result: LandingResult,
    /// Human-readable explanation (always set for skipped/failed)
    pub reason: Option<String>,
}

impl LandingOutcome {
    /// Branch landed cleanly
    pub fn landed(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            result: LandingResult::Landed,
            reason: None,
        }
    }

    /// Branch landed but a later phase of its transaction failed
    pub fn landed_with(branch: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            result: LandingResult::Landed,
            reason: Some(reason.into()),
        }
    }

    /// Branch was not attempted
    pub fn skipped(branch: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            result: LandingResult::Skipped,
            reason: Some(reason.into()),
        }
    }

    /// Branch failed to land
    pub fn failed(branch: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            result: LandingResult::Failed,
            reason: Some(reason.into()),
        }
    }
}

/// A PR whose recorded base no longer matches the stack graph
///
/// Computed fresh on every repair pass, discarded once corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrBaseDrift {
    /// Head branch of the PR
    pub branch: String,
    /// PR number
    pub pr_number: u64,
    /// Base the host currently has on file
    pub current_base: String,
    /// Base implied by the stack graph
    pub expected_base: String,
}

impl fmt::Display for PrBaseDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PR #{} ({}): {} -> {}",
            self.pr_number, self.branch, self.current_base, self.expected_base
        )
    }
}

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    /// PR is open and can be merged
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// A branch's PR number and state as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrStatus {
    /// PR number
    pub number: u64,
    /// Current state
    pub state: PrState,
}

/// A branch's PR number and web URL as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrLink {
    /// PR number
    pub number: u64,
    /// Web URL for the PR
    pub url: String,
}

/// Flags forwarded to the stack tool's submit command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitFlags {
    /// Mark the PR ready for review (`--publish`)
    pub publish: bool,
    /// Restack before pushing (`--restack`)
    pub restack: bool,
}

/// Which branches a landing run covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LandScope {
    /// From the trunk-adjacent ancestor through the named branch
    #[default]
    Branch,
    /// Through the named branch and onwards up the stack to its leaf
    ThroughLeaf,
}

/// The phases of one landing transaction, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingPhase {
    /// Check out the branch to land
    Checkout,
    /// Re-read the branch's parent and require trunk
    VerifyTrunkAdjacency,
    /// Squash-merge the PR on the host
    Merge,
    /// Fast-forward local trunk to the remote
    SyncTrunk,
    /// Rebase every remaining branch onto the new trunk
    Restack,
    /// Force-push descendants and repair PR bases
    CascadeRepair,
}

impl fmt::Display for LandingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Checkout => "checkout",
            Self::VerifyTrunkAdjacency => "verify trunk adjacency",
            Self::Merge => "merge",
            Self::SyncTrunk => "sync trunk",
            Self::Restack => "restack",
            Self::CascadeRepair => "cascade repair",
        };
        f.write_str(name)
    }
}
