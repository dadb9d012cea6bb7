//! Error types for stackland

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// How an error affects a landing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The stack model is provably inconsistent; abort without retry
    Fatal,
    /// An expected failure of an external operation; abort, keep what landed
    Operational,
}

/// Errors produced by the landing engine and its ports
#[derive(Debug, Error)]
pub enum Error {
    /// The first branch of a segment is not stacked directly on trunk
    #[error("parent of '{branch}' is '{parent}', expected trunk '{trunk}'")]
    ParentNotTrunk {
        /// Branch that was about to be landed
        branch: String,
        /// Parent observed in the stack graph
        parent: String,
        /// Configured trunk name
        trunk: String,
    },

    /// The stack graph has no parent recorded for a branch
    #[error("cannot determine the parent of '{0}'")]
    ParentUnknown(String),

    /// The stack graph or trunk contradicts itself after a mutation
    #[error("stack integrity broken: {0}")]
    StackIntegrity(String),

    /// Branch does not exist
    #[error("branch '{0}' not found")]
    BranchNotFound(String),

    /// No pull request is open for a branch
    #[error("no pull request found for branch '{0}'")]
    PrNotFound(String),

    /// A pull request exists but cannot be landed in its current state
    #[error("pull request #{pr_number} for '{branch}' is {state}")]
    PrNotOpen {
        /// Head branch of the PR
        branch: String,
        /// PR number
        pr_number: u64,
        /// Observed state (`closed`, `merged`)
        state: String,
    },

    /// A branch forks and the next branch cannot be chosen automatically
    #[error("'{branch}' has multiple children ({}); choose one manually", .children.join(", "))]
    AmbiguousChildren {
        /// Branch with more than one child
        branch: String,
        /// Its children
        children: Vec<String>,
    },

    /// HEAD does not point at a branch
    #[error("HEAD is detached; check out a branch first")]
    DetachedHead,

    /// The host refused or failed to merge a pull request
    #[error("failed to merge PR #{pr_number} for '{branch}': {message}")]
    MergeFailed {
        /// Head branch of the PR
        branch: String,
        /// PR number
        pr_number: u64,
        /// Raw error text from the host tool
        message: String,
    },

    /// Bringing local trunk up to date with the remote failed
    #[error("failed to sync trunk '{trunk}' after landing '{branch}': {message}")]
    TrunkSyncFailed {
        /// Branch that had just landed
        branch: String,
        /// Trunk name
        trunk: String,
        /// Raw error text
        message: String,
    },

    /// The stack-wide restack failed
    #[error("restack after landing '{branch}' failed: {message}{}", format_conflicts(.conflicts))]
    RestackFailed {
        /// Branch that had just landed
        branch: String,
        /// Raw error text from the stack tool
        message: String,
        /// Files left in a conflicted state
        conflicts: Vec<String>,
    },

    /// An external command exited with a non-zero status
    #[error("`{command}` failed: {stderr}")]
    CommandFailed {
        /// Full command line
        command: String,
        /// Raw stderr output (trimmed)
        stderr: String,
    },

    /// Configuration could not be loaded or saved
    #[error("config error: {0}")]
    Config(String),

    /// Option combination that cannot be executed
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// I/O error (spawning processes, reading files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON from an external tool
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_conflicts(conflicts: &[String]) -> String {
    if conflicts.is_empty() {
        String::new()
    } else {
        format!(" (conflicts in: {})", conflicts.join(", "))
    }
}

impl Error {
    /// Stable identifier used in machine-readable output
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ParentNotTrunk { .. } => "parent_not_trunk",
            Self::ParentUnknown(_) => "parent_unknown",
            Self::StackIntegrity(_) => "stack_integrity",
            Self::BranchNotFound(_) => "branch_not_found",
            Self::PrNotFound(_) => "pr_not_found",
            Self::PrNotOpen { .. } => "pr_not_open",
            Self::AmbiguousChildren { .. } => "ambiguous_children",
            Self::DetachedHead => "detached_head",
            Self::MergeFailed { .. } => "merge_failed",
            Self::TrunkSyncFailed { .. } => "trunk_sync_failed",
            Self::RestackFailed { .. } => "restack_failed",
            Self::CommandFailed { .. } => "command_failed",
            Self::Config(_) => "config",
            Self::InvalidOptions(_) => "invalid_options",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Internal(_) => "internal",
        }
    }

    /// Which tier of the error taxonomy this error belongs to
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ParentNotTrunk { .. } | Self::ParentUnknown(_) | Self::StackIntegrity(_) => {
                Severity::Fatal
            }
            _ => Severity::Operational,
        }
    }

    /// Whether this error means the stack model cannot be trusted
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), Severity::Fatal)
    }
}
