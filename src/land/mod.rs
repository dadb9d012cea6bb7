//! Landing engine for stacked PRs
//!
//! Three components, run in this order:
//! 1. Discovery - build the ordered, validated segment to land (reads only)
//! 2. Sequencer - land one branch at a time:
//!    checkout → verify trunk adjacency → merge → sync trunk → restack → cascade
//! 3. Cascade - after each landing, force-push descendants and repair PR bases
//!
//! Nothing read from the stack graph or the host survives from one phase to
//! the next; every phase re-reads live state right before it acts.

mod cascade;
mod discovery;
mod sequencer;

pub use cascade::{CascadeReport, StackSnapshot, repair_cascade};
pub use discovery::{Discovery, Fork, discover_segment};
pub use sequencer::{
    LandOptions, LandingReport, Navigation, cleanup_landed, land_segment, navigate_after_landing,
};

use crate::config::Config;
use crate::error::Result;
use crate::poll::{Clock, ConsistencyPoller, PollPolicy};
use crate::ports::{GitPort, HostPort, StackGraphPort};
use std::path::Path;

/// The three ports the engine drives
#[derive(Clone, Copy)]
pub struct Ports<'a> {
    /// Local git
    pub git: &'a dyn GitPort,
    /// Stack graph
    pub graph: &'a dyn StackGraphPort,
    /// Code host
    pub host: &'a dyn HostPort,
}

/// Everything one landing run needs, passed explicitly to every phase
pub struct LandContext<'a> {
    /// Repository root all port calls operate on
    pub repo_root: &'a Path,
    /// Configured trunk name
    pub trunk: String,
    /// Remote hosting trunk
    pub remote: String,
    /// External systems
    pub ports: Ports<'a>,
    /// Time source for polling
    pub clock: &'a dyn Clock,
    /// Schedule for reads after submits
    pub standard_poll: PollPolicy,
    /// Schedule for reads on the cascade path
    pub fast_poll: PollPolicy,
}

impl<'a> LandContext<'a> {
    /// Build a context from resolved configuration
    ///
    /// Fails with [`Error::Config`](crate::error::Error::Config) if a poll schedule holds an unusable delay.
    pub fn new(
        repo_root: &'a Path,
        config: &Config,
        ports: Ports<'a>,
        clock: &'a dyn Clock,
    ) -> Result<Self> {
        Ok(Self {
            repo_root,
            trunk: config.trunk.clone(),
            remote: config.remote.clone(),
            ports,
            clock,
            standard_poll: PollPolicy::new(config.poll.standard_delays()?),
            fast_poll: PollPolicy::new(config.poll.fast_delays()?),
        })
    }

    /// Remote-tracking ref for trunk, e.g. `origin/main`
    pub fn remote_trunk(&self) -> String {
        format!("{}/{}", self.remote, self.trunk)
    }

    pub(crate) fn standard_poller(&self) -> ConsistencyPoller<'a> {
        ConsistencyPoller::new(self.standard_poll.clone(), self.clock)
    }

    pub(crate) fn fast_poller(&self) -> ConsistencyPoller<'a> {
        ConsistencyPoller::new(self.fast_poll.clone(), self.clock)
    }
}
