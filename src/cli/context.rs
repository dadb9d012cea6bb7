//! Shared command context for CLI commands
//!
//! Resolves the repository, loads configuration, and builds the ports every
//! command drives, either process-backed or wrapped for a dry run.

use stackland::config::{Config, ConfigOverrides, load_config};
use stackland::error::Result;
use stackland::land::{LandContext, Ports};
use stackland::poll::SystemClock;
use stackland::ports::{
    DryRunGit, DryRunHost, DryRunJournal, DryRunStackGraph, GitCli, GitHubCli, GraphiteCli,
};
use std::path::{Path, PathBuf};

static CLOCK: SystemClock = SystemClock;

/// Shared context for CLI commands
///
/// Holds no stack-graph or PR data: those go stale after every mutation and
/// are read by the engine when needed.
pub struct CommandContext {
    /// Top-level directory of the repository
    pub repo_root: PathBuf,
    /// Resolved configuration
    pub config: Config,
    /// Process-backed git port
    pub git: GitCli,
    /// Process-backed stack-graph port
    pub graph: GraphiteCli,
    /// Process-backed code-host port
    pub host: GitHubCli,
}

impl CommandContext {
    /// Resolve the repository containing `path` and load its configuration
    pub fn new(path: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let repo_root = GitCli::default().repo_root(path)?;
        let config = load_config(&repo_root)?.with_overrides(overrides);

        let git = GitCli::new(&config.tools.git);
        let graph = GraphiteCli::new(&config.tools.stack, &config.tools.git, &config.trunk);
        let host = GitHubCli::new(&config.tools.host);

        Ok(Self {
            repo_root,
            config,
            git,
            graph,
            host,
        })
    }

    /// The process-backed ports
    pub fn ports(&self) -> Ports<'_> {
        Ports {
            git: &self.git,
            graph: &self.graph,
            host: &self.host,
        }
    }

    /// Engine context over the given ports
    pub fn land_context<'a>(&'a self, ports: Ports<'a>) -> Result<LandContext<'a>> {
        LandContext::new(&self.repo_root, &self.config, ports, &CLOCK)
    }

    /// Fresh dry-run journal for this repository
    pub fn journal(&self) -> DryRunJournal {
        DryRunJournal::new(&self.config.trunk, &self.config.remote)
    }
}

/// Process-backed ports wrapped so that mutations land in a journal
pub struct DryRunPorts<'a> {
    git: DryRunGit<'a, GitCli>,
    graph: DryRunStackGraph<'a, GraphiteCli>,
    host: DryRunHost<'a, GitHubCli>,
}

impl<'a> DryRunPorts<'a> {
    /// Wrap the context's ports, recording into `journal`
    pub fn new(ctx: &CommandContext, journal: &'a DryRunJournal) -> Self {
        Self {
            git: DryRunGit::new(ctx.git.clone(), journal),
            graph: DryRunStackGraph::new(ctx.graph.clone(), journal),
            host: DryRunHost::new(ctx.host.clone(), journal),
        }
    }

    /// The wrapped ports
    pub fn ports(&self) -> Ports<'_> {
        Ports {
            git: &self.git,
            graph: &self.graph,
            host: &self.host,
        }
    }
}
