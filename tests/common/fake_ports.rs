//! In-memory fakes of the three ports over one shared simulated world
//!
//! The fakes model just enough of git, the stack tool and the code host for
//! the engine's cross-system properties to be observable: local and remote
//! refs, parent links, PR state and base, and an ordered log of every
//! mutation.

#![allow(dead_code)]

use stackland::config::Config;
use stackland::error::{Error, Result};
use stackland::land::{LandContext, Ports};
use stackland::poll::Clock;
use stackland::ports::{GitPort, HostPort, StackGraphPort};
use stackland::types::{PrLink, PrState, PrStatus, SubmitFlags};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// A PR as the fake host stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePr {
    pub number: u64,
    pub state: PrState,
    pub base: String,
}

/// Shared simulated state
#[derive(Debug, Default)]
pub struct World {
    pub trunk: String,
    pub remote: String,
    pub current: Option<String>,
    /// Local branch -> commit
    pub local: BTreeMap<String, String>,
    /// Branch -> commit on the remote server
    pub remote_refs: BTreeMap<String, String>,
    /// Branch -> commit of the local remote-tracking ref (updated by fetch)
    pub tracking: BTreeMap<String, String>,
    /// Tracked branch -> parent
    pub parents: BTreeMap<String, String>,
    /// Tracked branches in creation order (children are reported in this order)
    pub order: Vec<String>,
    /// Head branch -> PR
    pub prs: BTreeMap<String, FakePr>,
    pub merged: BTreeSet<String>,
    pub commits_ahead: HashMap<String, u32>,
    pub conflicts: Vec<String>,
    next_sha: u64,

    /// Mutations in the order they happened
    pub calls: Vec<String>,

    // Error injection
    pub fail_merge: HashSet<u64>,
    pub fail_fetch: bool,
    pub fail_pull: bool,
    /// Pull succeeds but leaves local trunk where it was
    pub stale_pull: bool,
    pub fail_restack: Option<Vec<String>>,
    /// Restack rebases but leaves children of merged branches on their old parent
    pub restack_keeps_parents: bool,
    pub fail_submit: HashSet<String>,
    pub fail_edit_base: HashSet<u64>,
    pub fail_mark_ready: bool,
    /// Reads of `pr_link` / `pr_status` that come back empty before the PR shows up
    pub link_lag: HashMap<String, usize>,
    pub status_lag: HashMap<String, usize>,
}

impl World {
    fn new_sha(&mut self) -> String {
        self.next_sha += 1;
        format!("{:040x}", self.next_sha)
    }

    fn record(&mut self, call: impl Into<String>) {
        self.calls.push(call.into());
    }

    fn branch_of_pr(&self, number: u64) -> Option<String> {
        self.prs
            .iter()
            .find(|(_, pr)| pr.number == number)
            .map(|(branch, _)| branch.clone())
    }

    fn tracking_ref<'a>(&self, reference: &'a str) -> Option<&'a str> {
        reference
            .strip_prefix(self.remote.as_str())
            .and_then(|r| r.strip_prefix('/'))
    }
}

fn command_failed(command: &str, stderr: &str) -> Error {
    Error::CommandFailed {
        command: command.to_string(),
        stderr: stderr.to_string(),
    }
}

/// Fake `GitPort`
#[derive(Clone)]
pub struct FakeGit {
    world: Rc<RefCell<World>>,
}

impl GitPort for FakeGit {
    fn current_branch(&self, _repo_root: &Path) -> Result<Option<String>> {
        Ok(self.world.borrow().current.clone())
    }

    fn checkout(&self, _repo_root: &Path, branch: &str) -> Result<()> {
        let mut w = self.world.borrow_mut();
        if !w.local.contains_key(branch) {
            return Err(command_failed(
                &format!("git checkout {branch}"),
                &format!("error: pathspec '{branch}' did not match any file(s) known to git"),
            ));
        }
        w.current = Some(branch.to_string());
        w.record(format!("git checkout {branch}"));
        Ok(())
    }

    fn fetch(&self, _repo_root: &Path, remote: &str, branch: &str) -> Result<()> {
        let mut w = self.world.borrow_mut();
        if w.fail_fetch {
            return Err(command_failed(
                &format!("git fetch {remote} {branch}"),
                "fatal: unable to access remote",
            ));
        }
        if let Some(sha) = w.remote_refs.get(branch).cloned() {
            w.tracking.insert(branch.to_string(), sha);
        }
        w.record(format!("git fetch {remote} {branch}"));
        Ok(())
    }

    fn pull_ff_only(&self, _repo_root: &Path, remote: &str, branch: &str) -> Result<()> {
        let mut w = self.world.borrow_mut();
        if w.fail_pull {
            return Err(command_failed(
                &format!("git pull --ff-only {remote} {branch}"),
                "fatal: Not possible to fast-forward, aborting.",
            ));
        }
        w.record(format!("git pull --ff-only {remote} {branch}"));
        if w.stale_pull {
            return Ok(());
        }
        if let Some(sha) = w.remote_refs.get(branch).cloned() {
            w.tracking.insert(branch.to_string(), sha.clone());
            w.local.insert(branch.to_string(), sha);
        }
        Ok(())
    }

    fn commit_sha(&self, _repo_root: &Path, reference: &str) -> Result<String> {
        let w = self.world.borrow();
        let sha = match w.tracking_ref(reference) {
            Some(branch) => w.tracking.get(branch),
            None => w.local.get(reference),
        };
        sha.cloned()
            .ok_or_else(|| Error::BranchNotFound(reference.to_string()))
    }

    fn commits_ahead(&self, _repo_root: &Path, _base: &str) -> Result<u32> {
        let w = self.world.borrow();
        let current = w.current.clone().unwrap_or_default();
        Ok(w.commits_ahead.get(&current).copied().unwrap_or(1))
    }

    fn conflicted_files(&self, _repo_root: &Path) -> Result<Vec<String>> {
        Ok(self.world.borrow().conflicts.clone())
    }
}

/// Fake `StackGraphPort`
#[derive(Clone)]
pub struct FakeStackGraph {
    world: Rc<RefCell<World>>,
}

impl StackGraphPort for FakeStackGraph {
    fn parent(&self, _repo_root: &Path, branch: &str) -> Result<Option<String>> {
        Ok(self.world.borrow().parents.get(branch).cloned())
    }

    fn children(&self, _repo_root: &Path, branch: &str) -> Result<Vec<String>> {
        let w = self.world.borrow();
        Ok(w.order
            .iter()
            .filter(|b| w.parents.get(*b).map(String::as_str) == Some(branch))
            .cloned()
            .collect())
    }

    fn is_trunk(&self, _repo_root: &Path, branch: &str) -> Result<bool> {
        Ok(self.world.borrow().trunk == branch)
    }

    fn restack(&self, _repo_root: &Path) -> Result<()> {
        let mut w = self.world.borrow_mut();
        w.record("gt restack");
        if let Some(conflicts) = w.fail_restack.clone() {
            w.conflicts = conflicts;
            return Err(command_failed(
                "gt restack --no-interactive",
                "Hit conflict restacking feat-2",
            ));
        }

        let trunk = w.trunk.clone();
        if !w.restack_keeps_parents {
            let merged = w.merged.clone();
            for parent in w.parents.values_mut() {
                if merged.contains(parent.as_str()) {
                    parent.clone_from(&trunk);
                }
            }
        }
        let rebased: Vec<String> = w
            .order
            .iter()
            .filter(|b| !w.merged.contains(*b) && w.local.contains_key(*b))
            .cloned()
            .collect();
        for branch in rebased {
            let sha = w.new_sha();
            w.local.insert(branch, sha);
        }
        Ok(())
    }

    fn submit(&self, _repo_root: &Path, branch: &str, flags: SubmitFlags) -> Result<()> {
        let mut w = self.world.borrow_mut();
        if w.fail_submit.contains(branch) {
            return Err(command_failed(
                "gt submit --no-edit --no-interactive",
                &format!("failed to push {branch}"),
            ));
        }
        let mut call = format!("gt submit {branch}");
        if flags.publish {
            call.push_str(" --publish");
        }
        if flags.restack {
            call.push_str(" --restack");
        }
        w.record(call);
        if let Some(sha) = w.local.get(branch).cloned() {
            w.remote_refs.insert(branch.to_string(), sha);
        }
        if !w.prs.contains_key(branch) {
            let number = 100 + w.prs.len() as u64;
            let base = w.parents.get(branch).cloned().unwrap_or_else(|| w.trunk.clone());
            w.prs.insert(
                branch.to_string(),
                FakePr {
                    number,
                    state: PrState::Open,
                    base,
                },
            );
        }
        Ok(())
    }

    fn squash(&self, _repo_root: &Path) -> Result<()> {
        let mut w = self.world.borrow_mut();
        let current = w.current.clone().unwrap_or_default();
        w.record(format!("gt squash {current}"));
        w.commits_ahead.insert(current, 1);
        Ok(())
    }

    fn sync(&self, _repo_root: &Path) -> Result<()> {
        let mut w = self.world.borrow_mut();
        w.record("gt sync -f");
        let merged = w.merged.clone();
        for branch in &merged {
            w.local.remove(branch);
            w.parents.remove(branch);
        }
        w.order.retain(|b| !merged.contains(b));
        Ok(())
    }
}

/// Fake `HostPort`
#[derive(Clone)]
pub struct FakeHost {
    world: Rc<RefCell<World>>,
}

impl FakeHost {
    fn take_lag(lag: &mut HashMap<String, usize>, branch: &str) -> bool {
        match lag.get_mut(branch) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl HostPort for FakeHost {
    fn merge_pr(&self, _repo_root: &Path, pr_number: u64) -> Result<()> {
        let mut w = self.world.borrow_mut();
        if w.fail_merge.contains(&pr_number) {
            return Err(command_failed(
                &format!("gh pr merge {pr_number} --squash"),
                "Pull request is not mergeable: the base branch policy prohibits the merge.",
            ));
        }
        let branch = w
            .branch_of_pr(pr_number)
            .ok_or_else(|| command_failed("gh pr merge", "no pull request found"))?;
        w.record(format!("gh pr merge {pr_number}"));
        if let Some(pr) = w.prs.get_mut(&branch) {
            pr.state = PrState::Merged;
        }
        let trunk = w.trunk.clone();
        let sha = w.new_sha();
        w.remote_refs.insert(trunk, sha);
        w.merged.insert(branch);
        Ok(())
    }

    fn pr_status(&self, _repo_root: &Path, branch: &str) -> Result<Option<PrStatus>> {
        let mut w = self.world.borrow_mut();
        if Self::take_lag(&mut w.status_lag, branch) {
            return Ok(None);
        }
        Ok(w.prs.get(branch).map(|pr| PrStatus {
            number: pr.number,
            state: pr.state,
        }))
    }

    fn pr_link(&self, _repo_root: &Path, branch: &str) -> Result<Option<PrLink>> {
        let mut w = self.world.borrow_mut();
        if Self::take_lag(&mut w.link_lag, branch) {
            return Ok(None);
        }
        Ok(w.prs.get(branch).map(|pr| PrLink {
            number: pr.number,
            url: format!("https://github.com/acme/widgets/pull/{}", pr.number),
        }))
    }

    fn pr_base(&self, _repo_root: &Path, pr_number: u64) -> Result<String> {
        let w = self.world.borrow();
        w.prs
            .values()
            .find(|pr| pr.number == pr_number)
            .map(|pr| pr.base.clone())
            .ok_or_else(|| command_failed("gh pr view", "no pull requests found"))
    }

    fn edit_pr_base(&self, _repo_root: &Path, pr_number: u64, base: &str) -> Result<()> {
        let mut w = self.world.borrow_mut();
        if w.fail_edit_base.contains(&pr_number) {
            return Err(command_failed(
                &format!("gh pr edit {pr_number} --base {base}"),
                "GraphQL: Base ref must be a branch",
            ));
        }
        let branch = w
            .branch_of_pr(pr_number)
            .ok_or_else(|| command_failed("gh pr edit", "no pull requests found"))?;
        // The host compares against the pushed head; an unpushed rebase is invisible to it
        if w.remote_refs.get(&branch) != w.local.get(&branch) {
            return Err(command_failed(
                &format!("gh pr edit {pr_number} --base {base}"),
                "There are no new commits between base branch and head branch",
            ));
        }
        w.record(format!("gh pr edit {pr_number} --base {base}"));
        if let Some(pr) = w.prs.get_mut(&branch) {
            pr.base = base.to_string();
        }
        Ok(())
    }

    fn mark_ready(&self, _repo_root: &Path, pr_number: u64) -> Result<()> {
        let mut w = self.world.borrow_mut();
        if w.fail_mark_ready {
            return Err(command_failed(
                &format!("gh pr ready {pr_number}"),
                "HTTP 403: Resource not accessible",
            ));
        }
        w.record(format!("gh pr ready {pr_number}"));
        Ok(())
    }
}

/// Clock that records requested sleeps instead of sleeping
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, delay: Duration) {
        self.sleeps.borrow_mut().push(delay);
    }
}

/// A simulated repository with all three fakes wired to one world
///
/// ```ignore
/// let repo = FakeRepo::new("main")
///     .branch("feat-1", "main")
///     .branch("feat-2", "feat-1")
///     .pr("feat-1", 10)
///     .pr("feat-2", 11)
///     .on("feat-1");
/// ```
pub struct FakeRepo {
    world: Rc<RefCell<World>>,
    pub git: FakeGit,
    pub graph: FakeStackGraph,
    pub host: FakeHost,
    pub clock: RecordingClock,
    pub config: Config,
    root: PathBuf,
}

impl FakeRepo {
    pub fn new(trunk: &str) -> Self {
        let mut world = World {
            trunk: trunk.to_string(),
            remote: "origin".to_string(),
            ..World::default()
        };
        let sha = world.new_sha();
        world.local.insert(trunk.to_string(), sha.clone());
        world.remote_refs.insert(trunk.to_string(), sha.clone());
        world.tracking.insert(trunk.to_string(), sha);
        world.current = Some(trunk.to_string());

        let world = Rc::new(RefCell::new(world));
        let config = Config {
            trunk: trunk.to_string(),
            ..Config::default()
        };
        Self {
            git: FakeGit {
                world: Rc::clone(&world),
            },
            graph: FakeStackGraph {
                world: Rc::clone(&world),
            },
            host: FakeHost {
                world: Rc::clone(&world),
            },
            world,
            clock: RecordingClock::default(),
            config,
            root: PathBuf::from("/repo"),
        }
    }

    /// Add a tracked branch, pushed, on top of `parent`
    #[must_use]
    pub fn branch(self, name: &str, parent: &str) -> Self {
        {
            let mut w = self.world.borrow_mut();
            let sha = w.new_sha();
            w.local.insert(name.to_string(), sha.clone());
            w.remote_refs.insert(name.to_string(), sha);
            w.parents.insert(name.to_string(), parent.to_string());
            w.order.push(name.to_string());
        }
        self
    }

    /// Add a local branch the stack tool does not track
    #[must_use]
    pub fn untracked(self, name: &str) -> Self {
        {
            let mut w = self.world.borrow_mut();
            let sha = w.new_sha();
            w.local.insert(name.to_string(), sha);
        }
        self
    }

    /// Open a PR for `branch`, based on its parent
    #[must_use]
    pub fn pr(self, branch: &str, number: u64) -> Self {
        let base = {
            let w = self.world.borrow();
            w.parents
                .get(branch)
                .cloned()
                .unwrap_or_else(|| w.trunk.clone())
        };
        self.pr_with_base(branch, number, &base)
    }

    /// Open a PR for `branch` with an explicit base
    #[must_use]
    pub fn pr_with_base(self, branch: &str, number: u64, base: &str) -> Self {
        self.world.borrow_mut().prs.insert(
            branch.to_string(),
            FakePr {
                number,
                state: PrState::Open,
                base: base.to_string(),
            },
        );
        self
    }

    /// Check out `branch`
    #[must_use]
    pub fn on(self, branch: &str) -> Self {
        self.world.borrow_mut().current = Some(branch.to_string());
        self
    }

    /// Mutate the world directly (error injection, odd states)
    pub fn with_world(&self, f: impl FnOnce(&mut World)) {
        f(&mut self.world.borrow_mut());
    }

    pub fn world(&self) -> std::cell::Ref<'_, World> {
        self.world.borrow()
    }

    pub fn ports(&self) -> Ports<'_> {
        Ports {
            git: &self.git,
            graph: &self.graph,
            host: &self.host,
        }
    }

    pub fn ctx(&self) -> LandContext<'_> {
        LandContext::new(&self.root, &self.config, self.ports(), &self.clock).unwrap()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ---- observations -----------------------------------------------------

    pub fn calls(&self) -> Vec<String> {
        self.world.borrow().calls.clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn index_of(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub fn current(&self) -> Option<String> {
        self.world.borrow().current.clone()
    }

    pub fn parent_of(&self, branch: &str) -> Option<String> {
        self.world.borrow().parents.get(branch).cloned()
    }

    pub fn pr_base(&self, branch: &str) -> Option<String> {
        self.world.borrow().prs.get(branch).map(|pr| pr.base.clone())
    }

    pub fn pr_state(&self, branch: &str) -> Option<PrState> {
        self.world.borrow().prs.get(branch).map(|pr| pr.state)
    }

    pub fn local_sha(&self, branch: &str) -> Option<String> {
        self.world.borrow().local.get(branch).cloned()
    }

    pub fn remote_sha(&self, branch: &str) -> Option<String> {
        self.world.borrow().remote_refs.get(branch).cloned()
    }

    pub fn assert_no_mutations(&self) {
        let calls = self.calls();
        assert!(calls.is_empty(), "expected no mutations, got {calls:?}");
    }

    pub fn assert_called(&self, call: &str) {
        let calls = self.calls();
        assert!(
            calls.iter().any(|c| c == call),
            "expected `{call}` in {calls:?}"
        );
    }

    pub fn assert_not_called(&self, call: &str) {
        let calls = self.calls();
        assert!(
            !calls.iter().any(|c| c == call),
            "did not expect `{call}` in {calls:?}"
        );
    }

    pub fn assert_before(&self, first: &str, second: &str) {
        let a = self.index_of(first);
        let b = self.index_of(second);
        assert!(
            matches!((a, b), (Some(a), Some(b)) if a < b),
            "expected `{first}` before `{second}` in {:?}",
            self.calls()
        );
    }

    pub fn assert_merged(&self, branch: &str) {
        assert_eq!(self.pr_state(branch), Some(PrState::Merged), "{branch} not merged");
    }

    pub fn assert_not_merged(&self, branch: &str) {
        assert_ne!(self.pr_state(branch), Some(PrState::Merged), "{branch} merged");
    }
}
