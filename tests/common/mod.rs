//! Shared test utilities

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_ports;
pub mod git_repo;

pub use fake_ports::{FakePr, FakeRepo, RecordingClock, World};
pub use git_repo::{TempGitRepo, commit_in, git, git_available};

use stackland::progress::ProgressCallback;
use stackland::types::LandingPhase;
use std::cell::RefCell;

/// Progress callback that keeps everything it is told
#[derive(Default)]
pub struct RecordingProgress {
    pub phases: RefCell<Vec<(String, LandingPhase)>>,
    pub messages: RefCell<Vec<String>>,
    pub warnings: RefCell<Vec<String>>,
}

impl RecordingProgress {
    pub fn phases_for(&self, branch: &str) -> Vec<LandingPhase> {
        self.phases
            .borrow()
            .iter()
            .filter(|(b, _)| b == branch)
            .map(|(_, p)| *p)
            .collect()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_phase(&self, branch: &str, phase: LandingPhase) {
        self.phases.borrow_mut().push((branch.to_string(), phase));
    }

    fn on_message(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }

    fn on_warning(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}
