//! GitHub `HostPort` implementation using the `gh` CLI

use super::HostPort;
use super::process::{CommandOutput, CommandRunner};
use crate::error::Result;
use crate::types::{PrLink, PrState, PrStatus};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

// JSON shapes returned by `gh pr view --json ...`

#[derive(Deserialize)]
struct StateView {
    number: u64,
    state: PrState,
}

#[derive(Deserialize)]
struct LinkView {
    number: u64,
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseView {
    base_ref_name: String,
}

/// `HostPort` that shells out to `gh`
#[derive(Debug, Clone)]
pub struct GitHubCli {
    runner: CommandRunner,
}

impl GitHubCli {
    /// Create a port invoking the given `gh` binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            runner: CommandRunner::new(program),
        }
    }

    /// `pr view <branch> --json <fields>`, with "no PR" mapped to `None`
    fn view_branch(&self, repo_root: &Path, branch: &str, fields: &str) -> Result<Option<String>> {
        let args = ["pr", "view", branch, "--json", fields];
        let output = self.runner.output(repo_root, &args)?;
        if output.success {
            return Ok(Some(output.stdout));
        }
        if is_no_pr(&output) {
            debug!(branch, "no PR for branch");
            return Ok(None);
        }
        Err(self.runner.failure(&args, &output))
    }
}

impl Default for GitHubCli {
    fn default() -> Self {
        Self::new("gh")
    }
}

fn is_no_pr(output: &CommandOutput) -> bool {
    output
        .stderr
        .to_ascii_lowercase()
        .contains("no pull requests found")
}

impl HostPort for GitHubCli {
    fn merge_pr(&self, repo_root: &Path, pr_number: u64) -> Result<()> {
        debug!(pr_number, "merging PR");
        let number = pr_number.to_string();
        self.runner
            .run(repo_root, &["pr", "merge", &number, "--squash"])?;
        debug!(pr_number, "merge complete");
        Ok(())
    }

    fn pr_status(&self, repo_root: &Path, branch: &str) -> Result<Option<PrStatus>> {
        let Some(json) = self.view_branch(repo_root, branch, "state,number")? else {
            return Ok(None);
        };
        let view: StateView = serde_json::from_str(&json)?;
        debug!(branch, pr_number = view.number, state = %view.state, "got PR status");
        Ok(Some(PrStatus {
            number: view.number,
            state: view.state,
        }))
    }

    fn pr_link(&self, repo_root: &Path, branch: &str) -> Result<Option<PrLink>> {
        let Some(json) = self.view_branch(repo_root, branch, "number,url")? else {
            return Ok(None);
        };
        let view: LinkView = serde_json::from_str(&json)?;
        Ok(Some(PrLink {
            number: view.number,
            url: view.url,
        }))
    }

    fn pr_base(&self, repo_root: &Path, pr_number: u64) -> Result<String> {
        let number = pr_number.to_string();
        let json = self
            .runner
            .run(repo_root, &["pr", "view", &number, "--json", "baseRefName"])?;
        let view: BaseView = serde_json::from_str(&json)?;
        debug!(pr_number, base = %view.base_ref_name, "got PR base");
        Ok(view.base_ref_name)
    }

    fn edit_pr_base(&self, repo_root: &Path, pr_number: u64, base: &str) -> Result<()> {
        debug!(pr_number, base, "updating PR base");
        let number = pr_number.to_string();
        self.runner
            .run(repo_root, &["pr", "edit", &number, "--base", base])?;
        Ok(())
    }

    fn mark_ready(&self, repo_root: &Path, pr_number: u64) -> Result<()> {
        debug!(pr_number, "marking PR ready for review");
        let number = pr_number.to_string();
        self.runner.run(repo_root, &["pr", "ready", &number])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_view_parses_gh_output() {
        let view: StateView = serde_json::from_str(r#"{"number":10,"state":"OPEN"}"#).unwrap();
        assert_eq!(view.number, 10);
        assert_eq!(view.state, PrState::Open);

        let view: StateView = serde_json::from_str(r#"{"number":11,"state":"MERGED"}"#).unwrap();
        assert_eq!(view.state, PrState::Merged);
    }

    #[test]
    fn test_base_view_parses_gh_output() {
        let view: BaseView = serde_json::from_str(r#"{"baseRefName":"feat-1"}"#).unwrap();
        assert_eq!(view.base_ref_name, "feat-1");
    }

    #[test]
    fn test_no_pr_detection() {
        let output = CommandOutput {
            success: false,
            stdout: String::new(),
            stderr: "no pull requests found for branch \"feat-x\"".to_string(),
        };
        assert!(is_no_pr(&output));

        let output = CommandOutput {
            success: false,
            stdout: String::new(),
            stderr: "HTTP 502: Bad Gateway".to_string(),
        };
        assert!(!is_no_pr(&output));
    }
}
