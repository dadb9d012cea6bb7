//! Temporary git repositories for tests that drive the real `git` binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Whether a usable `git` is on `PATH`
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Run git in `dir` with a fixed identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A working repository on `main` with a bare `origin` next to it
pub struct TempGitRepo {
    dir: TempDir,
    root: PathBuf,
    origin: PathBuf,
}

impl TempGitRepo {
    /// Create the pair with one commit on `main`, pushed to `origin`
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let origin = dir.path().join("origin.git");
        let root = dir.path().join("work");
        fs::create_dir_all(&origin).expect("failed to create origin dir");
        fs::create_dir_all(&root).expect("failed to create work dir");

        git(&origin, &["init", "--bare", "--quiet"]);
        git(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        git(&root, &["init", "--quiet"]);
        git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&root, &["config", "commit.gpgsign", "false"]);
        let origin_url = origin.to_string_lossy().to_string();
        git(&root, &["remote", "add", "origin", &origin_url]);

        let repo = Self { dir, root, origin };
        repo.commit("README.md", "hello\n", "initial");
        git(&repo.root, &["push", "--quiet", "origin", "main"]);
        repo
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the repo and its origin, for extra clones
    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Write `file` and commit it on the current branch; returns the new SHA
    pub fn commit(&self, file: &str, contents: &str, message: &str) -> String {
        commit_in(&self.root, file, contents, message)
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(&self.root, args)
    }

    /// Clone `origin` into a sibling directory
    pub fn clone_origin(&self, name: &str) -> PathBuf {
        let target = self.dir.path().join(name);
        let origin_url = self.origin.to_string_lossy().to_string();
        let target_str = target.to_string_lossy().to_string();
        git(self.dir.path(), &["clone", "--quiet", &origin_url, &target_str]);
        git(&target, &["config", "commit.gpgsign", "false"]);
        target
    }
}

/// Write `file` in `dir` and commit it; returns the new SHA
pub fn commit_in(dir: &Path, file: &str, contents: &str, message: &str) -> String {
    fs::write(dir.join(file), contents).expect("failed to write file");
    git(dir, &["add", file]);
    git(dir, &["commit", "--quiet", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}
