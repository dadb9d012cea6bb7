//! Blocking subprocess execution shared by the process-backed ports

use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// Captured result of one command
#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs one external program non-interactively in a given directory
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
}

impl CommandRunner {
    /// Create a runner for `program` (a name on `PATH` or a path)
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this runner invokes
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run and return stdout, failing on a non-zero exit
    pub fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let output = self.output(cwd, args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(self.failure(args, &output))
        }
    }

    /// Run and return the captured output regardless of exit status
    pub(crate) fn output(&self, cwd: &Path, args: &[&str]) -> Result<CommandOutput> {
        let command_line = self.command_line(args);
        debug!(cwd = %cwd.display(), command = %command_line, "running");

        // Never let a tool block on a prompt; a hang would stall the whole run.
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GCM_INTERACTIVE", "never")
            .env("GH_PROMPT_DISABLED", "1")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::CommandFailed {
                command: command_line.clone(),
                stderr: format!("failed to start: {e}"),
            })?;

        let result = CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };
        trace!(
            command = %command_line,
            success = result.success,
            stdout = %result.stdout,
            stderr = %result.stderr,
            "finished"
        );
        Ok(result)
    }

    pub(crate) fn failure(&self, args: &[&str], output: &CommandOutput) -> Error {
        let stderr = if output.stderr.is_empty() {
            output.stdout.clone()
        } else {
            output.stderr.clone()
        };
        Error::CommandFailed {
            command: self.command_line(args),
            stderr,
        }
    }

    fn command_line(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Extract the raw tool message from an error for user-facing reports
pub(crate) fn raw_message(err: &Error) -> String {
    match err {
        Error::CommandFailed { stderr, .. } => stderr.clone(),
        other => other.to_string(),
    }
}
