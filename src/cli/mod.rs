//! Command-line layer: argument handling, rendering, prompts

pub mod config;
pub mod context;
pub mod land;
pub mod style;
pub mod submit;

use indicatif::ProgressBar;
use serde_json::json;
use stackland::error::Error;
use stackland::progress::ProgressCallback;
use stackland::types::LandingPhase;
use std::cell::RefCell;
use std::fmt::Display;
use std::time::Duration;
use style::{Stylize, check, spinner_style};

/// Where human-readable output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human output on stdout
    Human,
    /// Machine-readable JSON on stdout; no human output
    Json,
    /// Human output on stderr; stdout reserved for shell code
    Script,
}

impl OutputMode {
    /// Print one line of human output
    pub fn line(self, text: impl Display) {
        match self {
            Self::Human => anstream::println!("{text}"),
            Self::Script => anstream::eprintln!("{text}"),
            Self::Json => {}
        }
    }

    /// Print an empty line of human output
    pub fn blank(self) {
        self.line("");
    }

    /// Whether prompts and spinners may be shown
    pub const fn is_interactive(self) -> bool {
        matches!(self, Self::Human)
    }

    /// Progress callback suited to this mode
    pub fn progress(self) -> Box<dyn ProgressCallback> {
        match self {
            Self::Json => Box::new(JsonProgress),
            Self::Human | Self::Script => Box::new(CliProgress::new(self)),
        }
    }
}

/// Spinner-per-phase progress for terminals
pub struct CliProgress {
    mode: OutputMode,
    spinner: RefCell<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a progress reporter writing human output in `mode`
    pub const fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            spinner: RefCell::new(None),
        }
    }

    fn finish_current(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            let message = spinner.message();
            spinner.finish_and_clear();
            self.mode.line(format!("{} {message}", check()));
        }
    }

    fn above_spinner(&self, text: &str) {
        let spinner = self.spinner.borrow();
        match spinner.as_ref() {
            Some(bar) => bar.suspend(|| self.mode.line(text)),
            None => self.mode.line(text),
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_phase(&self, branch: &str, phase: LandingPhase) {
        self.finish_current();
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("{}: {phase}", branch.accent()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        *self.spinner.borrow_mut() = Some(spinner);
    }

    fn on_message(&self, message: &str) {
        self.above_spinner(&format!("  {}", message.muted()));
    }

    fn on_warning(&self, message: &str) {
        self.above_spinner(&format!("  {} {}", "⚠".warn(), message.warn()));
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.finish_current();
    }
}

/// One JSON object per event on stderr
pub struct JsonProgress;

impl ProgressCallback for JsonProgress {
    fn on_phase(&self, branch: &str, phase: LandingPhase) {
        eprintln!("{}", json!({ "event": "phase", "branch": branch, "phase": phase }));
    }

    fn on_message(&self, message: &str) {
        eprintln!("{}", json!({ "event": "message", "message": message }));
    }

    fn on_warning(&self, message: &str) {
        eprintln!("{}", json!({ "event": "warning", "message": message }));
    }
}

/// Machine-readable error payload
pub fn error_json(err: &Error) -> serde_json::Value {
    json!({
        "success": false,
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    })
}

/// Render a command failure
pub fn print_error(err: &Error, json_mode: bool) {
    if json_mode {
        println!("{}", error_json(err));
        return;
    }
    anstream::eprintln!("{} {err}", "error:".error());
    if err.is_fatal() {
        anstream::eprintln!(
            "{}",
            "The stack graph is not in the expected shape; fix it with the stack tool and retry."
                .muted()
        );
    }
}
