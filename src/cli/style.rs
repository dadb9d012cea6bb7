//! Terminal styling helpers

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;
use std::sync::OnceLock;

/// Check mark shown for finished steps
pub const CHECK: &str = "✓";

/// Semantic colours for CLI output
///
/// Colours are dropped when stdout does not support them.
pub trait Stylize {
    /// De-emphasised text (hints, secondary details)
    fn muted(&self) -> String;
    /// Branch names and other identifiers
    fn accent(&self) -> String;
    /// Headings
    fn emphasis(&self) -> String;
    /// Soft failures
    fn warn(&self) -> String;
    /// Completed work
    fn success(&self) -> String;
    /// Hard failures
    fn error(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn muted(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.dimmed())
            .to_string()
    }

    fn accent(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.cyan())
            .to_string()
    }

    fn emphasis(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.bold())
            .to_string()
    }

    fn warn(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.yellow())
            .to_string()
    }

    fn success(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.green())
            .to_string()
    }

    fn error(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.red())
            .to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Muted arrow for "from -> to" lines
pub fn arrow() -> String {
    "→".muted()
}

/// Spinner used for every long-running phase
pub fn spinner_style() -> ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE
        .get_or_init(|| {
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        })
        .clone()
}

/// `#<number>`, as a clickable link when the terminal supports it
pub fn pr_link(number: u64, url: &str) -> String {
    let text = format!("#{number}");
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        terminal_link::Link::new(&text, url).to_string()
    } else {
        format!("{text} ({url})")
    }
}
