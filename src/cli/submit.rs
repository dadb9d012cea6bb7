//! Submit command - push one branch and report its PR

use crate::cli::OutputMode;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, pr_link};
use serde_json::json;
use stackland::error::Result;
use stackland::submit::{SubmitOptions, submit_branch};
use std::process::ExitCode;

/// Run the submit command
pub fn run_submit(
    ctx: &CommandContext,
    branch: Option<&str>,
    options: SubmitOptions,
    mode: OutputMode,
) -> Result<ExitCode> {
    let engine = ctx.land_context(ctx.ports())?;
    let report = {
        let progress = mode.progress();
        submit_branch(&engine, branch, options, progress.as_ref())?
    };

    if mode == OutputMode::Json {
        let mut payload = json!(report);
        payload["success"] = json!(true);
        println!("{payload}");
        return Ok(ExitCode::SUCCESS);
    }

    if report.squashed {
        mode.line(format!("{} Squashed {}", check(), report.branch.accent()));
    }
    match &report.pr {
        Some(pr) => mode.line(format!(
            "{} Submitted {} as PR {}",
            check(),
            report.branch.accent(),
            pr_link(pr.number, &pr.url)
        )),
        None => mode.line(format!(
            "{} Submitted {}",
            check(),
            report.branch.accent()
        )),
    }
    for warning in &report.warnings {
        mode.line(format!("   {} {}", "⚠".warn(), warning.warn()));
    }
    if report.pr.is_none() {
        mode.line(format!(
            "   {}",
            "The host has not indexed the PR yet; check again shortly.".muted()
        ));
    }
    Ok(ExitCode::SUCCESS)
}
