//! Land command - merge the bottom of the stack and repair what remains

use crate::cli::OutputMode;
use crate::cli::context::{CommandContext, DryRunPorts};
use crate::cli::style::{Stylize, arrow, check};
use dialoguer::Confirm;
use serde_json::json;
use stackland::error::{Error, Result};
use stackland::land::{
    Discovery, LandOptions, LandingReport, Navigation, cleanup_landed, discover_segment,
    land_segment, navigate_after_landing,
};
use stackland::types::{LandScope, LandingResult};
use std::path::Path;
use std::process::ExitCode;

/// Options for the land command
#[derive(Debug, Clone, Default)]
pub struct LandCommandOptions {
    /// Branch to land through (default: checked-out branch)
    pub branch: Option<String>,
    /// Continue through single-child descendants to the leaf
    pub stack: bool,
    /// Land only: skip restack and cascade repair
    pub no_restack: bool,
    /// Delete merged branches afterwards
    pub cleanup: bool,
    /// Skip the confirmation prompt
    pub force: bool,
    /// Describe mutations without performing them
    pub dry_run: bool,
}

/// Run the land command
pub fn run_land(ctx: &CommandContext, options: &LandCommandOptions, mode: OutputMode) -> Result<ExitCode> {
    let journal = ctx.journal();
    let dry_ports = DryRunPorts::new(ctx, &journal);
    let ports = if options.dry_run {
        dry_ports.ports()
    } else {
        ctx.ports()
    };
    let engine = ctx.land_context(ports)?;

    // =========================================================================
    // Phase 1: DISCOVER - read-only
    // =========================================================================

    let scope = if options.stack {
        LandScope::ThroughLeaf
    } else {
        LandScope::Branch
    };
    let discovery = discover_segment(&engine, options.branch.as_deref(), scope)?;
    report_plan(&discovery, options, mode);

    if !options.force && !options.dry_run && mode.is_interactive() && !confirm()? {
        mode.line("Aborted".muted());
        return Ok(ExitCode::SUCCESS);
    }

    // =========================================================================
    // Phase 2: LAND - one transaction per branch
    // =========================================================================

    let land_options = LandOptions {
        restack: !options.no_restack,
    };
    let report = {
        let progress = mode.progress();
        land_segment(&engine, &discovery.segment, land_options, progress.as_ref())
    };

    if let Some(failure) = &report.failure {
        print_summary(&report, mode);
        if mode == OutputMode::Json {
            let mut payload = crate::cli::error_json(failure);
            payload["outcomes"] = json!(report.outcomes);
            payload["cascades"] = json!(report.cascades);
            println!("{payload}");
        } else {
            crate::cli::print_error(failure, false);
        }
        return Ok(ExitCode::FAILURE);
    }

    // =========================================================================
    // Phase 3: NAVIGATE + CLEAN UP
    // =========================================================================

    let navigation = navigate_after_landing(&engine, &report)?;
    print_summary(&report, mode);
    print_navigation(&navigation, mode);

    let cleanup = if options.cleanup {
        cleanup_landed(&engine, &navigation).map(|()| {
            mode.line(format!("{} Deleted merged branches", check()));
        })
    } else {
        Ok(())
    };

    if options.dry_run {
        print_journal(&journal.entries(), mode);
    }

    if mode == OutputMode::Json {
        let payload = json!({
            "success": cleanup.is_ok(),
            "dry_run": options.dry_run,
            "outcomes": report.outcomes,
            "cascades": report.cascades,
            "navigation": navigation,
            "planned": options.dry_run.then(|| journal.entries()),
            "error": cleanup.as_ref().err().map(|e| json!({ "kind": e.kind(), "message": e.to_string() })),
        });
        println!("{payload}");
        return Ok(if cleanup.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    cleanup?;

    if mode == OutputMode::Script {
        println!("{}", activation_script(&ctx.repo_root));
    }
    Ok(ExitCode::SUCCESS)
}

fn confirm() -> Result<bool> {
    Confirm::new()
        .with_prompt("Proceed with landing?")
        .default(true)
        .interact()
        .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))
}

/// Shell snippet that leaves the calling shell in the repository root
pub fn activation_script(repo_root: &Path) -> String {
    let root = repo_root.display().to_string().replace('\'', r"'\''");
    format!("cd '{root}'")
}

fn report_plan(discovery: &Discovery, options: &LandCommandOptions, mode: OutputMode) {
    let heading = if options.dry_run {
        "Landing plan (dry run)"
    } else {
        "Landing plan"
    };
    mode.line(format!("{}:", heading.emphasis()));
    mode.blank();
    for (index, item) in discovery.segment.iter().enumerate() {
        mode.line(format!(
            "  {}. {} PR #{}",
            index + 1,
            item.branch.accent(),
            item.pr_number
        ));
    }
    if let Some(fork) = &discovery.fork {
        mode.line(format!(
            "  {} stopping at {}: it has {} children ({})",
            "⚠".warn(),
            fork.branch.accent(),
            fork.children.len(),
            fork.children.join(", ")
        ));
    }
    if options.no_restack {
        mode.line(format!(
            "  {}",
            "Restack and PR repair disabled (--no-restack)".muted()
        ));
    }
    mode.blank();
}

fn print_summary(report: &LandingReport, mode: OutputMode) {
    mode.blank();
    if report.is_success() {
        mode.line(format!(
            "{} Landed {} branch(es)",
            check(),
            report.landed_branches().len()
        ));
    } else {
        mode.line(format!("{} Landing stopped", "⚠".warn()));
    }

    for outcome in &report.outcomes {
        let label = match outcome.result {
            LandingResult::Landed => "landed".success(),
            LandingResult::Skipped => "skipped".muted(),
            LandingResult::Failed => "failed".error(),
        };
        mode.line(format!("   {label} {}", outcome.branch.accent()));
        if let Some(reason) = &outcome.reason {
            mode.line(format!("          {}", reason.muted()));
        }
    }

    for cascade in &report.cascades {
        if !cascade.pushed.is_empty() {
            mode.line(format!(
                "   pushed {}",
                cascade.pushed.join(", ").accent()
            ));
        }
        for drift in &cascade.retargeted {
            mode.line(format!(
                "   retargeted PR #{} ({}): {} {} {}",
                drift.pr_number,
                drift.branch,
                drift.current_base.muted(),
                arrow(),
                drift.expected_base.accent()
            ));
        }
        for note in &cascade.notes {
            mode.line(format!("   {} {}", "⚠".warn(), note.warn()));
        }
    }
}

fn print_navigation(navigation: &Navigation, mode: OutputMode) {
    match navigation {
        Navigation::Trunk => mode.line(format!("{} Checked out trunk", arrow())),
        Navigation::Child { branch } => {
            mode.line(format!("{} Checked out {}", arrow(), branch.accent()));
        }
        Navigation::Ambiguous { landed, children } => {
            mode.line(format!(
                "{} {} had several children ({}); checked out trunk",
                "⚠".warn(),
                landed.accent(),
                children.join(", ")
            ));
            mode.line(format!(
                "   {}",
                "Check out the branch to continue with manually.".muted()
            ));
        }
    }
}

fn print_journal(entries: &[String], mode: OutputMode) {
    mode.blank();
    mode.line(format!("{}:", "Would perform".emphasis()));
    if entries.is_empty() {
        mode.line(format!("  {}", "nothing".muted()));
    }
    for entry in entries {
        mode.line(format!("  - {entry}"));
    }
    mode.blank();
    mode.line("Run without --dry-run to execute.".muted());
}
