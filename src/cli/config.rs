//! Config command - show or persist the resolved configuration

use crate::cli::OutputMode;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use stackland::config::{repo_config_path, save_repo_config};
use stackland::error::{Error, Result};
use std::process::ExitCode;

/// Run the config command
pub fn run_config(ctx: &CommandContext, write: bool, mode: OutputMode) -> Result<ExitCode> {
    if write {
        save_repo_config(&ctx.repo_root, &ctx.config)?;
        let path = repo_config_path(&ctx.repo_root);
        if mode == OutputMode::Json {
            println!(
                "{}",
                serde_json::json!({ "success": true, "path": path.display().to_string() })
            );
        } else {
            mode.line(format!(
                "{} Wrote {}",
                check(),
                path.display().to_string().accent()
            ));
        }
        return Ok(ExitCode::SUCCESS);
    }

    if mode == OutputMode::Json {
        println!("{}", serde_json::to_string(&ctx.config)?);
    } else {
        let text = toml::to_string_pretty(&ctx.config)
            .map_err(|e| Error::Config(format!("failed to render config: {e}")))?;
        mode.line(text.trim_end());
    }
    Ok(ExitCode::SUCCESS)
}
