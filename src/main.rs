//! stackland - land stacked pull requests in order

mod cli;

use clap::{ArgAction, Parser, Subcommand};
use cli::OutputMode;
use cli::context::CommandContext;
use cli::land::{LandCommandOptions, run_land};
use stackland::config::ConfigOverrides;
use stackland::error::Result;
use stackland::submit::SubmitOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Land stacked pull requests in order, keeping the rest of the stack consistent
#[derive(Parser)]
#[command(name = "stackland", version, about)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "path", global = true, default_value = ".")]
    path: PathBuf,

    /// Trunk branch (overrides config)
    #[arg(long, global = true)]
    trunk: Option<String>,

    /// Remote hosting trunk (overrides config)
    #[arg(long, global = true)]
    remote: Option<String>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Machine-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the bottom PR(s) of the stack and repair the rest
    Land {
        /// Land up to and including this branch (default: checked-out branch)
        branch: Option<String>,

        /// Keep landing up the stack while each branch has a single child
        #[arg(long)]
        stack: bool,

        /// Only merge and sync trunk; do not restack or repair descendants
        #[arg(long)]
        no_restack: bool,

        /// Delete merged branches afterwards
        #[arg(long)]
        cleanup: bool,

        /// Print shell code for the caller to eval; progress goes to stderr
        #[arg(long)]
        script: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,

        /// Show what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Submit a branch and wait for its PR to become visible
    Submit {
        /// Branch to submit (default: checked-out branch)
        branch: Option<String>,

        /// Mark the PR ready for review
        #[arg(long)]
        publish: bool,

        /// Squash the branch into one commit first
        #[arg(long)]
        squash: bool,

        /// Restack before pushing
        #[arg(long)]
        restack: bool,
    },

    /// Show the resolved configuration
    Config {
        /// Save it to the repository config file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("stackland: {e:#}");
        return ExitCode::FAILURE;
    }

    let json = cli.json;
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            cli::print_error(&e, json);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("STACKLAND_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = ConfigOverrides {
        trunk: cli.trunk,
        remote: cli.remote,
    };
    let ctx = CommandContext::new(&cli.path, &overrides)?;

    match cli.command {
        Commands::Land {
            branch,
            stack,
            no_restack,
            cleanup,
            script,
            force,
            dry_run,
        } => {
            let mode = output_mode(cli.json, script);
            let options = LandCommandOptions {
                branch,
                stack,
                no_restack,
                cleanup,
                force,
                dry_run,
            };
            run_land(&ctx, &options, mode)
        }
        Commands::Submit {
            branch,
            publish,
            squash,
            restack,
        } => {
            let options = SubmitOptions {
                publish,
                squash,
                restack,
            };
            cli::submit::run_submit(&ctx, branch.as_deref(), options, output_mode(cli.json, false))
        }
        Commands::Config { write } => {
            cli::config::run_config(&ctx, write, output_mode(cli.json, false))
        }
    }
}

const fn output_mode(json: bool, script: bool) -> OutputMode {
    if json {
        OutputMode::Json
    } else if script {
        OutputMode::Script
    } else {
        OutputMode::Human
    }
}
