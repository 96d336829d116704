//! `crawlguard-cli` – CrawlGuard command line
//!
//! The `crawlguard` binary:
//!
//! - `run` – start the watchdog loop; Ctrl-C or SIGTERM stops it between
//!   cycles.
//! - `check` – evaluate a hand-written snapshot and show what would fire.
//! - `validate` – load every rule source and print a summary.
//! - `schema` – print the JSON Schema of a rule file.
//!
//! Exit codes: `0` success, `1` runtime failure, `2` configuration or rule
//! error.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use commands::CliError;

#[derive(Parser)]
#[command(name = "crawlguard", version, about = "Rule-based safety watchdog for small robots")]
struct Cli {
    #[arg(long, global = true, help = "Config file (default ~/.crawlguard/config.toml)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the watchdog loop until interrupted.
    ///
    /// This binary links no motion drivers, so `stop_actuators` stops the
    /// configured `motion_service` unit instead of halting actuators.
    Run {
        #[arg(long, help = "Execute enforcement actions instead of simulating them")]
        enforce: bool,

        #[arg(long, help = "Run a single cycle and exit")]
        once: bool,
    },
    /// Evaluate one snapshot against the rules (always dry-run).
    Check {
        #[arg(
            long = "metric",
            value_name = "NAME=VALUE",
            value_parser = commands::parse_metric,
            help = "Metric sample; repeat for more"
        )]
        metrics: Vec<(String, f64)>,
    },
    /// Load the rule sources and print a summary.
    Validate,
    /// Print the JSON Schema of a rule file.
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Schema output stays machine-readable: no logs, no banner.
    if matches!(cli.command, Command::Schema) {
        return finish(commands::schema());
    }

    let _telemetry = crawlguard_runtime::telemetry::init_tracing("crawlguard");

    let cfg = match config::resolve(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => return finish(Err(CliError::Config(e))),
    };

    let outcome = match cli.command {
        Command::Run { enforce, once } => {
            print_banner();
            commands::run(&cfg, enforce, once)
        }
        Command::Check { metrics } => commands::check(&cfg, metrics),
        Command::Validate => commands::validate(&cfg),
        Command::Schema => commands::schema(),
    };
    finish(outcome)
}

fn finish(outcome: Result<(), CliError>) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Config(msg)) => {
            eprintln!("{}: {}", "Configuration error".red().bold(), msg);
            ExitCode::from(2)
        }
        Err(CliError::Runtime(msg)) => {
            eprintln!("{}: {}", "Error".red().bold(), msg);
            ExitCode::from(1)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___                   _  ___                  _ "#.bold().cyan());
    println!("{}", r#"  / __|_ _ __ ___ __ __ | |/ __|_  _ __ _ _ _ __| |"#.bold().cyan());
    println!("{}", r#" | (__| '_/ _` \ V  V / | | (_ | || / _` | '_/ _` |"#.bold().cyan());
    println!("{}", r#"  \___|_| \__,_|\_/\_/  |_|\___|\_,_\__,_|_| \__,_|"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "CrawlGuard".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Safety watchdog for small robots");
    println!();
}
