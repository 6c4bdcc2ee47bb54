//! CEL checker CLI
//!
//! Loads an environment description and a parsed expression tree, runs the
//! type checker and reports the outcome.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "celc")]
#[command(about = "Static type checker for CEL expressions", long_about = None)]
#[command(version)]
struct Cli {
    /// When to use colors (auto, always, never)
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for check results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Rendered diagnostics and a summary line
    Human,
    /// A single JSON report on stdout
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Type-check a parsed expression tree
    Check {
        /// Parsed expression (JSON)
        input: PathBuf,
        /// Environment config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: Format,
        /// Print the type of every node
        #[arg(long)]
        show_types: bool,
    },

    /// List the declarations of an environment
    Env {
        /// Environment config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Only show functions whose name contains this text
        filter: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let color = output::resolve_color_choice(cli.color.as_deref());

    match cli.command {
        Commands::Check {
            input,
            config,
            format,
            show_types,
        } => {
            let options = commands::check::CheckOptions {
                input,
                config,
                format,
                show_types,
                color,
            };
            if !commands::check::execute(&options)? {
                std::process::exit(1);
            }
        }

        Commands::Env { config, filter } => {
            commands::env::execute(config.as_deref(), filter.as_deref(), color)?;
        }
    }

    Ok(())
}
