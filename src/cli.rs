//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Fast Merge - merge release branches and migrate page_setup documents
#[derive(Parser, Debug)]
#[command(name = "fast-merge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge and push branches, then migrate page_setup documents
    #[command(alias = "fast_merge")]
    Merge(commands::RunArgs),

    /// Merge and push branches only
    #[command(alias = "fast_code_merge")]
    Code(commands::RunArgs),

    /// Migrate page_setup documents only
    #[command(alias = "fast_data_merge")]
    Data(commands::RunArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Merge(args) => commands::merge::execute(args, &self.color),
            Commands::Code(args) => commands::code::execute(args, &self.color),
            Commands::Data(args) => commands::data::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Route `log` output to stderr at `level`. `RUST_LOG` wins when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second init in the same process (tests) is harmless.
    let _ = env_logger::Builder::from_env(env)
        .format_target(false)
        .try_init();
}
