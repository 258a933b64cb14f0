//! # Fast Merge CLI
//!
//! This is the binary entry point for the `fast-merge` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging from `--log-level`.
//! - Executing the selected action and reporting which step failed.
//!
//! The merge and migration logic lives in the `fast_merge` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
