//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `fast-merge` command-line tool. The three run actions share one argument
//! set, [`RunArgs`]; each action module picks the fields it needs and leaves
//! required-field checks to [`fast_merge::config::RunConfig`].
//!
//! The `execute` function of every action:
//! - loads the run file (if any) and overlays the command-line flags,
//! - resolves the request for its action, failing fast on missing fields,
//! - runs the coordinator and prints a summary, or names the failing step.

pub mod code;
pub mod completions;
pub mod data;
pub mod merge;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use fast_merge::config::RunConfig;
use fast_merge::error::Error;
use fast_merge::merge::MergeReport;
use fast_merge::migration::MigrationReport;
use fast_merge::output::OutputConfig;
use fast_merge::repository::MergeStrategy;

/// Arguments shared by the `merge`, `code` and `data` actions
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// YAML run file; flags override its fields
    #[arg(short, long, value_name = "PATH", env = "FAST_MERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Working directories; directories whose name ends in "data" are skipped
    #[arg(long, alias = "workdir", value_name = "PATH", num_args = 1..)]
    pub workdirs: Vec<PathBuf>,

    /// Comma-joined source branches, one group per code working directory
    #[arg(long, alias = "from_branches", value_name = "GROUP", num_args = 1..)]
    pub from_branches: Vec<String>,

    /// Branch every group is merged into
    #[arg(long, alias = "to_branch", value_name = "BRANCH")]
    pub to_branch: Option<String>,

    /// Remote to fetch from and push to [default: origin]
    #[arg(long, alias = "remote_name", value_name = "NAME")]
    pub remote: Option<String>,

    /// Source database hosts as address:port
    #[arg(long, alias = "from_hosts", value_name = "HOST", num_args = 1..)]
    pub from_hosts: Vec<String>,

    /// Target database host as address:port
    #[arg(long, alias = "to_host", value_name = "HOST")]
    pub to_host: Option<String>,

    /// Database holding the page_setup collection
    #[arg(long, alias = "db_name", value_name = "NAME")]
    pub db_name: Option<String>,

    /// Comma-joined page ids, one group per source host
    #[arg(long, alias = "page_ids", value_name = "GROUP", num_args = 1..)]
    pub page_ids: Vec<String>,

    /// Merge strategy: delegated or explicit-parents [default: delegated]
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<MergeStrategy>,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl RunArgs {
    /// The run file's settings with every flag given on the command line
    /// laid over them.
    pub fn load(&self) -> Result<RunConfig, Error> {
        let base = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        Ok(base.overlay(self.overrides()))
    }

    fn overrides(&self) -> RunConfig {
        RunConfig {
            workdirs: self.workdirs.clone(),
            from_branches: self.from_branches.clone(),
            to_branch: self.to_branch.clone(),
            remote: self.remote.clone(),
            from_hosts: self.from_hosts.clone(),
            to_host: self.to_host.clone(),
            db_name: self.db_name.clone(),
            page_ids: self.page_ids.clone(),
            merge_strategy: self.strategy,
        }
    }

    pub fn output(&self, color: &str) -> OutputConfig {
        OutputConfig::from_env_and_flag(color).quiet(self.quiet)
    }
}

fn print_merge_report(output: &OutputConfig, report: &MergeReport) {
    for (repo, branch) in &report.merged {
        output.detail(&format!("merged {} in {}", branch, repo));
    }
    for repo in &report.pushed {
        output.detail(&format!("pushed {}", repo));
    }
}

fn print_migration_report(output: &OutputConfig, report: &MigrationReport) {
    for (host, count) in &report.fetched {
        output.detail(&format!("read {} document(s) from {}", count, host));
    }
    output.detail(&format!("upserted {} document(s)", report.written));
}
