//! Merge command implementation
//!
//! Runs the full release: branch merges and pushes first, then the
//! page_setup migration. Both halves of the input are validated before
//! anything is touched, and a failed code phase skips the data phase.

use anyhow::Result;

use fast_merge::coordinator::Coordinator;

use super::{print_merge_report, print_migration_report, RunArgs};

const ACTION: &str = "merge";

/// Execute the merge command
pub fn execute(args: RunArgs, color: &str) -> Result<()> {
    let output = args.output(color);
    let config = args.load()?;
    let code = config.code_request(ACTION)?;
    let data = config.data_request(ACTION)?;

    output.step(&format!(
        "Merging into {} and migrating page_setup into {}/{}",
        code.to_branch, data.target_host, data.db_name
    ));

    let coordinator = Coordinator::new(config.strategy());
    match coordinator.combined(&code, &data) {
        Ok(report) => {
            print_merge_report(&output, &report.code);
            print_migration_report(&output, &report.data);
            output.success("Release merge complete");
            Ok(())
        }
        Err(e) => {
            output.failure("Release merge failed");
            Err(e.into())
        }
    }
}
