//! Data command implementation
//!
//! Copies page_setup documents from every source host into the target host.

use anyhow::Result;

use fast_merge::coordinator::Coordinator;

use super::{print_migration_report, RunArgs};

const ACTION: &str = "data";

/// Execute the data command
pub fn execute(args: RunArgs, color: &str) -> Result<()> {
    let output = args.output(color);
    let config = args.load()?;
    let request = config.data_request(ACTION)?;

    output.step(&format!(
        "Migrating page_setup from {} host(s) into {}/{}",
        request.source_hosts.len(),
        request.target_host,
        request.db_name
    ));

    let coordinator = Coordinator::new(config.strategy());
    match coordinator.data_only(&request) {
        Ok(report) => {
            print_migration_report(&output, &report);
            output.success("Data migration complete");
            Ok(())
        }
        Err(e) => {
            output.failure("Data migration failed");
            Err(e.into())
        }
    }
}
