//! Code command implementation
//!
//! Merges each code working directory's branch group into the target branch
//! and pushes every repository once all merges succeed.

use anyhow::Result;

use fast_merge::coordinator::Coordinator;

use super::{print_merge_report, RunArgs};

const ACTION: &str = "code";

/// Execute the code command
pub fn execute(args: RunArgs, color: &str) -> Result<()> {
    let output = args.output(color);
    let config = args.load()?;
    let request = config.code_request(ACTION)?;

    output.step(&format!(
        "Merging into {} ({} strategy, remote {})",
        request.to_branch,
        config.strategy(),
        request.remote
    ));

    let coordinator = Coordinator::new(config.strategy());
    match coordinator.code_only(&request) {
        Ok(report) => {
            print_merge_report(&output, &report);
            output.success("Code merge complete");
            Ok(())
        }
        Err(e) => {
            output.failure("Code merge failed");
            Err(e.into())
        }
    }
}
