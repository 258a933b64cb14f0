//! Branch merge orchestration across several repositories.
//!
//! Every repository is paired with its own ordered group of source branches.
//! All merges across all repositories must succeed before anything is pushed.

use std::path::Path;

use log::{error, info};

use crate::error::{Error, Result};
use crate::repository::Repository;

/// One repository together with the source branches to merge into it, in
/// order.
pub struct RepositoryPlan {
    pub repository: Box<dyn Repository>,
    pub branches: Vec<String>,
}

impl RepositoryPlan {
    pub fn new(repository: Box<dyn Repository>, branches: Vec<String>) -> Self {
        Self {
            repository,
            branches,
        }
    }

    pub fn path(&self) -> &Path {
        self.repository.path()
    }
}

/// What a successful [`merge_and_push`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// `(repository path, source branch)` for every merge, in execution order.
    pub merged: Vec<(String, String)>,
    /// Repository paths pushed, in push order.
    pub pushed: Vec<String>,
}

/// Merge each plan's branches into `to_branch`, then push every repository.
///
/// The working trees of all repositories are checked before anything is
/// touched, and again before each branch. The first failure stops the run:
/// later branches and repositories are not attempted and nothing is pushed.
/// Merges already committed locally are left in place.
pub fn merge_and_push(
    plans: &[RepositoryPlan],
    to_branch: &str,
    remote: &str,
) -> Result<MergeReport> {
    for plan in plans {
        ensure_clean(plan.repository.as_ref())?;
    }

    let mut report = MergeReport::default();
    for plan in plans {
        for branch in &plan.branches {
            merge_one(plan.repository.as_ref(), branch, to_branch, remote).map_err(|source| {
                error!(
                    "{}: merging {} into {} failed",
                    plan.path().display(),
                    branch,
                    to_branch
                );
                Error::BranchMerge {
                    repo: plan.path().to_path_buf(),
                    branch: branch.clone(),
                    target: to_branch.to_string(),
                    source: Box::new(source),
                }
            })?;
            report
                .merged
                .push((plan.path().display().to_string(), branch.clone()));
        }
    }

    info!(
        "all {} merge(s) succeeded, pushing {} repositor{}",
        report.merged.len(),
        plans.len(),
        if plans.len() == 1 { "y" } else { "ies" }
    );
    for plan in plans {
        plan.repository.push(remote, to_branch)?;
        report.pushed.push(plan.path().display().to_string());
    }

    Ok(report)
}

fn ensure_clean(repository: &dyn Repository) -> Result<()> {
    if repository.is_clean()? {
        Ok(())
    } else {
        Err(Error::DirtyWorkingTree {
            repo: repository.path().to_path_buf(),
        })
    }
}

/// Checkout, fetch and merge one source branch into `to_branch`.
fn merge_one(repository: &dyn Repository, branch: &str, to_branch: &str, remote: &str) -> Result<()> {
    ensure_clean(repository)?;
    repository.checkout(to_branch, remote)?;
    repository.fetch(remote)?;

    let current = repository.current_branch()?;
    if current != to_branch {
        return Err(Error::GitCommand {
            repo: repository.path().to_path_buf(),
            command: "merge".to_string(),
            stderr: format!(
                "current branch <{}> is not target branch <{}>",
                current, to_branch
            ),
        });
    }

    repository.merge_from(branch, remote)
}
