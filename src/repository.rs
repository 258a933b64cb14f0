//! # Repository Handles
//!
//! This module provides the per-working-copy view the merge orchestrator
//! drives. Each handle is bound to exactly one working directory when it is
//! opened and exposes branch state queries and the branch mutations needed for
//! a release merge (checkout, fetch, merge, push).
//!
//! ## Design
//!
//! The orchestrator works against the [`Repository`] trait rather than a
//! concrete type, so tests can substitute a recording mock. The production
//! implementation, [`GitRepository`], shells out to the system `git` binary
//! through [`crate::git`].
//!
//! Two merge strategies sit behind [`MergeStrategy`]:
//!
//! - **`Delegated`** (default): runs `git merge --no-ff`, letting git do the
//!   three-way merge and conflict detection.
//! - **`ExplicitParents`**: computes the merged tree with `git merge-tree`,
//!   writes the commit with `git commit-tree` and both parents named
//!   explicitly, then fast-forwards the branch onto it.
//!
//! Both produce a commit whose parents are the pre-merge tip and the resolved
//! source commit, with the message `merge <source> into <target>`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::git;

/// Remote used when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// How a source branch is merged into the checked-out branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Let `git merge` perform the merge and detect conflicts.
    #[default]
    Delegated,
    /// Build the merge commit from `merge-tree` output with explicit parents.
    ExplicitParents,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Delegated => write!(f, "delegated"),
            MergeStrategy::ExplicitParents => write!(f, "explicit-parents"),
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "delegated" => Ok(MergeStrategy::Delegated),
            "explicit-parents" => Ok(MergeStrategy::ExplicitParents),
            other => Err(Error::config(format!(
                "unknown merge strategy '{}' (expected 'delegated' or 'explicit-parents')",
                other
            ))),
        }
    }
}

/// Operations the merge orchestrator needs from one working copy.
///
/// Implementations mutate local working-tree state in place and must not be
/// shared across concurrent call paths.
pub trait Repository {
    /// The working directory this handle is bound to.
    fn path(&self) -> &Path;

    /// True iff there are no modified tracked files and no untracked files.
    fn is_clean(&self) -> Result<bool>;

    /// Name of the checked-out branch.
    fn current_branch(&self) -> Result<String>;

    fn has_local_branch(&self, name: &str) -> Result<bool>;

    fn has_remote_branch(&self, remote: &str, name: &str) -> Result<bool>;

    /// Check out `target`, creating a local branch tracking `remote/target`
    /// when only the remote-tracking ref exists. No-op when already on it.
    fn checkout(&self, target: &str, remote: &str) -> Result<()>;

    /// Update every remote-tracking ref of `remote`.
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Merge `source` (remote-tracking ref first, local branch second) into
    /// the checked-out branch, producing a two-parent commit.
    fn merge_from(&self, source: &str, remote: &str) -> Result<()>;

    /// Push the local `branch` to `remote`.
    fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

/// Opens [`Repository`] handles for working directories.
pub trait RepositoryOpener {
    fn open(&self, workdir: &Path) -> Result<Box<dyn Repository>>;
}

/// Opens [`GitRepository`] handles with a fixed merge strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitOpener {
    strategy: MergeStrategy,
}

impl GitOpener {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self { strategy }
    }
}

impl RepositoryOpener for GitOpener {
    fn open(&self, workdir: &Path) -> Result<Box<dyn Repository>> {
        Ok(Box::new(GitRepository::open(workdir, self.strategy)?))
    }
}

/// A working copy driven through the system `git` command.
#[derive(Debug, Clone)]
pub struct GitRepository {
    workdir: PathBuf,
    strategy: MergeStrategy,
}

impl GitRepository {
    /// Bind a handle to `workdir`, failing if it is not inside a git working
    /// tree.
    pub fn open(workdir: &Path, strategy: MergeStrategy) -> Result<Self> {
        let inside = git::run_checked(workdir, &["rev-parse", "--is-inside-work-tree"])?;
        if inside != "true" {
            return Err(Error::GitCommand {
                repo: workdir.to_path_buf(),
                command: "rev-parse --is-inside-work-tree".to_string(),
                stderr: "not a git working tree".to_string(),
            });
        }
        Ok(Self {
            workdir: workdir.to_path_buf(),
            strategy,
        })
    }

    /// Resolve `reference` to a commit id, or `None` if it does not exist.
    fn resolve_commit(&self, reference: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", reference);
        let output = git::run(&self.workdir, &["rev-parse", "--verify", "--quiet", &spec])?;
        if output.success {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Resolve a merge source: remote-tracking ref first, local branch second.
    fn resolve_source(&self, source: &str, remote: &str) -> Result<(String, String)> {
        let remote_ref = format!("refs/remotes/{}/{}", remote, source);
        if let Some(oid) = self.resolve_commit(&remote_ref)? {
            return Ok((remote_ref, oid));
        }
        let local_ref = format!("refs/heads/{}", source);
        if let Some(oid) = self.resolve_commit(&local_ref)? {
            debug!(
                "{}: no {}/{}, merging local branch instead",
                self.workdir.display(),
                remote,
                source
            );
            return Ok((local_ref, oid));
        }
        Err(Error::RefNotFound {
            repo: self.workdir.clone(),
            reference: format!("{}/{} or {}", remote, source, source),
        })
    }

    fn merge_delegated(&self, source: &str, source_oid: &str, target: &str) -> Result<()> {
        let message = merge_message(source, target);
        let output = git::run(
            &self.workdir,
            &["merge", "--no-ff", "--no-edit", "-m", &message, source_oid],
        )?;
        if output.success {
            return Ok(());
        }

        let detail = output.message();
        let in_progress = git::succeeds(
            &self.workdir,
            &["rev-parse", "--verify", "--quiet", "MERGE_HEAD"],
        )?;
        if in_progress {
            warn!(
                "{}: aborting conflicted merge of {} into {}",
                self.workdir.display(),
                source,
                target
            );
            git::run_checked(&self.workdir, &["merge", "--abort"])?;
        }
        if in_progress || git::is_conflict(&detail) {
            return Err(Error::MergeConflict {
                repo: self.workdir.clone(),
                source_ref: source.to_string(),
                target: target.to_string(),
                message: detail,
            });
        }
        Err(Error::GitCommand {
            repo: self.workdir.clone(),
            command: format!("merge --no-ff {}", source_oid),
            stderr: detail,
        })
    }

    fn merge_explicit_parents(&self, source: &str, source_oid: &str, target: &str) -> Result<()> {
        let tip = git::run_checked(&self.workdir, &["rev-parse", "HEAD"])?;
        let output = git::run(&self.workdir, &["merge-tree", "--write-tree", &tip, source_oid])?;
        if !output.success {
            let detail = output.message();
            // merge-tree exits 1 on conflicts and prints the tree plus details
            // on stdout; anything else is a usage or repository failure.
            if git::is_conflict(&detail) || !output.stdout.trim().is_empty() {
                return Err(Error::MergeConflict {
                    repo: self.workdir.clone(),
                    source_ref: source.to_string(),
                    target: target.to_string(),
                    message: detail,
                });
            }
            return Err(Error::GitCommand {
                repo: self.workdir.clone(),
                command: "merge-tree --write-tree".to_string(),
                stderr: detail,
            });
        }
        let tree = output.stdout.lines().next().unwrap_or_default().trim().to_string();

        let message = merge_message(source, target);
        let commit = git::run_checked(
            &self.workdir,
            &["commit-tree", &tree, "-p", &tip, "-p", source_oid, "-m", &message],
        )?;
        // The new commit has the old tip as first parent, so this only moves
        // the branch and working tree forward.
        git::run_checked(&self.workdir, &["merge", "--ff-only", "--quiet", &commit])?;
        Ok(())
    }
}

impl Repository for GitRepository {
    fn path(&self) -> &Path {
        &self.workdir
    }

    fn is_clean(&self) -> Result<bool> {
        let status = git::run_checked(
            &self.workdir,
            &["status", "--porcelain", "--untracked-files=normal"],
        )?;
        Ok(status.is_empty())
    }

    fn current_branch(&self) -> Result<String> {
        git::run_checked(&self.workdir, &["symbolic-ref", "--short", "HEAD"])
    }

    fn has_local_branch(&self, name: &str) -> Result<bool> {
        let reference = format!("refs/heads/{}", name);
        git::succeeds(&self.workdir, &["show-ref", "--verify", "--quiet", &reference])
    }

    fn has_remote_branch(&self, remote: &str, name: &str) -> Result<bool> {
        let reference = format!("refs/remotes/{}/{}", remote, name);
        git::succeeds(&self.workdir, &["show-ref", "--verify", "--quiet", &reference])
    }

    fn checkout(&self, target: &str, remote: &str) -> Result<()> {
        if self.current_branch().ok().as_deref() == Some(target) {
            debug!("{}: already on {}", self.workdir.display(), target);
            return Ok(());
        }

        if !self.has_local_branch(target)? {
            if !self.has_remote_branch(remote, target)? {
                return Err(Error::RefNotFound {
                    repo: self.workdir.clone(),
                    reference: target.to_string(),
                });
            }
            info!(
                "{}: creating {} tracking {}/{}",
                self.workdir.display(),
                target,
                remote,
                target
            );
            let upstream = format!("{}/{}", remote, target);
            git::run_checked(&self.workdir, &["branch", "--track", target, &upstream])?;
        }

        info!("{}: checkout {}", self.workdir.display(), target);
        git::run_checked(&self.workdir, &["checkout", "--quiet", target])?;
        Ok(())
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        info!("{}: fetch {}", self.workdir.display(), remote);
        let output = git::run(&self.workdir, &["fetch", "--quiet", remote])?;
        if !output.success {
            return Err(Error::Network {
                repo: self.workdir.clone(),
                remote: remote.to_string(),
                message: output.message(),
            });
        }
        Ok(())
    }

    fn merge_from(&self, source: &str, remote: &str) -> Result<()> {
        let target = self.current_branch()?;
        let (source_ref, source_oid) = self.resolve_source(source, remote)?;
        info!(
            "{}: merge {} ({}) into {} [{}]",
            self.workdir.display(),
            source_ref,
            short_oid(&source_oid),
            target,
            self.strategy
        );
        match self.strategy {
            MergeStrategy::Delegated => self.merge_delegated(source, &source_oid, &target),
            MergeStrategy::ExplicitParents => {
                self.merge_explicit_parents(source, &source_oid, &target)
            }
        }
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        info!("{}: push {} to {}", self.workdir.display(), branch, remote);
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        let output = git::run(&self.workdir, &["push", "--porcelain", remote, &refspec])?;
        if output.success {
            return Ok(());
        }
        let message = output.message();
        if git::is_rejection(&message) {
            Err(Error::Rejected {
                repo: self.workdir.clone(),
                remote: remote.to_string(),
                branch: branch.to_string(),
                message,
            })
        } else {
            Err(Error::Network {
                repo: self.workdir.clone(),
                remote: remote.to_string(),
                message,
            })
        }
    }
}

/// Commit message used for every merge commit.
pub fn merge_message(source: &str, target: &str) -> String {
    format!("merge {} into {}", source, target)
}

fn short_oid(oid: &str) -> &str {
    oid.get(..8).unwrap_or(oid)
}
