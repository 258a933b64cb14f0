//! Thin wrappers around the system `git` command.
//!
//! Using the system binary means fetch and push pick up whatever
//! authentication the operator already has configured:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig

use std::path::Path;
use std::process::{Command, Output};

use log::trace;

use crate::error::{Error, Result};

/// Captured result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Combined stdout and stderr, trimmed. Git reports merge conflicts on
    /// stdout and most other failures on stderr.
    pub fn message(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_string(),
            (false, true) => stdout.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

/// Run `git <args>` inside `workdir`, returning the captured output whether or
/// not the command succeeded. Only a failure to spawn git is an error here.
pub fn run(workdir: &Path, args: &[&str]) -> Result<GitOutput> {
    trace!("git -C {} {}", workdir.display(), args.join(" "));
    let output = Command::new("git")
        .arg("-C")
        .arg(workdir)
        .args(args)
        .output()
        .map_err(|e| Error::GitCommand {
            repo: workdir.to_path_buf(),
            command: args.join(" "),
            stderr: e.to_string(),
        })?;
    Ok(GitOutput::from_output(output))
}

/// Run `git <args>` and turn a non-zero exit into [`Error::GitCommand`].
/// Returns trimmed stdout.
pub fn run_checked(workdir: &Path, args: &[&str]) -> Result<String> {
    let output = run(workdir, args)?;
    if !output.success {
        return Err(Error::GitCommand {
            repo: workdir.to_path_buf(),
            command: args.join(" "),
            stderr: output.message(),
        });
    }
    Ok(output.stdout.trim().to_string())
}

/// Run `git <args>` and report only whether it exited successfully.
pub fn succeeds(workdir: &Path, args: &[&str]) -> Result<bool> {
    Ok(run(workdir, args)?.success)
}

/// Returns `true` when git's output describes a push the remote refused
/// rather than a transport failure.
pub fn is_rejection(message: &str) -> bool {
    message.contains("[rejected]")
        || message.contains("non-fast-forward")
        || message.contains("fetch first")
        || message.contains("[remote rejected]")
}

/// Returns `true` when git's output describes a content conflict.
pub fn is_conflict(message: &str) -> bool {
    message.contains("CONFLICT")
        || message.contains("Automatic merge failed")
        || message.contains("fix conflicts")
}
