//! # Error Handling
//!
//! This module defines the centralized error type for `fast-merge`. It uses
//! the `thiserror` library to describe every failure the merge and migration
//! pipelines can surface, each variant carrying enough context (repository
//! path, branch, remote, host, document id) for an operator to act on it.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum covering:
//!   - Dirty working trees found before any mutation.
//!   - Branches or refs that resolve neither locally nor on the remote.
//!   - Merges that git could not complete cleanly.
//!   - Transport failures during fetch or push, and rejected pushes.
//!   - Configuration problems (missing fields, mismatched group counts).
//!   - Source read failures and target write failures during migration.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Nothing in the library retries. Every error is returned to the caller as
//! soon as it happens.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for fast-merge operations
#[derive(Error, Debug)]
pub enum Error {
    /// The working tree has modified tracked files or untracked files.
    #[error("Working tree is dirty in {}: commit, stash or remove local changes first", repo.display())]
    DirtyWorkingTree { repo: PathBuf },

    /// A branch or ref resolved neither locally nor as a remote-tracking ref.
    #[error("Ref not found in {}: {reference}", repo.display())]
    RefNotFound { repo: PathBuf, reference: String },

    /// Git stopped the merge because it could not be completed cleanly.
    #[error("Merge conflict in {}: {source_ref} into {target}{}", repo.display(), detail_suffix(message))]
    MergeConflict {
        repo: PathBuf,
        source_ref: String,
        target: String,
        message: String,
    },

    /// Fetch or push failed at the transport level.
    #[error("Network error in {} (remote {remote}): {message}", repo.display())]
    Network {
        repo: PathBuf,
        remote: String,
        message: String,
    },

    /// The remote refused the push (typically non-fast-forward).
    #[error("Push of {branch} to {remote} rejected in {}: {message}", repo.display())]
    Rejected {
        repo: PathBuf,
        remote: String,
        branch: String,
        message: String,
    },

    /// Missing required fields or mismatched group counts.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Reading documents from a source host failed.
    #[error("Data source error on {host} (ids: {ids}): {message}")]
    DataSource {
        host: String,
        ids: String,
        message: String,
    },

    /// Opening a connection to a database host failed.
    #[error("Cannot connect to {host}: {message}")]
    Connect { host: String, message: String },

    /// Writing a document to the target host failed.
    #[error("Data write error on {host} for document {document_id}: {message}")]
    DataWrite {
        host: String,
        document_id: String,
        message: String,
    },

    /// A git invocation failed for a reason outside the categories above.
    #[error("Git command failed in {}: {command} - {stderr}", repo.display())]
    GitCommand {
        repo: PathBuf,
        command: String,
        stderr: String,
    },

    /// The first failing step of a repository/branch pair.
    #[error("Merging {branch} into {target} in {} failed: {source}", repo.display())]
    BranchMerge {
        repo: PathBuf,
        branch: String,
        target: String,
        #[source]
        source: Box<Error>,
    },

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns the underlying error, looking through [`Error::BranchMerge`]
    /// context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::BranchMerge { source, .. } => source.root(),
            other => other,
        }
    }
}

fn detail_suffix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" - {}", message)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
