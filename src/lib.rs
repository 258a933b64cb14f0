//! # Fast Merge Library
//!
//! This library automates two release chores for the publishing platform and
//! backs the `fast-merge` command-line tool:
//!
//! 1.  **Branch merging**: merge ordered groups of source branches into one
//!     target branch across several git working copies, then push every
//!     repository once all merges have succeeded.
//! 2.  **Document migration**: copy selected `page_setup` documents, by page
//!     id, from several database instances into one target instance.
//!
//! ## Quick Example
//!
//! ```
//! use fast_merge::config::RunConfig;
//! use fast_merge::coordinator::classify_workdirs;
//!
//! let config = RunConfig::parse(r#"
//! workdirs: [/srv/publishing-code, /srv/publishing-data]
//! from_branches: ["dev,hotfix"]
//! to_branch: master
//! "#).unwrap();
//!
//! let request = config.code_request("code").unwrap();
//! assert_eq!(request.branch_groups, vec![vec!["dev", "hotfix"]]);
//!
//! let (code, data) = classify_workdirs(&request.workdirs);
//! assert_eq!(code.len(), 1);
//! assert_eq!(data.len(), 1);
//! ```
//!
//! ## Core Concepts
//!
//! - **Repositories (`repository`, `git`)**: one handle per working copy,
//!   driving the system `git` binary.
//! - **Branch merging (`merge`)**: the checkout, fetch, merge, push sequence
//!   with its all-or-nothing push gate.
//! - **Stores (`store`, `cache`, `host`)**: database connections keyed by
//!   host spec, cached for the life of the run.
//! - **Migration (`migration`)**: read from every source, then upsert into the
//!   target.
//! - **Coordination (`coordinator`, `config`)**: validation of a run's inputs
//!   and the three entry points (code, data, both).

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod git;
pub mod host;
pub mod merge;
pub mod migration;
pub mod output;
pub mod repository;
pub mod store;
