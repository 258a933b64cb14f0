//! # Run Configuration
//!
//! This module defines the inputs of one `fast-merge` run and turns them into
//! validated [`CodeMergeRequest`] and [`DataMigrationRequest`] values.
//!
//! Inputs can come from two places:
//!
//! 1.  **A YAML run file** (`--config`), convenient for release runs that are
//!     repeated with the same repositories and hosts.
//! 2.  **Command-line flags**, which override the file field by field.
//!
//! ```yaml
//! workdirs:
//!   - /srv/publishing-code
//!   - /srv/publishing-data
//! from_branches:
//!   - "dev,hotfix"
//! to_branch: master
//! remote: origin
//! from_hosts: ["10.0.0.1:27017", "10.0.0.2:27017"]
//! to_host: "10.0.0.9:27017"
//! db_name: site
//! page_ids:
//!   - "5f1d7c2e9b1e8a0012345678,5f1d7c2e9b1e8a0012345679"
//!   - "5f1d7c2e9b1e8a001234567a"
//! merge_strategy: delegated
//! ```
//!
//! Only `remote` (`origin`) and `merge_strategy` (`delegated`) have defaults.
//! Every other field an action needs must be present, otherwise resolution
//! fails with a configuration error naming the field and the action.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coordinator::{CodeMergeRequest, DataMigrationRequest};
use crate::error::{Error, Result};
use crate::host::{split_group, HostSpec, PageIdGroup};
use crate::repository::{MergeStrategy, DEFAULT_REMOTE};

/// Everything one run may need, with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Working directories; those ending in `data` are skipped for merging.
    #[serde(default)]
    pub workdirs: Vec<PathBuf>,
    /// One comma-joined branch group per code workdir.
    #[serde(default)]
    pub from_branches: Vec<String>,
    pub to_branch: Option<String>,
    pub remote: Option<String>,
    /// Source hosts as `address:port`.
    #[serde(default)]
    pub from_hosts: Vec<String>,
    pub to_host: Option<String>,
    pub db_name: Option<String>,
    /// One comma-joined id group per source host.
    #[serde(default)]
    pub page_ids: Vec<String>,
    pub merge_strategy: Option<MergeStrategy>,
}

impl RunConfig {
    /// Parse a YAML run file.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML run file from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read run file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Fields set in `overrides` replace the ones in `self`. Lists replace
    /// whole, they are not appended.
    pub fn overlay(self, overrides: RunConfig) -> RunConfig {
        fn list<T>(base: Vec<T>, over: Vec<T>) -> Vec<T> {
            if over.is_empty() {
                base
            } else {
                over
            }
        }

        RunConfig {
            workdirs: list(self.workdirs, overrides.workdirs),
            from_branches: list(self.from_branches, overrides.from_branches),
            to_branch: overrides.to_branch.or(self.to_branch),
            remote: overrides.remote.or(self.remote),
            from_hosts: list(self.from_hosts, overrides.from_hosts),
            to_host: overrides.to_host.or(self.to_host),
            db_name: overrides.db_name.or(self.db_name),
            page_ids: list(self.page_ids, overrides.page_ids),
            merge_strategy: overrides.merge_strategy.or(self.merge_strategy),
        }
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.merge_strategy.unwrap_or_default()
    }

    pub fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or(DEFAULT_REMOTE)
    }

    /// Build the branch merge request for `action`.
    pub fn code_request(&self, action: &str) -> Result<CodeMergeRequest> {
        let workdirs = require_list(&self.workdirs, "workdirs", action)?;
        let groups = require_list(&self.from_branches, "from_branches", action)?;
        let to_branch = require(&self.to_branch, "to_branch", action)?;

        let branch_groups = groups
            .iter()
            .map(|group| split_group(group))
            .collect::<Result<Vec<_>>>()?;

        Ok(CodeMergeRequest::new(workdirs.to_vec(), branch_groups, to_branch)
            .with_remote(self.remote()))
    }

    /// Build the document migration request for `action`.
    pub fn data_request(&self, action: &str) -> Result<DataMigrationRequest> {
        let hosts = require_list(&self.from_hosts, "from_hosts", action)?;
        let to_host = require(&self.to_host, "to_host", action)?;
        let db_name = require(&self.db_name, "db_name", action)?;
        let page_ids = require_list(&self.page_ids, "page_ids", action)?;

        Ok(DataMigrationRequest {
            source_hosts: hosts
                .iter()
                .map(|host| host.parse::<HostSpec>())
                .collect::<Result<Vec<_>>>()?,
            id_groups: page_ids
                .iter()
                .map(|group| group.parse::<PageIdGroup>())
                .collect::<Result<Vec<_>>>()?,
            target_host: to_host.parse()?,
            db_name: db_name.to_string(),
        })
    }
}

fn require<'a>(value: &'a Option<String>, field: &str, action: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing(field, action)),
    }
}

fn require_list<'a, T>(values: &'a [T], field: &str, action: &str) -> Result<&'a [T]> {
    if values.is_empty() {
        Err(missing(field, action))
    } else {
        Ok(values)
    }
}

fn missing(field: &str, action: &str) -> Error {
    Error::config(format!(
        "missing required field `{}` for action `{}`",
        field, action
    ))
}
