//! Top-level entry points: code only, data only, and both.
//!
//! Requests arrive as positional lists (one branch group per code workdir,
//! one id group per source host). They are validated and zipped into
//! [`RepositoryPlan`] and [`SourceTask`] records here, once, before anything
//! is mutated.

use std::path::{Path, PathBuf};

use log::info;

use crate::cache::ConnectionCache;
use crate::error::{Error, Result};
use crate::host::{HostSpec, PageIdGroup};
use crate::merge::{merge_and_push, MergeReport, RepositoryPlan};
use crate::migration::{MigrationReport, Migrator, SourceTask};
use crate::repository::{GitOpener, MergeStrategy, RepositoryOpener, DEFAULT_REMOTE};
use crate::store::{Connector, MongoConnector};

/// Suffix of the final path segment that marks a data workdir.
pub const DATA_WORKDIR_SUFFIX: &str = "data";

/// Branch merge request as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMergeRequest {
    /// All workdirs, data workdirs included; they are filtered out here.
    pub workdirs: Vec<PathBuf>,
    /// One ordered branch group per code workdir.
    pub branch_groups: Vec<Vec<String>>,
    pub to_branch: String,
    pub remote: String,
}

impl CodeMergeRequest {
    pub fn new(workdirs: Vec<PathBuf>, branch_groups: Vec<Vec<String>>, to_branch: &str) -> Self {
        Self {
            workdirs,
            branch_groups,
            to_branch: to_branch.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
        }
    }

    pub fn with_remote(mut self, remote: &str) -> Self {
        self.remote = remote.to_string();
        self
    }
}

/// Document migration request as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMigrationRequest {
    pub source_hosts: Vec<HostSpec>,
    /// One id group per source host.
    pub id_groups: Vec<PageIdGroup>,
    pub target_host: HostSpec,
    pub db_name: String,
}

/// Outcome of [`Coordinator::combined`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedReport {
    pub code: MergeReport,
    pub data: MigrationReport,
}

/// Returns `true` if the final segment of `path` ends with `data`.
pub fn is_data_workdir(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(DATA_WORKDIR_SUFFIX))
        .unwrap_or(false)
}

/// Split workdirs into `(code, data)`, each keeping input order.
pub fn classify_workdirs(workdirs: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    workdirs
        .iter()
        .cloned()
        .partition(|workdir| !is_data_workdir(workdir))
}

/// Check a code request and return its code workdirs, without touching any
/// repository.
pub fn validate_code(request: &CodeMergeRequest) -> Result<Vec<PathBuf>> {
    if request.to_branch.trim().is_empty() {
        return Err(Error::config("target branch must not be empty"));
    }
    if request.remote.trim().is_empty() {
        return Err(Error::config("remote must not be empty"));
    }
    let (code, data) = classify_workdirs(&request.workdirs);
    for workdir in &data {
        info!("skipping data workdir {}", workdir.display());
    }
    if code.len() != request.branch_groups.len() {
        return Err(Error::config(format!(
            "{} branch group(s) given for {} code workdir(s); expected one group per code workdir",
            request.branch_groups.len(),
            code.len()
        )));
    }
    Ok(code)
}

/// Check a data request, then zip it into source tasks.
pub fn validate_data(request: &DataMigrationRequest) -> Result<Vec<SourceTask>> {
    if request.db_name.trim().is_empty() {
        return Err(Error::config("database name must not be empty"));
    }
    if request.source_hosts.len() != request.id_groups.len() {
        return Err(Error::config(format!(
            "{} page id group(s) given for {} source host(s); expected one group per host",
            request.id_groups.len(),
            request.source_hosts.len()
        )));
    }
    Ok(request
        .source_hosts
        .iter()
        .cloned()
        .zip(request.id_groups.iter().cloned())
        .map(|(host, ids)| SourceTask::new(host, ids))
        .collect())
}

/// Runs branch merges and document migrations.
pub struct Coordinator {
    opener: Box<dyn RepositoryOpener>,
    migrator: Migrator,
}

impl Coordinator {
    /// Git working copies with `strategy`, MongoDB for documents.
    pub fn new(strategy: MergeStrategy) -> Self {
        Self::with_parts(Box::new(GitOpener::new(strategy)), Box::new(MongoConnector))
    }

    /// Build from custom repository and database back ends.
    pub fn with_parts(opener: Box<dyn RepositoryOpener>, connector: Box<dyn Connector>) -> Self {
        Self {
            opener,
            migrator: Migrator::new(ConnectionCache::new(connector)),
        }
    }

    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    fn plans(&self, workdirs: &[PathBuf], request: &CodeMergeRequest) -> Result<Vec<RepositoryPlan>> {
        workdirs
            .iter()
            .zip(request.branch_groups.iter())
            .map(|(workdir, branches)| {
                Ok(RepositoryPlan::new(self.opener.open(workdir)?, branches.clone()))
            })
            .collect()
    }

    /// Merge and push branches only.
    pub fn code_only(&self, request: &CodeMergeRequest) -> Result<MergeReport> {
        let workdirs = validate_code(request)?;
        let plans = self.plans(&workdirs, request)?;
        merge_and_push(&plans, &request.to_branch, &request.remote)
    }

    /// Migrate documents only.
    pub fn data_only(&self, request: &DataMigrationRequest) -> Result<MigrationReport> {
        let tasks = validate_data(request)?;
        self.migrator
            .migrate(&tasks, &request.target_host, &request.db_name)
    }

    /// Merge and push branches, then migrate documents. Both requests are
    /// validated before either phase starts; a failure in the code phase
    /// skips the data phase.
    pub fn combined(
        &self,
        code: &CodeMergeRequest,
        data: &DataMigrationRequest,
    ) -> Result<CombinedReport> {
        let workdirs = validate_code(code)?;
        let tasks = validate_data(data)?;
        let plans = self.plans(&workdirs, code)?;

        let code_report = merge_and_push(&plans, &code.to_branch, &code.remote)?;
        let data_report = self
            .migrator
            .migrate(&tasks, &data.target_host, &data.db_name)?;

        Ok(CombinedReport {
            code: code_report,
            data: data_report,
        })
    }
}
