//! Shared test utilities for integration and E2E tests.
//!
//! [`GitFixture`] builds throwaway repositories inside a temporary directory.
//! Each [`RepoFixture`] has three parts:
//!
//! - a bare `origin` repository,
//! - a `seed` clone used to publish branches to `origin`,
//! - a `workdir` clone, which is what `fast-merge` operates on.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = GitFixture::new();
//! let repo = fixture.repo("site-code");
//! repo.publish_branch("dev", "dev.txt", "dev work");
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, git_supports_write_tree, GitFixture, RepoFixture};
}

/// Run git in `dir`, panicking with its output on failure. Returns trimmed
/// stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Whether the installed git has `merge-tree --write-tree` (git 2.38+).
pub fn git_supports_write_tree() -> bool {
    let output = Command::new("git")
        .arg("--version")
        .output()
        .expect("Failed to run git");
    let version = String::from_utf8_lossy(&output.stdout);
    let numbers: Vec<u32> = version
        .split_whitespace()
        .nth(2)
        .unwrap_or("0.0")
        .split('.')
        .take(2)
        .map(|n| n.parse().unwrap_or(0))
        .collect();
    matches!(numbers.as_slice(), [major, minor] if (*major, *minor) >= (2, 38))
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Release Bot"]);
    git(dir, &["config", "user.email", "release@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// A temporary directory holding any number of repository fixtures.
pub struct GitFixture {
    temp_dir: tempfile::TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create `origin`, a seed clone with one commit on `master`, and the
    /// working clone at `<tmp>/<name>`.
    pub fn repo(&self, name: &str) -> RepoFixture {
        let origin = self.path().join(format!("{}.git", name));
        let seed = self.path().join(format!("{}-seed", name));
        let workdir = self.path().join(name);

        fs::create_dir_all(&origin).unwrap();
        git(&origin, &["init", "--bare", "--quiet"]);
        git(&origin, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        fs::create_dir_all(&seed).unwrap();
        git(&seed, &["init", "--quiet"]);
        git(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        configure_identity(&seed);
        fs::write(seed.join("README.md"), "# site\n").unwrap();
        git(&seed, &["add", "README.md"]);
        git(&seed, &["commit", "--quiet", "-m", "initial commit"]);
        git(&seed, &["remote", "add", "origin", origin.to_str().unwrap()]);
        git(&seed, &["push", "--quiet", "origin", "master"]);

        git(
            self.path(),
            &["clone", "--quiet", origin.to_str().unwrap(), name],
        );
        configure_identity(&workdir);

        RepoFixture {
            origin,
            seed,
            workdir,
        }
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// One bare origin with its seed and working clones.
pub struct RepoFixture {
    pub origin: PathBuf,
    pub seed: PathBuf,
    pub workdir: PathBuf,
}

impl RepoFixture {
    /// Publish branch `name` to origin, branched from master, with one commit
    /// writing `file`.
    pub fn publish_branch(&self, name: &str, file: &str, content: &str) {
        git(&self.seed, &["checkout", "--quiet", "-b", name, "master"]);
        fs::write(self.seed.join(file), content).unwrap();
        git(&self.seed, &["add", file]);
        git(&self.seed, &["commit", "--quiet", "-m", &format!("work on {}", name)]);
        git(&self.seed, &["push", "--quiet", "origin", name]);
        git(&self.seed, &["checkout", "--quiet", "master"]);
    }

    /// Push a new commit straight to origin's master, bypassing the workdir.
    pub fn advance_origin_master(&self, file: &str, content: &str) {
        fs::write(self.seed.join(file), content).unwrap();
        git(&self.seed, &["add", file]);
        git(&self.seed, &["commit", "--quiet", "-m", "concurrent change"]);
        git(&self.seed, &["push", "--quiet", "origin", "master"]);
    }

    /// Commit id of `reference` in the origin repository.
    pub fn origin_rev(&self, reference: &str) -> String {
        git(&self.origin, &["rev-parse", reference])
    }

    /// Number of merge commits reachable from `reference` in the workdir.
    pub fn merge_count(&self, reference: &str) -> usize {
        git(&self.workdir, &["rev-list", "--merges", "--count", reference])
            .parse()
            .unwrap()
    }

    /// Parent count of the commit at `reference` in the workdir.
    pub fn parent_count(&self, reference: &str) -> usize {
        git(&self.workdir, &["rev-list", "--parents", "-n", "1", reference])
            .split_whitespace()
            .count()
            - 1
    }

    /// Subjects of the last `n` first-parent commits on `reference`.
    pub fn subjects(&self, reference: &str, n: usize) -> Vec<String> {
        git(
            &self.workdir,
            &[
                "log",
                "--first-parent",
                "--format=%s",
                &format!("-{}", n),
                reference,
            ],
        )
        .lines()
        .map(str::to_string)
        .collect()
    }

    pub fn write(&self, file: &str, content: &str) {
        fs::write(self.workdir.join(file), content).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_repositories() {
        let fixture = GitFixture::new();
        let repo = fixture.repo("site-code");
        assert!(repo.workdir.join("README.md").exists());
        assert_eq!(git(&repo.workdir, &["symbolic-ref", "--short", "HEAD"]), "master");
    }

    #[test]
    fn test_publish_branch_reaches_origin() {
        let fixture = GitFixture::new();
        let repo = fixture.repo("site-code");
        repo.publish_branch("dev", "dev.txt", "dev");
        assert!(!repo.origin_rev("refs/heads/dev").is_empty());
    }
}
