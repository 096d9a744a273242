//! Git command wrappers.
//!
//! This module provides a thin wrapper around git CLI commands for a single
//! working tree, handling argument validation and error context.

use crate::branch::{self, BranchEntry};
use crate::runner::{CommandRunner, Invocation};
use anyhow::Context;
use std::path::Path;

const REMOTES_NAMESPACE: &str = "refs/remotes/";
const HEADS_NAMESPACE: &str = "refs/heads/";

/// Full ref name so the namespace and symbolic `HEAD` refs can be told apart.
const LISTING_FORMAT: &str = "--format=%(refname)%09%(committerdate:relative)";

/// A git working tree and the runner used to drive it.
#[derive(Clone, Copy)]
pub struct GitRepo<'a> {
    root: &'a Path,
    runner: &'a dyn CommandRunner,
}

impl<'a> GitRepo<'a> {
    pub fn new(root: &'a Path, runner: &'a dyn CommandRunner) -> Self {
        Self { root, runner }
    }

    pub fn run_git(&self, args: &[&str]) -> anyhow::Result<String> {
        self.runner.run(&Invocation::new(self.root, "git", args))
    }

    pub fn has_remotes(&self) -> anyhow::Result<bool> {
        let output = self
            .run_git(&["remote"])
            .context("Failed to list remotes")?;
        Ok(!output.is_empty())
    }

    pub fn fetch_prune(&self) -> anyhow::Result<()> {
        self.run_git(&["fetch", "--prune"])
            .context("Failed to fetch from remote")?;
        Ok(())
    }

    /// Remote-tracking branches, newest commit first.
    pub fn list_remote_branches(&self) -> anyhow::Result<Vec<BranchEntry>> {
        self.list_refs(REMOTES_NAMESPACE)
            .context("Failed to list remote branches")
    }

    /// Local branches, newest commit first.
    pub fn list_local_branches(&self) -> anyhow::Result<Vec<BranchEntry>> {
        self.list_refs(HEADS_NAMESPACE)
            .context("Failed to list local branches")
    }

    fn list_refs(&self, namespace: &str) -> anyhow::Result<Vec<BranchEntry>> {
        let output = self.run_git(&[
            "for-each-ref",
            "--sort=-committerdate",
            LISTING_FORMAT,
            namespace,
        ])?;
        Ok(output
            .lines()
            .filter_map(branch::parse_listing_line)
            .collect())
    }

    pub fn local_branch_exists(&self, name: &str) -> anyhow::Result<bool> {
        validate_branch_name(name)?;
        let output = self
            .run_git(&["branch", "--list", name])
            .with_context(|| format!("Failed to look up local branch '{}'", name))?;
        Ok(!output.trim().is_empty())
    }

    pub fn get_current_branch(&self) -> anyhow::Result<String> {
        self.run_git(&["rev-parse", "--abbrev-ref", "HEAD"])
            .context("Failed to get current branch")
    }

    pub fn checkout(&self, branch: &str) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        self.run_git(&["checkout", branch])
            .with_context(|| format!("Failed to checkout branch '{}'", branch))?;
        Ok(())
    }

    /// Creates `branch` tracking `upstream` and switches to it.
    pub fn checkout_tracking(&self, branch: &str, upstream: &str) -> anyhow::Result<()> {
        validate_branch_name(branch)?;
        validate_branch_name(upstream)?;
        self.run_git(&["checkout", "-b", branch, "--track", upstream])
            .with_context(|| {
                format!(
                    "Failed to create branch '{}' tracking '{}'",
                    branch, upstream
                )
            })?;
        Ok(())
    }

    /// Pulls `branch` from `remote` into the current branch.
    pub fn pull(&self, remote: &str, branch: &str) -> anyhow::Result<()> {
        validate_branch_name(remote)?;
        validate_branch_name(branch)?;
        self.run_git(&["pull", remote, branch])
            .with_context(|| format!("Failed to pull '{}/{}'", remote, branch))?;
        Ok(())
    }
}

fn validate_branch_name(branch: &str) -> anyhow::Result<()> {
    if branch.is_empty()
        || branch.starts_with('-')
        || branch.contains('\0')
        || branch.contains('\n')
        || branch.contains(char::is_whitespace)
    {
        anyhow::bail!("Invalid branch name: {:?}", branch);
    }
    Ok(())
}
