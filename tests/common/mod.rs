//! Test infrastructure for deploy-update integration tests.
#![allow(dead_code)]

use anyhow::{Context, Result};
use deploy_update::config::DeploySettings;
use deploy_update::runner::{CommandRunner, Invocation, SystemRunner};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runs git in `dir` with a fixed commit timestamp so ref ordering is deterministic.
pub fn git_at(dir: &Path, date: &str, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .output()
        .context("Failed to spawn git")?;
    if !output.status.success() {
        anyhow::bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    SystemRunner::default().run(&Invocation::new(dir, "git", args))
}

/// A temporary git repository for testing.
/// Automatically cleaned up when dropped.
pub struct TestRepo {
    _temp_dir: TempDir,
    path: PathBuf,
    remote: Option<TempDir>,
}

impl TestRepo {
    /// An initialized repository without any commits, so no branches exist.
    pub fn empty() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();

        git(&path, &["init", "-b", "main"])?;
        git(&path, &["config", "user.email", "test@example.com"])?;
        git(&path, &["config", "user.name", "Test User"])?;
        git(&path, &["config", "pull.rebase", "false"])?;

        Ok(Self {
            _temp_dir: temp_dir,
            path,
            remote: None,
        })
    }

    /// A repository with an initial commit on `main` dated 2020-01-01.
    pub fn new() -> Result<Self> {
        let repo = Self::empty()?;
        repo.commit("README.md", "# Test Repo\n", "2020-01-01T00:00:00")?;
        Ok(repo)
    }

    /// Like [`TestRepo::new`], plus a bare `origin` with `main` pushed.
    pub fn with_remote() -> Result<Self> {
        let mut repo = Self::new()?;
        let remote_dir = TempDir::new()?;
        git(remote_dir.path(), &["init", "--bare"])?;

        let remote_path = remote_dir.path().display().to_string();
        git(&repo.path, &["remote", "add", "origin", &remote_path])?;
        git(&repo.path, &["push", "-u", "origin", "main"])?;

        repo.remote = Some(remote_dir);
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commits `content` to `file` on the current branch at `date`.
    pub fn commit(&self, file: &str, content: &str, date: &str) -> Result<()> {
        std::fs::write(self.path.join(file), content)?;
        git(&self.path, &["add", file])?;
        git_at(&self.path, date, &["commit", "-m", &format!("Update {}", file)])?;
        Ok(())
    }

    /// Creates `branch` off `main` with one commit at `date`, then returns to `main`.
    pub fn create_branch_at(&self, branch: &str, date: &str) -> Result<()> {
        git(&self.path, &["checkout", "-b", branch, "main"])?;
        self.commit(&format!("{}.txt", branch.replace('/', "_")), branch, date)?;
        git(&self.path, &["checkout", "main"])?;
        Ok(())
    }

    /// Pushes `branch` to origin and deletes the local copy.
    pub fn publish_and_forget(&self, branch: &str) -> Result<()> {
        git(&self.path, &["push", "origin", branch])?;
        git(&self.path, &["branch", "-D", branch])?;
        Ok(())
    }

    pub fn current_branch(&self) -> Result<String> {
        git(&self.path, &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn upstream_of(&self, branch: &str) -> Result<String> {
        git(
            &self.path,
            &["rev-parse", "--abbrev-ref", &format!("{}@{{upstream}}", branch)],
        )
    }

    pub fn local_branches(&self) -> Result<Vec<String>> {
        let output = git(
            &self.path,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads/"],
        )?;
        Ok(output.lines().map(str::to_string).collect())
    }
}

/// Settings pointing the unit directory at a scratch location, without sudo.
pub fn test_settings(unit_dir: &Path) -> DeploySettings {
    DeploySettings {
        use_sudo: false,
        unit_dir: unit_dir.to_path_buf(),
        user: Some("deploy".to_string()),
        ..DeploySettings::default()
    }
}

/// Runs git for real and fakes every other collaborator, recording all calls.
///
/// Any command whose rendered form contains `fail_on` fails instead.
#[derive(Default)]
pub struct FakeHost {
    git: SystemRunner,
    calls: RefCell<Vec<Invocation>>,
    fail_on: Option<String>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    /// Every recorded call rendered as `program args…`, with `sudo` and
    /// virtualenv paths reduced to the bare tool name.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(summarize).collect()
    }

    /// Every recorded call exactly as it would be spawned.
    pub fn raw_calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }

    /// Calls to anything other than git.
    pub fn delegated(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("git "))
            .collect()
    }

    pub fn git_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("git "))
            .collect()
    }
}

fn summarize(invocation: &Invocation) -> String {
    let mut words: Vec<String> = std::iter::once(invocation.program.clone())
        .chain(invocation.args.iter().cloned())
        .collect();
    if words.first().map(String::as_str) == Some("sudo") {
        words.remove(0);
    }
    if let Some(program) = words.first_mut() {
        if let Some(name) = Path::new(program.as_str()).file_name() {
            *program = name.to_string_lossy().to_string();
        }
    }
    words.join(" ")
}

impl CommandRunner for FakeHost {
    fn run(&self, invocation: &Invocation) -> Result<String> {
        self.calls.borrow_mut().push(invocation.clone());

        if let Some(pattern) = &self.fail_on {
            if invocation.to_string().contains(pattern.as_str()) {
                anyhow::bail!("{} failed: simulated failure", invocation);
            }
        }

        if invocation.program == "git" {
            return self.git.run(invocation);
        }
        if invocation.args.iter().any(|a| a == "status") {
            return Ok("● foodscan.service - FoodScan API\n   Active: active (running)".to_string());
        }
        Ok(String::new())
    }
}
