//! Python virtualenv, dependency install and migration entrypoint.

use crate::runner::{CommandRunner, Invocation};
use anyhow::Context;
use std::path::{Path, PathBuf};

const SYSTEM_PYTHON: &str = "python3";
const VENV_PACKAGE: &str = "python3-venv";

/// The application's virtualenv under a repository root.
#[derive(Clone, Copy)]
pub struct PythonEnv<'a> {
    root: &'a Path,
    venv: &'a Path,
    runner: &'a dyn CommandRunner,
}

impl<'a> PythonEnv<'a> {
    /// `venv` is resolved against `root` when relative.
    pub fn new(root: &'a Path, venv: &'a Path, runner: &'a dyn CommandRunner) -> Self {
        Self { root, venv, runner }
    }

    fn venv_dir(&self) -> PathBuf {
        self.root.join(self.venv)
    }

    fn bin(&self, name: &str) -> String {
        self.venv_dir().join("bin").join(name).display().to_string()
    }

    pub fn exists(&self) -> bool {
        self.venv_dir().join("bin").join("python").exists()
    }

    /// Whether the distribution package providing `venv` is installed.
    pub fn venv_package_installed(&self) -> bool {
        self.runner
            .run(&Invocation::new(self.root, "dpkg", &["-s", VENV_PACKAGE]))
            .is_ok()
    }

    pub fn install_venv_package(&self, use_sudo: bool) -> anyhow::Result<()> {
        let inv = Invocation::new(self.root, "apt-get", &["install", "-y", VENV_PACKAGE])
            .elevated(use_sudo);
        self.runner
            .run(&inv)
            .with_context(|| format!("Failed to install {}", VENV_PACKAGE))?;
        Ok(())
    }

    pub fn create(&self) -> anyhow::Result<()> {
        let venv = self.venv_dir().display().to_string();
        self.runner
            .run(&Invocation::new(self.root, SYSTEM_PYTHON, &["-m", "venv", venv.as_str()]))
            .with_context(|| format!("Failed to create virtualenv at {}", venv))?;
        Ok(())
    }

    pub fn install_requirements(&self, requirements: &Path) -> anyhow::Result<()> {
        let manifest = requirements.display().to_string();
        self.runner
            .run(&Invocation::new(
                self.root,
                &self.bin("pip"),
                &["install", "-r", manifest.as_str()],
            ))
            .with_context(|| format!("Failed to install dependencies from {}", manifest))?;
        Ok(())
    }

    /// Runs the migration script with no arguments; only the exit status matters.
    pub fn run_migration(&self, script: &Path) -> anyhow::Result<()> {
        let script = script.display().to_string();
        self.runner
            .run(&Invocation::new(self.root, &self.bin("python"), &[script.as_str()]))
            .with_context(|| format!("Migration {} failed", script))?;
        Ok(())
    }
}
