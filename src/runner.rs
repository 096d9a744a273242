//! External command execution.
//!
//! Every collaborator (git, pip, the migration entrypoint, systemctl, dpkg)
//! is invoked through the [`CommandRunner`] trait so the update procedure can
//! be driven against a fixture in tests.

use anyhow::Context;
use colored::Colorize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Callback invoked before each external command is spawned.
pub type CommandLogger = fn(&Invocation);

/// Echoes the command line to stderr.
pub fn verbose_logger(invocation: &Invocation) {
    eprintln!("    {}", format!("$ {}", invocation).dimmed());
}

pub fn no_op_logger(_invocation: &Invocation) {}

/// A fully described external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new<S: AsRef<str>>(cwd: &Path, program: &str, args: &[S]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Prefixes the invocation with `sudo` when `elevate` is set.
    #[must_use]
    pub fn elevated(self, elevate: bool) -> Self {
        if !elevate {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            cwd: self.cwd,
        }
    }

    /// Arguments as string slices, convenient for matching in fakes.
    pub fn arg_strs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external commands and returns their trimmed stdout.
///
/// A non-zero exit status is an error carrying the command's stderr.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> anyhow::Result<String>;
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy)]
pub struct SystemRunner {
    logger: CommandLogger,
}

impl SystemRunner {
    pub fn new(logger: CommandLogger) -> Self {
        Self { logger }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(no_op_logger)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> anyhow::Result<String> {
        (self.logger)(invocation);

        let output = std::process::Command::new(&invocation.program)
            .current_dir(&invocation.cwd)
            .args(&invocation.args)
            .output()
            .with_context(|| format!("Failed to spawn {} command", invocation.program))?;

        if output.status.success() {
            let result = String::from_utf8_lossy(&output.stdout);
            Ok(result.as_ref().trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            anyhow::bail!("{} failed ({}): {}", invocation, output.status, detail)
        }
    }
}
