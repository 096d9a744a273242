//! systemd service management and unit file rendering.

use crate::runner::{CommandRunner, Invocation};
use anyhow::Context;
use std::path::Path;

/// Values substituted into the generated unit file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub description: String,
    pub user: String,
    pub working_directory: String,
    pub exec_start: String,
}

impl UnitSpec {
    pub fn render(&self) -> String {
        format!(
            "[Unit]\n\
             Description={}\n\
             After=network.target\n\
             \n\
             [Service]\n\
             User={}\n\
             WorkingDirectory={}\n\
             ExecStart={}\n\
             Restart=always\n\
             RestartSec=5\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n",
            self.description, self.user, self.working_directory, self.exec_start
        )
    }
}

/// `systemctl` and unit file plumbing, elevated through `sudo` when configured.
#[derive(Clone, Copy)]
pub struct Systemctl<'a> {
    cwd: &'a Path,
    use_sudo: bool,
    runner: &'a dyn CommandRunner,
}

impl<'a> Systemctl<'a> {
    pub fn new(cwd: &'a Path, use_sudo: bool, runner: &'a dyn CommandRunner) -> Self {
        Self {
            cwd,
            use_sudo,
            runner,
        }
    }

    fn privileged(&self, program: &str, args: &[&str]) -> anyhow::Result<String> {
        let inv = Invocation::new(self.cwd, program, args).elevated(self.use_sudo);
        self.runner.run(&inv)
    }

    fn systemctl(&self, args: &[&str]) -> anyhow::Result<String> {
        self.privileged("systemctl", args)
    }

    pub fn restart(&self, service: &str) -> anyhow::Result<()> {
        self.systemctl(&["restart", service])
            .with_context(|| format!("Failed to restart {}", service))?;
        Ok(())
    }

    /// Returns `systemctl status` output unparsed.
    pub fn status(&self, service: &str) -> anyhow::Result<String> {
        self.systemctl(&["status", service, "--no-pager"])
            .with_context(|| format!("Failed to query status of {}", service))
    }

    pub fn enable(&self, service: &str) -> anyhow::Result<()> {
        self.systemctl(&["enable", service])
            .with_context(|| format!("Failed to enable {}", service))?;
        Ok(())
    }

    pub fn stop(&self, service: &str) -> anyhow::Result<()> {
        self.systemctl(&["stop", service])
            .with_context(|| format!("Failed to stop {}", service))?;
        Ok(())
    }

    pub fn disable(&self, service: &str) -> anyhow::Result<()> {
        self.systemctl(&["disable", service])
            .with_context(|| format!("Failed to disable {}", service))?;
        Ok(())
    }

    pub fn daemon_reload(&self) -> anyhow::Result<()> {
        self.systemctl(&["daemon-reload"])
            .context("Failed to reload systemd units")?;
        Ok(())
    }

    /// Copies a staged unit file into place with mode 0644.
    pub fn install_unit_file(&self, staged: &Path, destination: &Path) -> anyhow::Result<()> {
        let staged = staged.display().to_string();
        let destination = destination.display().to_string();
        self.privileged("install", &["-m", "644", staged.as_str(), destination.as_str()])
            .with_context(|| format!("Failed to install unit file {}", destination))?;
        Ok(())
    }

    pub fn remove_unit_file(&self, unit: &Path) -> anyhow::Result<()> {
        let unit = unit.display().to_string();
        self.privileged("rm", &["-f", unit.as_str()])
            .with_context(|| format!("Failed to remove unit file {}", unit))?;
        Ok(())
    }
}
