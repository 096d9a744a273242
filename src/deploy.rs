//! Update and setup procedures.
//!
//! Both are an ordered list of named steps. Each step either succeeds or the
//! whole run stops with [`DeployError::StepFailed`] naming it; nothing is
//! retried or rolled back.

use crate::branch::{self, BranchEntry, Selection};
use crate::config::DeploySettings;
use crate::error::DeployError;
use crate::git::GitRepo;
use crate::prompt::SelectionPrompt;
use crate::python::PythonEnv;
use crate::runner::CommandRunner;
use crate::systemd::{Systemctl, UnitSpec};
use anyhow::Context;
use std::fmt;
use std::path::Path;

/// Directory under the repository root where generated unit files are staged.
const STAGING_DIR: &str = ".deploy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Fetching,
    ListingBranches,
    ReadingSelection,
    CheckingOut { branch: String },
    Pulling { reference: String },
    CheckingSystemPackages,
    CreatingVirtualenv,
    InstallingDependencies,
    Migrating,
    RetiringLegacyService { service: String },
    InstallingUnit { service: String },
    EnablingService { service: String },
    RestartingService { service: String },
    QueryingStatus { service: String },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Fetching => write!(f, "Fetching from remotes"),
            Step::ListingBranches => write!(f, "Listing branches"),
            Step::ReadingSelection => write!(f, "Reading branch selection"),
            Step::CheckingOut { branch } => write!(f, "Checking out {}", branch),
            Step::Pulling { reference } => write!(f, "Pulling {}", reference),
            Step::CheckingSystemPackages => write!(f, "Checking system packages"),
            Step::CreatingVirtualenv => write!(f, "Creating virtualenv"),
            Step::InstallingDependencies => write!(f, "Installing dependencies"),
            Step::Migrating => write!(f, "Running migration"),
            Step::RetiringLegacyService { service } => {
                write!(f, "Retiring legacy service {}", service)
            }
            Step::InstallingUnit { service } => write!(f, "Installing unit for {}", service),
            Step::EnablingService { service } => write!(f, "Enabling {}", service),
            Step::RestartingService { service } => write!(f, "Restarting {}", service),
            Step::QueryingStatus { service } => write!(f, "Querying status of {}", service),
        }
    }
}

/// Which checkout path was taken for the selected branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    SwitchedExisting,
    CreatedTracking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub selection: Selection,
    /// `false` when the operator picked from the menu rather than the single entry.
    pub auto_selected: bool,
    pub checkout: CheckoutOutcome,
    /// `false` for local-only branches, which have nothing to pull from.
    pub pulled: bool,
    /// `systemctl status` output, verbatim.
    pub service_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub installed_venv_package: bool,
    pub created_virtualenv: bool,
    pub retired_legacy_service: Option<String>,
    pub unit_written: bool,
    pub service_status: String,
}

/// Progress notifications emitted while a procedure runs.
pub trait DeployCallbacks {
    fn on_step(&self, step: &Step);
    fn on_step_done(&self, step: &Step);
    fn on_step_skipped(&self, step: &Step, reason: &str);
    fn on_step_failed(&self, step: &Step);
    fn on_branches(&self, entries: &[BranchEntry]);
    fn on_selected(&self, selection: &Selection, auto_selected: bool);
}

/// No-op callbacks for when progress tracking is not needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCallbacks;

impl DeployCallbacks for NoOpCallbacks {
    fn on_step(&self, _step: &Step) {}
    fn on_step_done(&self, _step: &Step) {}
    fn on_step_skipped(&self, _step: &Step, _reason: &str) {}
    fn on_step_failed(&self, _step: &Step) {}
    fn on_branches(&self, _entries: &[BranchEntry]) {}
    fn on_selected(&self, _selection: &Selection, _auto_selected: bool) {}
}

/// The working tree being deployed, its settings and the command runner.
#[derive(Clone, Copy)]
pub struct DeployContext<'a> {
    pub root: &'a Path,
    pub settings: &'a DeploySettings,
    pub runner: &'a dyn CommandRunner,
}

impl<'a> DeployContext<'a> {
    pub fn new(
        root: &'a Path,
        settings: &'a DeploySettings,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            root,
            settings,
            runner,
        }
    }

    pub fn git(&self) -> GitRepo<'a> {
        GitRepo::new(self.root, self.runner)
    }

    pub fn python(&self) -> PythonEnv<'a> {
        PythonEnv::new(self.root, &self.settings.venv_dir, self.runner)
    }

    pub fn systemctl(&self) -> Systemctl<'a> {
        Systemctl::new(self.root, self.settings.use_sudo, self.runner)
    }
}

fn at_step<T>(step: Step, result: anyhow::Result<T>) -> Result<T, DeployError> {
    result.map_err(|cause| DeployError::StepFailed { step, cause })
}

fn execute<T, F>(callbacks: &dyn DeployCallbacks, step: Step, action: F) -> Result<T, DeployError>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    callbacks.on_step(&step);
    let result = action();
    match &result {
        Ok(_) => callbacks.on_step_done(&step),
        Err(_) => callbacks.on_step_failed(&step),
    }
    at_step(step, result)
}

/// Remote-tracking branches, or local branches when there are none.
pub fn collect_branches(git: &GitRepo<'_>) -> anyhow::Result<Vec<BranchEntry>> {
    let remote = git.list_remote_branches()?;
    if !remote.is_empty() {
        return Ok(remote);
    }
    git.list_local_branches()
}

/// Picks the single entry automatically, otherwise asks the operator once.
///
/// Returns the selection and whether it was made without prompting.
pub fn choose_branch(
    entries: &[BranchEntry],
    prompt: &mut dyn SelectionPrompt,
) -> Result<(Selection, bool), DeployError> {
    if entries.is_empty() {
        return Err(DeployError::EmptyBranchSet);
    }
    if entries.len() == 1 {
        return Ok((Selection::from_entries(entries, 0)?, true));
    }

    let input = at_step(
        Step::ReadingSelection,
        prompt.read_selection(entries.len()),
    )?;
    let index = branch::parse_selection(&input, entries.len())?;
    Ok((Selection::from_entries(entries, index)?, false))
}

/// Switches to the selected branch, creating it to track the remote ref if needed.
pub fn checkout_selection(
    git: &GitRepo<'_>,
    selection: &Selection,
) -> anyhow::Result<CheckoutOutcome> {
    let name = &selection.local_branch_name;
    if git.local_branch_exists(name)? {
        git.checkout(name)?;
        return Ok(CheckoutOutcome::SwitchedExisting);
    }

    if selection.upstream().is_none() {
        anyhow::bail!("Local branch '{}' no longer exists", name);
    }
    git.checkout_tracking(name, &selection.resolved_reference)?;
    Ok(CheckoutOutcome::CreatedTracking)
}

/// Select a branch, check it out, pull it, reinstall, migrate and restart.
pub fn run_update(
    ctx: &DeployContext<'_>,
    prompt: &mut dyn SelectionPrompt,
    callbacks: &dyn DeployCallbacks,
) -> Result<UpdateReport, DeployError> {
    let git = ctx.git();
    let settings = ctx.settings;

    let has_remotes = at_step(Step::Fetching, git.has_remotes())?;
    if has_remotes {
        execute(callbacks, Step::Fetching, || git.fetch_prune())?;
    } else {
        callbacks.on_step_skipped(&Step::Fetching, "no remotes configured");
    }

    let entries = execute(callbacks, Step::ListingBranches, || collect_branches(&git))?;
    if entries.is_empty() {
        return Err(DeployError::EmptyBranchSet);
    }
    callbacks.on_branches(&entries);

    let (selection, auto_selected) = choose_branch(&entries, prompt)?;
    callbacks.on_selected(&selection, auto_selected);

    let checkout = execute(
        callbacks,
        Step::CheckingOut {
            branch: selection.local_branch_name.clone(),
        },
        || checkout_selection(&git, &selection),
    )?;

    let pull_step = Step::Pulling {
        reference: selection.resolved_reference.clone(),
    };
    let pulled = match selection.upstream() {
        Some((remote, branch)) => {
            execute(callbacks, pull_step, || git.pull(remote, branch))?;
            true
        }
        None => {
            callbacks.on_step_skipped(&pull_step, "local branch has no remote to pull from");
            false
        }
    };

    let python = ctx.python();
    execute(callbacks, Step::InstallingDependencies, || {
        python.install_requirements(&settings.requirements)
    })?;
    execute(callbacks, Step::Migrating, || {
        python.run_migration(&settings.migration)
    })?;

    let service = settings.service.as_str();
    let systemctl = ctx.systemctl();
    execute(
        callbacks,
        Step::RestartingService {
            service: service.to_string(),
        },
        || systemctl.restart(service),
    )?;
    let service_status = execute(
        callbacks,
        Step::QueryingStatus {
            service: service.to_string(),
        },
        || systemctl.status(service),
    )?;

    Ok(UpdateReport {
        selection,
        auto_selected,
        checkout,
        pulled,
        service_status,
    })
}

/// Provision the virtualenv and register the service. Safe to re-run.
pub fn run_setup(
    ctx: &DeployContext<'_>,
    callbacks: &dyn DeployCallbacks,
) -> Result<SetupReport, DeployError> {
    let settings = ctx.settings;
    let python = ctx.python();
    let systemctl = ctx.systemctl();
    let service = settings.service.as_str();

    let installed_venv_package = execute(callbacks, Step::CheckingSystemPackages, || {
        if python.venv_package_installed() {
            return Ok(false);
        }
        python.install_venv_package(settings.use_sudo)?;
        Ok(true)
    })?;

    let created_virtualenv = if python.exists() {
        callbacks.on_step_skipped(&Step::CreatingVirtualenv, "virtualenv already exists");
        false
    } else {
        execute(callbacks, Step::CreatingVirtualenv, || python.create())?;
        true
    };

    execute(callbacks, Step::InstallingDependencies, || {
        python.install_requirements(&settings.requirements)
    })?;

    let retired_legacy_service = match settings.legacy_service() {
        Some(legacy) if legacy != service && settings.unit_path(legacy).exists() => {
            execute(
                callbacks,
                Step::RetiringLegacyService {
                    service: legacy.to_string(),
                },
                || retire_service(&systemctl, settings, legacy),
            )?;
            Some(legacy.to_string())
        }
        Some(legacy) => {
            callbacks.on_step_skipped(
                &Step::RetiringLegacyService {
                    service: legacy.to_string(),
                },
                "no legacy unit installed",
            );
            None
        }
        None => None,
    };

    let unit_step = Step::InstallingUnit {
        service: service.to_string(),
    };
    let unit = UnitSpec {
        description: settings.description.clone(),
        user: settings.resolved_user(),
        working_directory: ctx.root.display().to_string(),
        exec_start: settings.resolved_exec_start(ctx.root),
    }
    .render();
    let destination = settings.unit_path(service);
    let unit_written = if unit_is_current(&destination, &unit) {
        callbacks.on_step_skipped(&unit_step, "unit file is up to date");
        false
    } else {
        execute(callbacks, unit_step, || {
            let staged = stage_unit_file(ctx.root, service, &unit)?;
            systemctl.install_unit_file(&staged, &destination)?;
            systemctl.daemon_reload()
        })?;
        true
    };

    execute(
        callbacks,
        Step::EnablingService {
            service: service.to_string(),
        },
        || {
            systemctl.enable(service)?;
            systemctl.restart(service)
        },
    )?;
    let service_status = execute(
        callbacks,
        Step::QueryingStatus {
            service: service.to_string(),
        },
        || systemctl.status(service),
    )?;

    Ok(SetupReport {
        installed_venv_package,
        created_virtualenv,
        retired_legacy_service,
        unit_written,
        service_status,
    })
}

fn retire_service(
    systemctl: &Systemctl<'_>,
    settings: &DeploySettings,
    legacy: &str,
) -> anyhow::Result<()> {
    systemctl.stop(legacy)?;
    systemctl.disable(legacy)?;
    systemctl.remove_unit_file(&settings.unit_path(legacy))?;
    systemctl.daemon_reload()
}

fn unit_is_current(destination: &Path, rendered: &str) -> bool {
    std::fs::read_to_string(destination).is_ok_and(|installed| installed == rendered)
}

fn stage_unit_file(root: &Path, service: &str, unit: &str) -> anyhow::Result<std::path::PathBuf> {
    let dir = root.join(STAGING_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create staging directory {}", dir.display()))?;
    let staged = dir.join(format!("{}.service", service));
    std::fs::write(&staged, unit)
        .with_context(|| format!("Failed to write {}", staged.display()))?;
    Ok(staged)
}
