//! Spinners, colored output, and summary formatting.
//!
//! This module provides visual feedback while a deployment runs: one spinner
//! per step in normal mode, plain step lines in verbose mode, and nothing but
//! the branch menu and errors in quiet mode.

use crate::branch::{self, BranchEntry, Selection};
use crate::config::Config;
use crate::deploy::{CheckoutOutcome, DeployCallbacks, SetupReport, Step, UpdateReport};
use crate::error::DeployError;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

/// Spinner tick interval in milliseconds.
const PROGRESS_TICK_MS: u64 = 80;

/// Width of section banners.
const SECTION_WIDTH: usize = 50;

/// Console progress for a single deployment run.
///
/// The spinner lives in a `RefCell` because callbacks only receive `&self`.
/// It is `None` in quiet and verbose modes.
pub struct ConsoleCallbacks {
    config: Config,
    spinner: RefCell<Option<ProgressBar>>,
}

impl ConsoleCallbacks {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            spinner: RefCell::new(None),
        }
    }

    fn start_spinner(&self, step: &Step) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(format!("{}...", step));
        spinner.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
        *self.spinner.borrow_mut() = Some(spinner);
    }

    fn finish_spinner(&self, message: String) -> bool {
        match self.spinner.borrow_mut().take() {
            Some(spinner) => {
                spinner.finish_with_message(message);
                true
            }
            None => false,
        }
    }
}

impl DeployCallbacks for ConsoleCallbacks {
    fn on_step(&self, step: &Step) {
        if self.config.is_quiet() {
            return;
        }
        if self.config.is_verbose() {
            eprintln!("  {}...", step.to_string().dimmed());
        } else {
            self.start_spinner(step);
        }
    }

    fn on_step_done(&self, step: &Step) {
        if self.config.is_quiet() {
            return;
        }
        let message = format!("{} {}", "✓".green(), step);
        if !self.finish_spinner(message.clone()) {
            eprintln!("  {}", message);
        }
    }

    fn on_step_skipped(&self, step: &Step, reason: &str) {
        if self.config.is_quiet() {
            return;
        }
        println!(
            "{} {} {}",
            "-".yellow(),
            step,
            format!("(skipped: {})", reason).dimmed()
        );
    }

    fn on_step_failed(&self, step: &Step) {
        let message = format!("{} {}", "✗".red(), step);
        if !self.finish_spinner(message.clone()) && !self.config.is_quiet() {
            eprintln!("  {}", message);
        }
    }

    fn on_branches(&self, entries: &[BranchEntry]) {
        print_menu(entries);
    }

    fn on_selected(&self, selection: &Selection, auto_selected: bool) {
        if self.config.is_quiet() {
            return;
        }
        let how = if auto_selected {
            "only branch, selected automatically"
        } else {
            "selected"
        };
        println!(
            "{} {} {}",
            "→".cyan(),
            selection.resolved_reference.white().bold(),
            format!("({})", how).dimmed()
        );
    }
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Working in:".cyan(),
        path.display().to_string().white().bold()
    )
}

/// Prints the zero-based branch menu. Shown in every verbosity mode.
pub fn print_menu(entries: &[BranchEntry]) {
    println!("{}", "Available branches (newest first):".cyan().bold());
    for line in branch::menu_lines(entries) {
        println!("  {}", line);
    }
}

pub fn print_update_summary(report: &UpdateReport, config: &Config) {
    print_service_status(&report.service_status);
    if config.is_quiet() {
        println!("deployed {}", report.selection.local_branch_name);
        return;
    }

    print_section("Summary");
    let checkout = match report.checkout {
        CheckoutOutcome::SwitchedExisting => "switched to existing branch",
        CheckoutOutcome::CreatedTracking => "created tracking branch",
    };
    println!(
        "  {} {} ({})",
        "Branch".white().bold(),
        report.selection.local_branch_name.cyan(),
        checkout
    );
    println!(
        "  {} {}",
        "Upstream".white().bold(),
        if report.pulled {
            report.selection.resolved_reference.normal()
        } else {
            "none (local branch, not pulled)".yellow()
        }
    );
    println!("\n{}", "Deployment complete".green().bold());
}

pub fn print_setup_summary(report: &SetupReport, config: &Config) {
    print_service_status(&report.service_status);
    if config.is_quiet() {
        println!("setup complete");
        return;
    }

    print_section("Summary");
    print_flag("python3-venv installed", report.installed_venv_package);
    print_flag("virtualenv created", report.created_virtualenv);
    print_flag("unit file written", report.unit_written);
    if let Some(legacy) = &report.retired_legacy_service {
        println!("  {} {}", "retired legacy service".white().bold(), legacy.yellow());
    }
    println!("\n{}", "Setup complete".green().bold());
}

/// Prints a fatal error to stderr.
pub fn print_error(error: &DeployError) {
    eprintln!("{} {}", "error:".red().bold(), error);
}

fn print_service_status(status: &str) {
    if status.is_empty() {
        return;
    }
    println!("{}", status);
}

fn print_flag(label: &str, value: bool) {
    let mark = if value { "yes".green() } else { "no".dimmed() };
    println!("  {} {}", label.white().bold(), mark);
}

fn print_section(title: &str) {
    let line = "=".repeat(SECTION_WIDTH).cyan().dimmed();
    let padding = SECTION_WIDTH.saturating_sub(title.len()) / 2;
    let centered = format!("{:>width$}", title, width = padding + title.len());
    println!("\n{}\n{}\n{}\n", line, centered.cyan().bold(), line);
}
