use clap::{Parser, Subcommand};
use deploy_update::config::{Config, DeploySettings, Verbosity};
use deploy_update::deploy::{self, DeployContext};
use deploy_update::error::DeployError;
use deploy_update::output::{self, ConsoleCallbacks};
use deploy_update::prompt::{PresetPrompt, SelectionPrompt, TerminalPrompt};
use deploy_update::runner::SystemRunner;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Select a branch and redeploy the service")]
struct Cli {
    /// Only print the branch menu, the service status and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print every step and external command
    #[arg(short, long)]
    verbose: bool,

    /// Repository to deploy (defaults to the current directory)
    #[arg(short = 'C', long = "dir", value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Settings file (defaults to deploy.toml in the repository)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check out a branch, pull, reinstall, migrate and restart (default)
    Update {
        /// Answer the branch prompt up front instead of reading stdin
        #[arg(long, value_name = "INDEX")]
        select: Option<String>,
    },
    /// Create the virtualenv and register the systemd service
    Setup,
}

impl Cli {
    fn config(&self) -> Config {
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Config { verbosity }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = cli.config();

    if let Err(err) = run(cli, config) {
        output::print_error(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: Config) -> Result<(), DeployError> {
    let root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(DeployError::WorkingDirectory)?,
    };
    output::print_working_dir(&root, &config);

    let settings = DeploySettings::load(&root, cli.config.as_deref())?;
    let runner = SystemRunner::new(config.command_logger());
    let ctx = DeployContext::new(&root, &settings, &runner);
    let callbacks = ConsoleCallbacks::new(config);

    match cli.command.unwrap_or(Command::Update { select: None }) {
        Command::Update { select } => {
            let mut preset;
            let mut terminal = TerminalPrompt;
            let prompt: &mut dyn SelectionPrompt = match select {
                Some(answer) => {
                    preset = PresetPrompt::new(&answer);
                    &mut preset
                }
                None => &mut terminal,
            };
            let report = deploy::run_update(&ctx, prompt, &callbacks)?;
            output::print_update_summary(&report, &config);
        }
        Command::Setup => {
            let report = deploy::run_setup(&ctx, &callbacks)?;
            output::print_setup_summary(&report, &config);
        }
    }
    Ok(())
}
