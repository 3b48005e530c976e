use std::ffi::OsString;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{self, Command};

use clap::{Args, Parser, Subcommand};
use envscan::{CircularPolicy, EnvLoader, Error, SubstitutionMode, TargetEnv};
use tracing_subscriber::EnvFilter;

/// Run commands with variables loaded from dotenv files
#[derive(Parser, Debug)]
#[command(name = "dotenv", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Load dotenv files and execute a command
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Dotenv file path(s). Repeat or pass comma-separated paths.
    #[arg(short = 'f', long = "file", value_delimiter = ',', default_value = ".env")]
    files: Vec<PathBuf>,

    /// Ignore missing dotenv files
    #[arg(short = 'i', long = "ignore-missing", visible_alias = "ignore")]
    ignore_missing: bool,

    /// Override existing environment variables
    #[arg(short = 'o', long = "override", visible_alias = "overload")]
    override_existing: bool,

    /// Keep `${NAME}` references as written
    #[arg(long)]
    no_expand: bool,

    /// Fail on circular variable references
    #[arg(long)]
    strict: bool,

    /// Print loader diagnostics to stderr
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Command to execute, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

impl RunArgs {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    fn loader(&self) -> EnvLoader {
        let substitution_mode = if self.no_expand {
            SubstitutionMode::Disabled
        } else {
            SubstitutionMode::Expand
        };
        let circular_policy = if self.strict {
            CircularPolicy::Error
        } else {
            CircularPolicy::KeepPartial
        };

        EnvLoader::new()
            .paths(&self.files)
            .required(!self.ignore_missing)
            .substitution_mode(substitution_mode)
            .circular_policy(circular_policy)
            .override_existing(true)
            .target(TargetEnv::memory())
    }
}

fn main() {
    let cli = Cli::parse();
    let Cmd::Run(args) = cli.command;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    match execute_run(&args) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("dotenv: {err}");
            process::exit(1);
        }
    }
}

fn execute_run(args: &RunArgs) -> Result<i32, String> {
    let mut loader = args.loader();
    let report = loader.load().map_err(format_loader_error)?;
    tracing::debug!(?report, "loaded dotenv files");

    let Some((program, program_args)) = args.command.split_first() else {
        return Err("missing command after `run`".to_owned());
    };
    let mut command = Command::new(program);
    command.args(program_args);

    let loaded = loader.into_target().into_memory().unwrap_or_default();
    for (key, value) in loaded {
        if !args.override_existing && std::env::var_os(&key).is_some() {
            continue;
        }
        command.env(key, value);
    }

    execute_command(command, program)
}

#[cfg(unix)]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let err = command.exec();
    Err(format!(
        "failed to execute `{}`: {err}",
        program.to_string_lossy()
    ))
}

#[cfg(not(unix))]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let status = command
        .status()
        .map_err(|err| format!("failed to execute `{}`: {err}", program.to_string_lossy()))?;
    Ok(status.code().unwrap_or(1))
}

fn format_loader_error(err: Error) -> String {
    match err {
        Error::CircularReference { key, path } => format!(
            "circular variable reference in `{key}` ({}); drop --strict to keep the partial value",
            path.display()
        ),
        other => other.to_string(),
    }
}
