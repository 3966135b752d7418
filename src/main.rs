mod commands;
mod config;
mod diagnostics;
mod docpath;
mod error;
mod grammar;
mod index;
mod indexer;
mod info;
mod reference;
mod registry;
mod source;
mod types;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter; overrides `--log-level`.
const LOG_ENV: &str = "SHOWSRC_LOG";

#[derive(Parser)]
#[command(name = "showsrc", version, about = "Find where Ruby classes, modules, and methods are defined")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log level for diagnostics on stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Project root to index.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print only the documentation URL for a reference
    Doc {
        /// Reference such as `String`, `Foo::Bar#baz`, or `Foo.build`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        reference: Vec<String>,
    },
    /// Output reference syntax, configuration, and index statistics
    Info {
        /// Output as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// List every indexed constant and method in reference syntax
    List {
        /// Only entries with a readable source location
        #[arg(long)]
        sourced: bool,
    },
    /// Show the docs link and source definition of a reference
    Show {
        /// Reference, optionally followed by `-s`, `-ss`, ... to walk up the ancestor chain
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        reference: Vec<String>,
    },
}

/// Install the stderr tracing subscriber. `SHOWSRC_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| return EnvFilter::try_new(level))
        .unwrap_or_else(|_| return EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    return;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = run(&cli.root, cli.command);
    return result.unwrap_or_else(|e| {
        diagnostics::print_error(&e);
        return ExitCode::from(2);
    });
}

/// Dispatch a subcommand.
///
/// # Errors
///
/// Returns errors from the subcommand; they are rendered as diagnostics by `main`.
fn run(root: &Path, command: Commands) -> Result<ExitCode, error::Error> {
    return match command {
        Commands::Doc { reference } => commands::doc(root, &reference.join(" ")),
        Commands::Info { json } => {
            commands::info(root, json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::List { sourced } => {
            commands::list(root, sourced)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Show { reference } => commands::show(root, &reference.join(" ")),
    };
}
