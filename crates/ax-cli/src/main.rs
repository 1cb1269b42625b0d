//! CLI frontend for inspecting articy exports and running expresso fragments.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ax",
    about = "Inspect articy exports and run expresso scripts against them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the packages in an export
    Packages {
        /// Export directory containing manifest.json
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// List objects from every package
    List {
        /// Only objects of this type or a type inheriting from it
        kind: Option<String>,

        /// Only objects from this package
        #[arg(short, long)]
        package: Option<String>,

        /// Export directory containing manifest.json
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show one object's properties and scripts
    Show {
        /// Technical name, `0x` hex id, decimal id, or `<id>_<clone>` handle
        object: String,

        /// Export directory containing manifest.json
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show global variables and their defaults
    Vars {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Export directory containing manifest.json
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Evaluate a condition, or execute an instruction, against an export
    Eval {
        /// Fragment text
        script: String,

        /// Treat the fragment as an instruction
        #[arg(short, long)]
        instruction: bool,

        /// Bind `self` to this object (same forms as `show`)
        #[arg(long = "self")]
        self_object: Option<String>,

        /// Set a variable first, as `Namespace.Variable=value` (repeatable)
        #[arg(long = "set")]
        assignments: Vec<String>,

        /// RNG seed for `random`
        #[arg(long)]
        seed: Option<u64>,

        /// Export directory containing manifest.json
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Compile every script fragment and report diagnostics
    Check {
        /// Export directory containing manifest.json
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Packages { dir } => commands::packages::run(&dir),
        Commands::List { kind, package, dir } => {
            commands::list::run(&dir, kind.as_deref(), package.as_deref())
        }
        Commands::Show { object, dir } => commands::show::run(&dir, &object),
        Commands::Vars { json, dir } => commands::vars::run(&dir, json),
        Commands::Eval {
            script,
            instruction,
            self_object,
            assignments,
            seed,
            dir,
        } => commands::eval::run(
            &dir,
            &script,
            commands::eval::EvalOptions {
                instruction,
                self_object,
                assignments,
                seed,
            },
        ),
        Commands::Check { dir } => commands::check::run(&dir),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
