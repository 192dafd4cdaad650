//! Kiln unified CLI tool
//!
//! Single command-line interface for the Kiln meta-build resolver:
//! resolution inspection, build-rule emission, and link-order dumps.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Declarative meta-build resolver", long_about = None)]
#[command(version)]
struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a build description and print the module set
    Resolve {
        /// Path to the build description
        #[arg(default_value = "kiln.toml")]
        manifest: PathBuf,
        /// Print the full resolution as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve and write build.ninja
    Emit {
        /// Path to the build description
        #[arg(default_value = "kiln.toml")]
        manifest: PathBuf,
        /// Output file
        #[arg(short, long, default_value = "build.ninja")]
        out: PathBuf,
    },

    /// Print the resolved static-link order per module
    Graph {
        /// Path to the build description
        #[arg(default_value = "kiln.toml")]
        manifest: PathBuf,
        /// Restrict output to one module
        #[arg(long)]
        module: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let choice = output::resolve_color_choice(cli.color.as_deref());
    let mut out = output::StyledOutput::new(choice);

    let result = match cli.command {
        Commands::Resolve { manifest, json } => commands::resolve::run(&mut out, &manifest, json),
        Commands::Emit { manifest, out: path } => commands::emit::run(&mut out, &manifest, &path),
        Commands::Graph { manifest, module } => {
            commands::graph::run(&mut out, &manifest, module.as_deref())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
