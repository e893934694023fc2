//! # kubegraph CLI Module
//!
//! This module implements the CLI interface for kubegraph.
//!
//! ## Available Commands
//!
//! - `graph` - Print the graph snapshot as JSON
//! - `validate` - Run the Validator and report findings
//! - `render` - Regenerate the manifest text of one loaded file
//! - `status` - Show node, edge and file counts
//!
//! Every command takes one or more manifest files or directories.

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use kubegraph_core::KubegraphError;
use std::path::PathBuf;
use std::process::ExitCode;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// kubegraph - Kubernetes manifests as a relationship graph
///
/// Loads manifests, infers how resources reference each other, checks them
/// for structural and cross-reference problems, and regenerates manifest
/// text from the graph.
#[derive(Parser, Debug)]
#[command(name = "kubegraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a kubegraph.toml config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the graph snapshot (nodes, edges, files) as JSON
    Graph {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Validate manifests and report findings
    Validate {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Exit non-zero on warnings too
        #[arg(long)]
        fail_on_warnings: bool,
    },

    /// Regenerate the manifest text of one loaded file
    Render {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// The loaded file to regenerate
        #[arg(short, long)]
        file: PathBuf,

        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show graph status
    Status {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and a loaded config.
pub fn execute(cli: Cli, config: &Config) -> Result<ExitCode, KubegraphError> {
    let json_mode = cli.json_mode;
    let scan = &config.scan;

    match cli.command {
        Commands::Graph { paths } => cmd_graph(&paths, scan).map(|()| ExitCode::SUCCESS),
        Commands::Validate {
            paths,
            fail_on_warnings,
        } => {
            let strict = fail_on_warnings || config.validate.fail_on_warnings;
            let passed = cmd_validate(&paths, scan, json_mode, strict)?;
            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Render {
            paths,
            file,
            output,
        } => cmd_render(&paths, scan, &file, output.as_deref(), cli.quiet)
            .map(|()| ExitCode::SUCCESS),
        Commands::Status { paths } => {
            cmd_status(&paths, scan, json_mode).map(|()| ExitCode::SUCCESS)
        }
    }
}
