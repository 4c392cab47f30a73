//! # Spurplan CLI Module
//!
//! This module implements the CLI interface for Spurplan.
//!
//! ## Available Commands
//!
//! - `link` - Link a converted element batch against a link configuration
//! - `validate` - Validate an element batch against the built-in schemas
//! - `tags` - List the known process tags and their rules

mod commands;

use clap::{Parser, Subcommand};
use spurplan_core::SpurplanError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Spurplan - Infrastructure Linking & Validation
///
/// A deterministic core that resolves cross-references between independently
/// converted infrastructure elements and validates them per type.
#[derive(Parser, Debug)]
#[command(name = "spurplan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Link a converted element batch
    Link {
        /// Path to the element batch (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the link configuration (TOML)
        #[arg(short, long)]
        links: PathBuf,

        /// Fail (exit code 2) when any element is invalid after linking
        #[arg(short, long)]
        strict: bool,

        /// Write the run report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the linked elements (with materialized references) to this file
        #[arg(short = 'e', long)]
        elements_out: Option<PathBuf>,
    },

    /// Validate an element batch against the built-in schemas
    Validate {
        /// Path to the element batch (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Write the validation report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the known process tags and their rules
    Tags,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments. Returns the process exit code.
pub fn execute(cli: Cli) -> Result<i32, SpurplanError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Link {
            file,
            links,
            strict,
            output,
            elements_out,
        }) => cmd_link(
            &file,
            &links,
            strict,
            output.as_deref(),
            elements_out.as_deref(),
        ),
        Some(Commands::Validate { file, output }) => {
            cmd_validate(&file, output.as_deref()).map(|()| 0)
        }
        Some(Commands::Tags) | None => {
            // No subcommand - show the tag table by default
            cmd_tags(json_mode);
            Ok(0)
        }
    }
}
