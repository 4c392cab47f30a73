//! # Spurplan - Infrastructure Linking & Validation
//!
//! The main binary for the Spurplan deterministic linking core.
//!
//! This application provides:
//! - CLI interface for linking converted element batches
//! - Schema validation with per-type batch reports
//! - Introspection of the built-in process-tag table
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │               apps/spurplan (THE BINARY)              │
//! │                                                       │
//! │  ┌─────────────┐   ┌──────────────┐   ┌───────────┐  │
//! │  │    CLI      │   │  File Input  │   │  Reports  │  │
//! │  │   (clap)    │   │ (JSON/TOML)  │   │  (JSON)   │  │
//! │  └──────┬──────┘   └──────┬───────┘   └─────┬─────┘  │
//! │         │                 │                 │         │
//! │         └─────────────────┼─────────────────┘         │
//! │                           ▼                           │
//! │                  ┌────────────────┐                   │
//! │                  │ spurplan-core  │                   │
//! │                  │  (THE LOGIC)   │                   │
//! │                  └────────────────┘                   │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Link a converted batch against a link configuration
//! spurplan link -f elements.json -l links.toml
//!
//! # Validate elements against the built-in schemas
//! spurplan validate -f elements.json
//!
//! # List the known process tags
//! spurplan tags
//! ```

mod cli;
mod input;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing — SPURPLAN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SPURPLAN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "spurplan=debug,spurplan_core=debug"
    } else {
        "spurplan=info,spurplan_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    match cli::execute(cli) {
        Ok(code) if code != 0 => std::process::exit(code),
        Ok(_) => {}
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print the Spurplan startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗██████╗ ██╗   ██╗██████╗ ██████╗ ██╗      █████╗ ███╗   ██╗
  ██╔════╝██╔══██╗██║   ██║██╔══██╗██╔══██╗██║     ██╔══██╗████╗  ██║
  ███████╗██████╔╝██║   ██║██████╔╝██████╔╝██║     ███████║██╔██╗ ██║
  ╚════██║██╔═══╝ ██║   ██║██╔══██╗██╔═══╝ ██║     ██╔══██║██║╚██╗██║
  ███████║██║     ╚██████╔╝██║  ██║██║     ███████╗██║  ██║██║ ╚████║
  ╚══════╝╚═╝      ╚═════╝ ╚═╝  ╚═╝╚═╝     ╚══════╝╚═╝  ╚═╝╚═╝  ╚═══╝

  Infrastructure Linking & Validation v{}

  Deterministic • Order-Independent • Verifiable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
