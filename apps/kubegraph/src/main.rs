//! # kubegraph
//!
//! Command-line front end for the kubegraph manifest engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            apps/kubegraph (THE BINARY)       │
//! │                                              │
//! │   ┌─────────────┐        ┌──────────────┐    │
//! │   │    CLI      │        │   Config     │    │
//! │   │   (clap)    │        │   (toml)     │    │
//! │   └──────┬──────┘        └──────┬───────┘    │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │              ┌────────────────┐              │
//! │              │ kubegraph-core │              │
//! │              │  (THE ENGINE)  │              │
//! │              └────────────────┘              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! kubegraph graph k8s/
//! kubegraph validate k8s/ --fail-on-warnings
//! kubegraph render k8s/ --file k8s/web.yaml --output web.yaml
//! kubegraph status k8s/ --json-mode
//! ```

use clap::Parser;
use kubegraph::cli;
use kubegraph::config::{Config, LogFormat};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // The config may pick the log format, so it is read before tracing starts.
    let config = Config::load(cli.config.as_deref());
    let log_format = LogFormat::from_env().unwrap_or_else(|| {
        config
            .as_ref()
            .map(|c| c.log.format)
            .unwrap_or_default()
    });
    init_tracing(log_format, cli.quiet);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli::execute(cli, &config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing on stderr. `KUBEGRAPH_LOG_FORMAT=json` (or the config
/// file) enables machine-parseable output. `RUST_LOG` wins over `--quiet`.
fn init_tracing(format: LogFormat, quiet: bool) {
    let default_filter = if quiet {
        "kubegraph=warn,kubegraph_core=warn"
    } else {
        "kubegraph=info,kubegraph_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
