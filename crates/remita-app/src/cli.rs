//! CLI argument definitions for the Remita binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Remita — payment-remittance reconciliation agent.
#[derive(Parser, Debug)]
#[command(name = "remita", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory for the SQLite ledger database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a remittance work item and initialize its processing context.
    Fetch {
        /// Work item id of the remittance document.
        remittance_id: String,
    },
    /// Store the remittance payment and analyze its reconciliation.
    Reconcile {
        /// Work item id of the remittance document.
        remittance_id: String,
        /// Tolerance for the discrepancy check (e.g. "0.01"). Defaults to
        /// the configured tolerance.
        #[arg(long)]
        threshold: Option<String>,
    },
    /// Write the reconciliation outcome back to the upstream work item.
    Complete {
        /// Work item id of the remittance document.
        remittance_id: String,
        /// One-line status summary.
        #[arg(long)]
        summary: String,
        /// Detailed report attached to the completion.
        #[arg(long, default_value = "")]
        report: String,
        /// Whether the payment reconciled.
        #[arg(long)]
        reconciled: bool,
    },
    /// Delete all ledger data. Requires the exact confirmation text.
    Purge {
        /// Confirmation text; must be exactly "DELETE ALL LEDGER DATA".
        #[arg(long)]
        confirm: String,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > REMITA_CONFIG env var > ~/.remita/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("REMITA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory path.
    ///
    /// Priority: --data-dir flag > config file value.
    /// Returns `None` if not overridden (use config default).
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".remita").join("config.toml");
    }
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".remita").join("config.toml");
    }
    PathBuf::from("config.toml")
}
