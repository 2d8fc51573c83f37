//! Remita application binary - composition root.
//!
//! Ties the Remita crates together into a single executable:
//! 1. Load configuration from TOML (flag > env > file > defaults)
//! 2. Open the embedded ledger database (SQLite, WAL mode)
//! 3. Build the document-intelligence client from explicit config
//! 4. Dispatch the requested action and print its response as JSON
//!
//! Exit code is 0 for a SUCCESS response, 1 for FAILURE or a startup error.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use remita_action::{
    ActionResponse, DocumentIntelligenceClient, HttpDocIntelClient, ReconciliationActions,
};
use remita_core::error::RemitaError;
use remita_core::{money, RemitaConfig};
use remita_storage::Database;

mod cli;

use cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_path = args.resolve_config_path();
    let mut config = RemitaConfig::load_or_default(&config_path);
    if let Some(data_dir) = args.resolve_data_dir() {
        config.general.data_dir = data_dir;
    }
    if let Some(log_level) = args.resolve_log_level() {
        config.general.log_level = log_level;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args.command, config).await {
        Ok(response) => {
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{}", json),
                Err(_) => println!("{}: {}", response.status, response.message),
            }
            if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("remita: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: RemitaConfig) -> Result<ActionResponse, RemitaError> {
    let db = Arc::new(Database::new(&config.db_path())?);
    let client: Arc<dyn DocumentIntelligenceClient> =
        Arc::new(HttpDocIntelClient::new(&config.docintel)?);
    let actions = ReconciliationActions::new(db, client, config);

    let response = match command {
        Command::Fetch { remittance_id } => {
            actions.get_remittance_work_item(&remittance_id).await
        }
        Command::Reconcile {
            remittance_id,
            threshold,
        } => {
            let threshold = threshold
                .as_deref()
                .map(money::parse_amount)
                .transpose()?;
            actions
                .store_and_analyze_payment(&remittance_id, threshold)
                .await
        }
        Command::Complete {
            remittance_id,
            summary,
            report,
            reconciled,
        } => {
            actions
                .update_work_item_status(&remittance_id, &summary, &report, reconciled)
                .await
        }
        Command::Purge { confirm } => actions.purge_ledger(&confirm).await,
    };

    Ok(response)
}
