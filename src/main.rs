use std::sync::Arc;

use dotenv::dotenv;
use refledger::config::Config;
use refledger::repo::ReferralRepo;
use refledger::service;
use refledger::store::sheets::SheetsStore;
use refledger::AppState;
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    dotenv().ok();

    let config = Config::init();

    let store = match SheetsStore::new(&config.spreadsheet_id, &config.credentials_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "failed to create sheets client");
            std::process::exit(1);
        }
    };

    let repo = Arc::new(ReferralRepo::new(store));

    // The cache is rebuilt on every reconciliation tick anyway; a failed
    // initial load is a warning, not a startup failure.
    match repo.reload_cache().await {
        Ok(()) => tracing::info!("✅ initial cache load complete"),
        Err(e) => tracing::warn!(error = %e, "initial cache load failed, starting with empty cache"),
    }

    let state = Arc::new(AppState { env: config, repo });

    tokio::spawn(service::background_jobs::start_reconciliation_job(
        state.clone(),
    ));
    tokio::spawn(service::background_jobs::start_payout_repair_job(
        state.clone(),
    ));

    tracing::info!(
        sync_interval_hours = state.env.sync_interval_hours,
        "referral ledger service started"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
