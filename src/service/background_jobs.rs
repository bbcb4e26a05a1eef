// service/background_jobs.rs
use std::future::Future;
use std::sync::Arc;

use tokio::time::{interval, sleep, Duration};

use crate::service::{reconciliation, repair};
use crate::AppState;

// First reconciliation shortly after boot, first repair a little later so
// the two jobs never start on top of each other.
const RECONCILIATION_STARTUP_DELAY: Duration = Duration::from_secs(60);
const REPAIR_STARTUP_DELAY: Duration = Duration::from_secs(300);
const REPAIR_INTERVAL: Duration = Duration::from_secs(3600);
const PANIC_COOLDOWN: Duration = Duration::from_secs(300);

/// Periodic cache reload + withdrawal reconciliation.
pub async fn start_reconciliation_job(state: Arc<AppState>) {
    sleep(RECONCILIATION_STARTUP_DELAY).await;
    // A zero period would panic the timer here, outside any containment,
    // killing the job task for good. Config already rejects zero; clamp
    // anyway so the loop machinery itself cannot die silently.
    let hours = state.env.sync_interval_hours.max(1);
    let mut ticker = interval(Duration::from_secs(hours * 3600));
    loop {
        ticker.tick().await;
        let state = state.clone();
        run_contained("reconciliation", async move {
            run_reconciliation_pass(&state).await;
        })
        .await;
    }
}

/// Hourly pending-payout column repair.
pub async fn start_payout_repair_job(state: Arc<AppState>) {
    sleep(REPAIR_STARTUP_DELAY).await;
    let mut ticker = interval(REPAIR_INTERVAL);
    loop {
        ticker.tick().await;
        let state = state.clone();
        run_contained("payout-repair", async move {
            match repair::repair_pending_payouts(state.repo.store()).await {
                Ok(rows) => tracing::info!(rows, "payout repair pass complete"),
                Err(e) => tracing::error!(error = %e, "payout repair pass failed"),
            }
        })
        .await;
    }
}

async fn run_reconciliation_pass(state: &AppState) {
    // A failed reload is not fatal: the previous snapshot stays in place
    // and the dedup filter still holds.
    if let Err(e) = state.repo.reload_cache().await {
        tracing::error!(error = %e, "cache reload failed, continuing with previous snapshot");
    }
    match reconciliation::sync_withdrawals(&state.repo).await {
        Ok(report) => tracing::info!(
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            "withdrawal sync complete"
        ),
        Err(e) => tracing::error!(error = %e, "withdrawal sync failed"),
    }
}

/// Runs one pass on its own task so a panic is contained at the job
/// boundary; the job loop resumes after a cooldown instead of taking the
/// process down.
async fn run_contained<F>(job: &str, pass: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(e) = tokio::spawn(pass).await {
        if e.is_panic() {
            tracing::error!(job, "background pass panicked, cooling down before restart");
            sleep(PANIC_COOLDOWN).await;
        } else {
            tracing::warn!(job, error = %e, "background pass did not finish");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repo::ReferralRepo;
    use crate::store::memory::MemoryStore;

    fn state_with_interval(hours: u64) -> Arc<AppState> {
        let store = Arc::new(MemoryStore::new());
        Arc::new(AppState {
            env: Config {
                spreadsheet_id: "sheet".into(),
                credentials_path: "credentials.json".into(),
                sync_interval_hours: hours,
            },
            repo: Arc::new(ReferralRepo::new(store)),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_pass_does_not_propagate() {
        run_contained("test-job", async { panic!("boom") }).await;
        // Reaching this point means the panic stayed inside the pass task.
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_does_not_kill_the_job_task() {
        let handle = tokio::spawn(start_reconciliation_job(state_with_interval(0)));

        // Past the startup delay and the first tick; an unclamped zero
        // period would have panicked the timer and finished the task.
        sleep(RECONCILIATION_STARTUP_DELAY + Duration::from_secs(60)).await;
        assert!(!handle.is_finished());
        handle.abort();
    }
}
