// service/reconciliation.rs
//
// Turns newly observed withdrawal events into ledger entries and balance
// accruals, at most once per deal id. A failed event is logged and left for
// the next pass, where the dedup filter decides its fate again; there are no
// retries at this layer.
use chrono::Utc;

use crate::error::AppError;
use crate::models::{LedgerEntry, Withdrawal};
use crate::repo::ReferralRepo;

pub const BONUS_RATE: f64 = 0.10;
pub const LEDGER_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn compute_bonus(profit: f64) -> f64 {
    profit * BONUS_RATE
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, PartialEq)]
pub enum SyncOutcome {
    Applied { bonus: f64 },
    /// The actor has no invited binding: a legitimate non-referral
    /// transaction, not an error.
    NotReferral,
    /// The binding points at a code with no referrer row behind it.
    DanglingReferrer,
}

pub async fn sync_withdrawals(repo: &ReferralRepo) -> Result<SyncReport, AppError> {
    let withdrawals = repo.fetch_new_withdrawals().await?;
    if withdrawals.is_empty() {
        tracing::info!("no new withdrawals");
        return Ok(SyncReport::default());
    }
    tracing::info!(count = withdrawals.len(), "processing new withdrawals");

    let mut report = SyncReport::default();
    for withdrawal in &withdrawals {
        match process_withdrawal(repo, withdrawal).await {
            Ok(SyncOutcome::Applied { .. }) => report.applied += 1,
            Ok(_) => report.skipped += 1,
            Err(e) => {
                tracing::error!(deal_id = %withdrawal.deal_id, error = %e, "failed to process withdrawal");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

async fn process_withdrawal(
    repo: &ReferralRepo,
    withdrawal: &Withdrawal,
) -> Result<SyncOutcome, AppError> {
    let Some(invited) = repo.get_invited_by_user_id(withdrawal.user_id).await else {
        tracing::debug!(
            deal_id = %withdrawal.deal_id,
            user_id = withdrawal.user_id,
            "actor has no invited binding, not a referral transaction"
        );
        return Ok(SyncOutcome::NotReferral);
    };

    let Some(mut referrer) = repo.get_referrer_by_code(&invited.ref_code).await else {
        tracing::warn!(
            deal_id = %withdrawal.deal_id,
            code = %invited.ref_code,
            "invited binding points at a missing referrer, skipping"
        );
        return Ok(SyncOutcome::DanglingReferrer);
    };

    let bonus = compute_bonus(withdrawal.profit);
    let entry = LedgerEntry {
        user_id: withdrawal.user_id,
        ref_code: invited.ref_code.clone(),
        profit: withdrawal.profit,
        deal_id: withdrawal.deal_id.clone(),
        bonus,
        date: Utc::now().format(LEDGER_DATE_FORMAT).to_string(),
    };
    // Two separate writes with no cross-row transaction: a crash after the
    // ledger append but before the accrual leaves the entry without its
    // balance increment. Accepted at-most-once-on-balance risk.
    repo.create_ledger_entry(&entry).await?;

    referrer.pending_payout += bonus;
    repo.update_referrer(&referrer).await?;

    tracing::info!(
        deal_id = %withdrawal.deal_id,
        referrer = referrer.id,
        bonus,
        pending = referrer.pending_payout,
        "withdrawal reconciled"
    );
    Ok(SyncOutcome::Applied { bonus })
}
