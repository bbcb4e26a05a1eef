// service/repair.rs
//
// Recomputes the pending-payout column from the externally aggregated
// paid-out column, absorbing corrections (a human marking amounts as paid)
// that the reconciliation pipeline cannot observe. Goes straight through the
// adapter; the cache catches up on its next reload.
use serde_json::Value;

use crate::error::AppError;
use crate::models::sheet;
use crate::store::{cell, RangeStore, RangeWrite, ValueRender};

/// For every referrer row, `pending' = pending - paid_out`, written back only
/// where the value actually changes, in one batch call. The subtraction is a
/// one-shot correction per paid-out increment: it assumes the external
/// aggregation zeroes its input after the payout is absorbed, so a rerun with
/// unchanged paid-out data would subtract again.
pub async fn repair_pending_payouts(store: &dyn RangeStore) -> Result<usize, AppError> {
    let rows = store
        .read_range(sheet::REFERRERS_RANGE, ValueRender::Unformatted)
        .await?;
    if rows.is_empty() {
        tracing::debug!("no referrer rows to repair");
        return Ok(0);
    }

    let mut writes = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if row.is_empty() || cell::string_value(&row[0]).is_empty() {
            continue;
        }
        let pending = row.get(5).map(cell::float_value).unwrap_or(0.0);
        let paid_out = row.get(6).map(cell::float_value).unwrap_or(0.0);
        let new_pending = pending - paid_out;
        if new_pending != pending {
            let row_index = i + 2;
            tracing::debug!(
                row = row_index,
                pending,
                paid_out,
                new_pending,
                "pending payout needs correction"
            );
            writes.push(RangeWrite {
                range: format!("{}!F{}", sheet::REFERRERS, row_index),
                values: vec![vec![Value::from(new_pending)]],
            });
        }
    }

    if writes.is_empty() {
        tracing::debug!("pending payout column already consistent");
        return Ok(0);
    }

    let changed = writes.len();
    store.batch_update(writes).await?;
    tracing::info!(rows = changed, "pending payout column repaired");
    Ok(changed)
}
