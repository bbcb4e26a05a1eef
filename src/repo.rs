// repo.rs
//
// Write paths combine the store adapter and the index cache: every write
// that succeeds against the store is mirrored into the cache synchronously,
// so front-end lookups see it without waiting for the next reload.
use std::sync::Arc;

use serde_json::Value;

use crate::cache::IndexCache;
use crate::error::AppError;
use crate::models::{sheet, Invited, LedgerEntry, Referrer, Withdrawal};
use crate::service::referral;
use crate::store::{cell, RangeStore, ValueRender};

pub struct ReferralRepo {
    store: Arc<dyn RangeStore>,
    cache: IndexCache,
}

impl std::fmt::Debug for ReferralRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferralRepo").finish_non_exhaustive()
    }
}

fn referrer_values(referrer: &Referrer) -> Vec<Vec<Value>> {
    vec![vec![
        // The id column is text in the sheet; numbers over 2^53 would
        // otherwise lose precision in the grid.
        Value::from(referrer.id.to_string()),
        Value::from(referrer.username.clone()),
        Value::from(referrer.code.clone()),
        Value::from(referrer.wallet.clone()),
        Value::from(referrer.ref_count),
        Value::from(referrer.pending_payout),
        Value::from(referrer.paid_out),
    ]]
}

impl ReferralRepo {
    pub fn new(store: Arc<dyn RangeStore>) -> Self {
        ReferralRepo {
            store,
            cache: IndexCache::new(),
        }
    }

    pub fn store(&self) -> &dyn RangeStore {
        self.store.as_ref()
    }

    pub async fn reload_cache(&self) -> Result<(), AppError> {
        self.cache.reload(self.store.as_ref()).await
    }

    pub async fn get_referrer_by_id(&self, user_id: i64) -> Option<Referrer> {
        self.cache.get_referrer_by_id(user_id).await
    }

    pub async fn get_referrer_by_code(&self, code: &str) -> Option<Referrer> {
        self.cache.get_referrer_by_code(code).await
    }

    pub async fn get_invited_by_user_id(&self, user_id: i64) -> Option<Invited> {
        self.cache.get_invited_by_user_id(user_id).await
    }

    pub async fn create_referrer(&self, user_id: i64, username: &str) -> Result<Referrer, AppError> {
        let code = referral::generate_unique_code(self.store.as_ref()).await?;
        let referrer = Referrer {
            id: user_id,
            username: username.to_string(),
            code,
            ..Default::default()
        };

        let row = self.allocate_row(sheet::REFERRERS).await?;
        let range = format!("{}!A{row}:G{row}", sheet::REFERRERS);
        if let Err(e) = self.store.update_range(&range, referrer_values(&referrer)).await {
            self.cache.release_row(sheet::REFERRERS, row).await;
            return Err(e);
        }
        self.cache.upsert_referrer(&referrer, Some(row)).await;

        tracing::info!(id = user_id, code = %referrer.code, row, "referrer created");
        Ok(referrer)
    }

    pub async fn update_referrer(&self, referrer: &Referrer) -> Result<(), AppError> {
        let row = match self.cache.row_for_referrer(referrer.id).await {
            Some(row) => row,
            None => self
                .find_referrer_row(referrer.id)
                .await?
                .ok_or(AppError::ReferrerIdNotFound(referrer.id))?,
        };

        let range = format!("{}!A{row}:G{row}", sheet::REFERRERS);
        self.store.update_range(&range, referrer_values(referrer)).await?;
        self.cache.upsert_referrer(referrer, Some(row)).await;

        tracing::debug!(id = referrer.id, row, pending = referrer.pending_payout, "referrer updated");
        Ok(())
    }

    pub async fn create_invited(&self, user_id: i64, ref_code: &str) -> Result<Invited, AppError> {
        let invited = Invited {
            user_id,
            ref_code: ref_code.to_string(),
        };

        let row = self.allocate_row(sheet::INVITED).await?;
        let range = format!("{}!A{row}:B{row}", sheet::INVITED);
        let values = vec![vec![
            Value::from(user_id.to_string()),
            Value::from(ref_code.to_string()),
        ]];
        if let Err(e) = self.store.update_range(&range, values).await {
            self.cache.release_row(sheet::INVITED, row).await;
            return Err(e);
        }
        self.cache.upsert_invited(&invited).await;

        tracing::info!(user_id, code = ref_code, row, "invited binding created");
        Ok(invited)
    }

    pub async fn increment_ref_count(&self, code: &str) -> Result<Referrer, AppError> {
        let mut referrer = self
            .get_referrer_by_code(code)
            .await
            .ok_or_else(|| AppError::ReferrerNotFound(code.to_string()))?;
        referrer.ref_count += 1;
        self.update_referrer(&referrer).await?;
        Ok(referrer)
    }

    /// Appends the ledger row and marks the deal id known. Marking is what
    /// closes the idempotency gate: a concurrent or later pass will filter
    /// this deal out even before the next full reload.
    pub async fn create_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), AppError> {
        let row = self.allocate_row(sheet::LEDGER).await?;
        let range = format!("{}!A{row}:F{row}", sheet::LEDGER);
        let values = vec![vec![
            Value::from(entry.user_id.to_string()),
            Value::from(entry.ref_code.clone()),
            Value::from(entry.profit),
            Value::from(entry.deal_id.clone()),
            Value::from(entry.bonus),
            Value::from(entry.date.clone()),
        ]];
        if let Err(e) = self.store.update_range(&range, values).await {
            self.cache.release_row(sheet::LEDGER, row).await;
            return Err(e);
        }
        self.cache.mark_deal_known(&entry.deal_id).await;

        tracing::info!(deal_id = %entry.deal_id, bonus = entry.bonus, row, "ledger entry created");
        Ok(())
    }

    /// Withdrawal events not yet present in the ledger, in upstream row
    /// order. Rows that cannot be interpreted are skipped and logged, never
    /// fatal for the batch.
    pub async fn fetch_new_withdrawals(&self) -> Result<Vec<Withdrawal>, AppError> {
        let known = self.cache.known_deal_ids().await;
        let rows = self
            .store
            .read_range(sheet::WITHDRAWALS_RANGE, ValueRender::Unformatted)
            .await?;

        let mut withdrawals = Vec::new();
        for row in &rows {
            if row.len() < 2 {
                continue;
            }
            let deal_id = cell::string_value(&row[0]);
            if deal_id.is_empty() || known.contains(&deal_id) {
                continue;
            }
            let Some(user_id) = cell::id_value(&row[1]) else {
                tracing::warn!(deal_id = %deal_id, "skipping withdrawal with unparseable user id");
                continue;
            };

            // Profit lives in column D (index 3). Cross-sheet value
            // importing sometimes drops the empty column C, shifting the
            // profit to index 2.
            let profit = if row.len() >= 4 {
                cell::float_value(&row[3])
            } else if row.len() == 3 {
                cell::float_value(&row[2])
            } else {
                tracing::warn!(deal_id = %deal_id, "skipping withdrawal with no profit column");
                continue;
            };
            if profit <= 0.0 {
                tracing::debug!(deal_id = %deal_id, profit, "skipping non-positive profit");
                continue;
            }

            withdrawals.push(Withdrawal {
                deal_id,
                user_id,
                profit,
            });
        }
        Ok(withdrawals)
    }

    async fn allocate_row(&self, sheet_name: &str) -> Result<u32, AppError> {
        if let Some(row) = self.cache.allocate_row(sheet_name).await {
            return Ok(row);
        }
        // Cold cache: fall back to a live scan, then seed the counter.
        let row = self.find_first_empty_row(sheet_name).await?;
        self.cache.set_next_row(sheet_name, row + 1).await;
        Ok(row)
    }

    async fn find_first_empty_row(&self, sheet_name: &str) -> Result<u32, AppError> {
        let range = format!("{sheet_name}!A2:A");
        let rows = self.store.read_range(&range, ValueRender::Formatted).await?;
        for (i, row) in rows.iter().enumerate() {
            let blank = row.first().map(cell::string_value).unwrap_or_default().is_empty();
            if blank {
                return Ok(i as u32 + 2);
            }
        }
        Ok(rows.len() as u32 + 2)
    }

    async fn find_referrer_row(&self, user_id: i64) -> Result<Option<u32>, AppError> {
        let range = format!("{}!A2:A", sheet::REFERRERS);
        let rows = self.store.read_range(&range, ValueRender::Formatted).await?;
        for (i, row) in rows.iter().enumerate() {
            if row.first().and_then(cell::id_value) == Some(user_id) {
                return Ok(Some(i as u32 + 2));
            }
        }
        Ok(None)
    }
}
