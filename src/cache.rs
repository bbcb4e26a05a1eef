// cache.rs
//
// Process-local index over the tabular store: id and code lookups for
// referrers, user-id lookups for invited bindings, and the set of deal ids
// already ledgered. Fully disposable; the store is always the source of
// truth. One RwLock guards the whole map set and is never held across I/O:
// `reload` finishes all three range reads before taking the write lock.
use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{sheet, Invited, Referrer};
use crate::store::{cell, RangeStore, ValueRender};

#[derive(Default)]
struct CacheState {
    referrers_by_id: HashMap<i64, Referrer>,
    referrers_by_code: HashMap<String, Referrer>,
    invited_by_user: HashMap<i64, Invited>,
    known_deal_ids: HashSet<String>,
    // Key -> row-index bookkeeping so layers above never do row arithmetic.
    referrer_rows: HashMap<i64, u32>,
    next_row: HashMap<String, u32>,
}

#[derive(Default)]
pub struct IndexCache {
    state: RwLock<CacheState>,
}

/// Codes are matched case-insensitively and whitespace-tolerantly; the
/// store's casing variance must never cause a false miss.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Columns: A id, B username, C code, D wallet, E ref count, F pending,
/// G paid out. Short rows get default trailing fields; a row whose id does
/// not parse yields None and is skipped by the caller.
pub(crate) fn parse_referrer_row(row: &[Value]) -> Option<Referrer> {
    let id = cell::id_value(row.first()?)?;
    Some(Referrer {
        id,
        username: row.get(1).map(cell::string_value).unwrap_or_default(),
        code: row.get(2).map(cell::string_value).unwrap_or_default(),
        wallet: row.get(3).map(cell::string_value).unwrap_or_default(),
        ref_count: row.get(4).map(cell::int_value).unwrap_or(0),
        pending_payout: row.get(5).map(cell::float_value).unwrap_or(0.0),
        paid_out: row.get(6).map(cell::float_value).unwrap_or(0.0),
    })
}

pub(crate) fn parse_invited_row(row: &[Value]) -> Option<Invited> {
    if row.len() < 2 {
        return None;
    }
    Some(Invited {
        user_id: cell::id_value(&row[0])?,
        ref_code: cell::string_value(&row[1]),
    })
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full rebuild from the store. All three range reads must succeed
    /// before anything is swapped in; on any failure the previous snapshot
    /// is retained untouched. The referrer and invited maps are replaced
    /// wholesale, the deal-id set is only ever extended.
    pub async fn reload(&self, store: &dyn RangeStore) -> Result<(), AppError> {
        let referrer_rows = store
            .read_range(sheet::REFERRERS_RANGE, ValueRender::Unformatted)
            .await?;
        let invited_rows = store
            .read_range(sheet::INVITED_RANGE, ValueRender::Formatted)
            .await?;
        let deal_rows = store
            .read_range(sheet::LEDGER_DEAL_IDS_RANGE, ValueRender::Formatted)
            .await?;

        let mut by_id = HashMap::new();
        let mut by_code = HashMap::new();
        let mut rows = HashMap::new();
        for (i, row) in referrer_rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let Some(referrer) = parse_referrer_row(row) else {
                tracing::warn!(row = i + 2, "skipping referrer row with unparseable id");
                continue;
            };
            rows.insert(referrer.id, i as u32 + 2);
            if !referrer.code.is_empty() {
                by_code.insert(normalize_code(&referrer.code), referrer.clone());
            }
            by_id.insert(referrer.id, referrer);
        }

        let mut invited = HashMap::new();
        for row in &invited_rows {
            let Some(binding) = parse_invited_row(row) else {
                continue;
            };
            invited.insert(binding.user_id, binding);
        }

        let mut deal_ids = HashSet::new();
        for row in &deal_rows {
            if let Some(value) = row.first() {
                let deal_id = cell::string_value(value);
                if !deal_id.is_empty() {
                    deal_ids.insert(deal_id);
                }
            }
        }

        let mut state = self.state.write().await;
        state.referrers_by_id = by_id;
        state.referrers_by_code = by_code;
        state.referrer_rows = rows;
        state.invited_by_user = invited;
        state.known_deal_ids.extend(deal_ids);
        state
            .next_row
            .insert(sheet::REFERRERS.to_string(), referrer_rows.len() as u32 + 2);
        state
            .next_row
            .insert(sheet::INVITED.to_string(), invited_rows.len() as u32 + 2);
        state
            .next_row
            .insert(sheet::LEDGER.to_string(), deal_rows.len() as u32 + 2);

        tracing::info!(
            referrers = state.referrers_by_id.len(),
            invited = state.invited_by_user.len(),
            deals = state.known_deal_ids.len(),
            "index cache reloaded"
        );
        Ok(())
    }

    pub async fn get_referrer_by_id(&self, user_id: i64) -> Option<Referrer> {
        self.state.read().await.referrers_by_id.get(&user_id).cloned()
    }

    pub async fn get_referrer_by_code(&self, code: &str) -> Option<Referrer> {
        self.state
            .read()
            .await
            .referrers_by_code
            .get(&normalize_code(code))
            .cloned()
    }

    pub async fn get_invited_by_user_id(&self, user_id: i64) -> Option<Invited> {
        self.state.read().await.invited_by_user.get(&user_id).cloned()
    }

    pub async fn is_deal_known(&self, deal_id: &str) -> bool {
        self.state.read().await.known_deal_ids.contains(deal_id)
    }

    pub async fn known_deal_ids(&self) -> HashSet<String> {
        self.state.read().await.known_deal_ids.clone()
    }

    pub async fn upsert_referrer(&self, referrer: &Referrer, row: Option<u32>) {
        let mut state = self.state.write().await;
        if let Some(row) = row {
            state.referrer_rows.insert(referrer.id, row);
        }
        if !referrer.code.is_empty() {
            state
                .referrers_by_code
                .insert(normalize_code(&referrer.code), referrer.clone());
        }
        state.referrers_by_id.insert(referrer.id, referrer.clone());
    }

    pub async fn upsert_invited(&self, invited: &Invited) {
        let mut state = self.state.write().await;
        state.invited_by_user.insert(invited.user_id, invited.clone());
    }

    pub async fn mark_deal_known(&self, deal_id: &str) {
        let mut state = self.state.write().await;
        state.known_deal_ids.insert(deal_id.to_string());
    }

    pub async fn row_for_referrer(&self, user_id: i64) -> Option<u32> {
        self.state.read().await.referrer_rows.get(&user_id).copied()
    }

    /// Hands out the next free row of a sheet and advances the counter.
    /// None when the sheet has not been loaded yet; callers fall back to a
    /// live scan and seed the counter via `set_next_row`.
    pub async fn allocate_row(&self, sheet_name: &str) -> Option<u32> {
        let mut state = self.state.write().await;
        let next = state.next_row.get_mut(sheet_name)?;
        let row = *next;
        *next += 1;
        Some(row)
    }

    pub async fn set_next_row(&self, sheet_name: &str, next: u32) {
        let mut state = self.state.write().await;
        state.next_row.insert(sheet_name.to_string(), next);
    }

    /// Returns an allocated row that was never written, so a failed write
    /// does not leave a permanent blank line. Only unwinds when no later
    /// allocation has happened in the meantime.
    pub async fn release_row(&self, sheet_name: &str, row: u32) {
        let mut state = self.state.write().await;
        if let Some(next) = state.next_row.get_mut(sheet_name) {
            if *next == row + 1 {
                *next = row;
            }
        }
    }
}
