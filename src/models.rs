use serde::{Deserialize, Serialize};

/// A user who generated a referral code and accrues bonuses from the
/// activity of the users they invited. Backed by one row of the Referrers
/// sheet; the cache holds read-mostly copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Referrer {
    pub id: i64,
    pub username: String,
    pub code: String,
    pub wallet: String,
    pub ref_count: i64,
    pub pending_payout: f64,
    pub paid_out: f64,
}

/// One-time, irrevocable binding of a user to the referral code that
/// brought them in. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invited {
    pub user_id: i64,
    pub ref_code: String,
}

/// Append-only record of one bonus accrual, unique per deal id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: i64,
    pub ref_code: String,
    pub profit: f64,
    pub deal_id: String,
    pub bonus: f64,
    pub date: String,
}

/// Upstream-reported financial event. Read-only input; this process only
/// consumes and filters it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub deal_id: String,
    pub user_id: i64,
    pub profit: f64,
}

/// Sheet names and the rectangular ranges each logical table lives in.
pub mod sheet {
    pub const REFERRERS: &str = "Referrers";
    /// Columns: A id, B username, C code, D wallet, E ref count,
    /// F pending payout, G paid out.
    pub const REFERRERS_RANGE: &str = "Referrers!A2:G";
    pub const REFERRER_CODES_RANGE: &str = "Referrers!C2:C";

    pub const INVITED: &str = "Invited";
    /// Columns: A user id, B referring code.
    pub const INVITED_RANGE: &str = "Invited!A2:B";

    pub const LEDGER: &str = "Ledger";
    /// Columns: A user id, B code, C profit, D deal id, E bonus, F date.
    pub const LEDGER_DEAL_IDS_RANGE: &str = "Ledger!D2:D";

    pub const WITHDRAWALS: &str = "Withdrawals";
    /// Columns: A deal id, B user id, C (optional), D profit. The third
    /// column is sometimes dropped by cross-sheet value importing.
    pub const WITHDRAWALS_RANGE: &str = "Withdrawals!A2:D";
}
