// utils.rs
use std::sync::OnceLock;

use regex::Regex;

use crate::error::AppError;

static WALLET_RE: OnceLock<Regex> = OnceLock::new();

fn wallet_regex() -> &'static Regex {
    WALLET_RE.get_or_init(|| {
        Regex::new(r"^(UQ|EQ)[A-Za-z0-9_-]{46}$").expect("wallet regex must compile")
    })
}

/// TON wallet addresses: `UQ`/`EQ` prefix plus 46 base64url characters.
pub fn validate_wallet_address(address: &str) -> Result<(), AppError> {
    if wallet_regex().is_match(address.trim()) {
        Ok(())
    } else {
        Err(AppError::InvalidWallet)
    }
}

/// Whether free-form text looks like a wallet address, for the front-end to
/// nudge users who paste one without being prompted.
pub fn looks_like_wallet(text: &str) -> bool {
    wallet_regex().is_match(text.trim())
}
