// service/referral.rs
use rand::Rng;
use tokio::time::{sleep, Duration};

use crate::error::AppError;
use crate::models::{sheet, Referrer};
use crate::repo::ReferralRepo;
use crate::store::{cell, RangeStore, ValueRender};
use crate::utils::validate_wallet_address;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 6;
const MAX_ATTEMPTS: usize = 100;
const RETRY_DELAY: Duration = Duration::from_millis(10);

pub fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Generates a code that no current row of the store carries. Uniqueness is
/// checked against a live read of the code column, never the cache: another
/// process may have written a row since the last reload, and issuing a
/// colliding code is worse than the extra read.
pub async fn generate_unique_code(store: &dyn RangeStore) -> Result<String, AppError> {
    for _ in 0..MAX_ATTEMPTS {
        let code = random_code();
        if !code_exists(store, &code).await? {
            return Ok(code);
        }
        sleep(RETRY_DELAY).await;
    }
    Err(AppError::CodeGenerationExhausted(MAX_ATTEMPTS))
}

async fn code_exists(store: &dyn RangeStore, code: &str) -> Result<bool, AppError> {
    let rows = store
        .read_range(sheet::REFERRER_CODES_RANGE, ValueRender::Formatted)
        .await?;
    Ok(rows
        .iter()
        .any(|row| row.first().map(cell::string_value).as_deref() == Some(code)))
}

pub fn referral_link(bot_username: &str, code: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username, code)
}

/// Binds a user to the referrer behind `code`. The binding is one-time and
/// irrevocable; a failed count increment is logged but does not undo it.
pub async fn link_referral(
    repo: &ReferralRepo,
    user_id: i64,
    code: &str,
) -> Result<Referrer, AppError> {
    if repo.get_invited_by_user_id(user_id).await.is_some() {
        return Err(AppError::AlreadyInvited(user_id));
    }
    let referrer = repo
        .get_referrer_by_code(code)
        .await
        .ok_or_else(|| AppError::ReferrerNotFound(code.to_string()))?;
    if referrer.id == user_id {
        return Err(AppError::SelfReferral);
    }

    repo.create_invited(user_id, &referrer.code).await?;

    match repo.increment_ref_count(&referrer.code).await {
        Ok(updated) => Ok(updated),
        Err(e) => {
            tracing::warn!(code = %referrer.code, error = %e, "failed to increment referral count");
            Ok(referrer)
        }
    }
}

pub async fn link_wallet(
    repo: &ReferralRepo,
    user_id: i64,
    wallet: &str,
) -> Result<Referrer, AppError> {
    let wallet = wallet.trim();
    validate_wallet_address(wallet)?;

    let mut referrer = repo
        .get_referrer_by_id(user_id)
        .await
        .ok_or(AppError::ReferrerIdNotFound(user_id))?;
    referrer.wallet = wallet.to_string();
    repo.update_referrer(&referrer).await?;
    Ok(referrer)
}

/// Keeps the stored display name in sync with what the front-end currently
/// sees. Empty names never overwrite a stored one.
pub async fn refresh_username(
    repo: &ReferralRepo,
    referrer: &Referrer,
    current_username: &str,
) -> Result<Referrer, AppError> {
    if current_username.is_empty() || referrer.username.trim() == current_username {
        return Ok(referrer.clone());
    }
    let mut updated = referrer.clone();
    updated.username = current_username.to_string();
    repo.update_referrer(&updated).await?;
    tracing::info!(id = referrer.id, username = current_username, "username refreshed");
    Ok(updated)
}
