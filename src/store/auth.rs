// store/auth.rs
use std::time::{Duration, Instant};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::AppError;

const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const TOKEN_TTL_SECS: u64 = 3600;
// Refresh a little early so an in-flight request never carries a token that
// expires mid-call.
const EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Mints service-account bearer tokens for the sheets API and caches them
/// until shortly before expiry.
pub struct TokenProvider {
    key: EncodingKey,
    client_email: String,
    token_uri: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn from_file(path: &str, http: reqwest::Client) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Auth(format!("cannot read credentials file {path}: {e}")))?;
        let sa: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|e| AppError::Auth(format!("malformed credentials file {path}: {e}")))?;
        let key = EncodingKey::from_rsa_pem(sa.private_key.as_bytes())
            .map_err(|e| AppError::Auth(format!("invalid service account key: {e}")))?;

        Ok(TokenProvider {
            key,
            client_email: sa.client_email,
            token_uri: sa.token_uri,
            http,
            cached: Mutex::new(None),
        })
    }

    pub async fn bearer_token(&self) -> Result<String, AppError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            iss: &self.client_email,
            scope: TOKEN_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| AppError::Auth(format!("failed to sign token request: {e}")))?;

        let resp = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Api {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = resp.json().await?;
        let expires_at =
            Instant::now() + Duration::from_secs(token.expires_in.saturating_sub(EXPIRY_MARGIN_SECS));
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }
}
