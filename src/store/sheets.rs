// store/sheets.rs
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::TokenProvider;
use super::{RangeStore, RangeWrite, ValueRender};
use crate::error::AppError;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 implementation of the range boundary. Writes use
/// USER_ENTERED input so numeric cells land as numbers, matching how the
/// sheet is edited by hand.
pub struct SheetsStore {
    http: reqwest::Client,
    auth: TokenProvider,
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsStore {
    pub fn new(spreadsheet_id: &str, credentials_path: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::new();
        let auth = TokenProvider::from_file(credentials_path, http.clone())?;
        Ok(SheetsStore {
            http,
            auth,
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{API_BASE}/{}/values/{}",
            self.spreadsheet_id,
            urlencoding::encode(range)
        )
    }

    async fn ok_or_api_error(resp: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(AppError::Api {
            status: resp.status().as_u16(),
            body: resp.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl RangeStore for SheetsStore {
    async fn read_range(
        &self,
        range: &str,
        render: ValueRender,
    ) -> Result<Vec<Vec<Value>>, AppError> {
        let token = self.auth.bearer_token().await?;
        let resp = self
            .http
            .get(self.values_url(range))
            .bearer_auth(token)
            .query(&[("valueRenderOption", render.as_param())])
            .send()
            .await?;
        let resp = Self::ok_or_api_error(resp).await?;
        let body: ValuesResponse = resp.json().await?;
        Ok(body.values)
    }

    async fn update_range(&self, range: &str, values: Vec<Vec<Value>>) -> Result<(), AppError> {
        let token = self.auth.bearer_token().await?;
        let resp = self
            .http
            .put(self.values_url(range))
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "range": range, "values": values }))
            .send()
            .await?;
        Self::ok_or_api_error(resp).await?;
        Ok(())
    }

    async fn batch_update(&self, writes: Vec<RangeWrite>) -> Result<(), AppError> {
        if writes.is_empty() {
            return Ok(());
        }
        let data: Vec<Value> = writes
            .iter()
            .map(|w| json!({ "range": w.range, "values": w.values }))
            .collect();
        let token = self.auth.bearer_token().await?;
        let resp = self
            .http
            .post(format!(
                "{API_BASE}/{}/values:batchUpdate",
                self.spreadsheet_id
            ))
            .bearer_auth(token)
            .json(&json!({ "valueInputOption": "USER_ENTERED", "data": data }))
            .send()
            .await?;
        Self::ok_or_api_error(resp).await?;
        Ok(())
    }
}
