// store.rs
pub mod auth;
pub mod cell;
#[cfg(test)]
pub mod memory;
pub mod sheets;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppError;

/// Whether cell values come back raw or formula-evaluated. Ranges fed by
/// spreadsheet functions (imports, sums) must be read unformatted to see
/// the computed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRender {
    Formatted,
    Unformatted,
}

impl ValueRender {
    pub(crate) fn as_param(self) -> &'static str {
        match self {
            ValueRender::Formatted => "FORMATTED_VALUE",
            ValueRender::Unformatted => "UNFORMATTED_VALUE",
        }
    }
}

/// One target range plus the values to place there, for batch updates.
#[derive(Debug, Clone)]
pub struct RangeWrite {
    pub range: String,
    pub values: Vec<Vec<Value>>,
}

/// Narrow read/write boundary to the tabular store. No caching, no retries,
/// no interpretation of cell semantics; retry policy belongs to callers, and
/// callers must serialize read-modify-write sequences themselves.
#[async_trait]
pub trait RangeStore: Send + Sync {
    async fn read_range(&self, range: &str, render: ValueRender)
        -> Result<Vec<Vec<Value>>, AppError>;

    async fn update_range(&self, range: &str, values: Vec<Vec<Value>>) -> Result<(), AppError>;

    async fn batch_update(&self, writes: Vec<RangeWrite>) -> Result<(), AppError>;
}
