//! Data backends executing [`QueryPlan`]s.
//!
//! The catalog only needs four things from a backend: equality and
//! case-insensitive substring predicates combined with AND/OR, offset-style
//! range windows, the product's category embedded through its foreign key,
//! and failures that are distinguishable from an empty result.

pub mod rest;
pub mod snapshot;

pub use rest::RestBackend;
pub use snapshot::SnapshotBackend;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::query::QueryPlan;

#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Run `plan` and return one JSON object per row.
    ///
    /// Rows of plans with [`embed_category`](QueryPlan::embed_category) set
    /// carry the category under `categories` as `{id, name}` (or `null`).
    async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Value>>;

    /// Short description for logs and `Display` output.
    fn describe(&self) -> String;
}
