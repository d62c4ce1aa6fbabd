//! Typed queries over a [`CatalogBackend`](crate::backend::CatalogBackend).
//!
//! Each query struct borrows a backend, builds [`QueryPlan`](crate::query::QueryPlan)s
//! from [`crate::query`] and decodes the returned rows into models.

pub mod categories;
pub mod products;

pub use categories::CategoryQuery;
pub use products::{looks_like_id, DetailState, ProductQuery};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}
