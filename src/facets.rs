//! Brand facet for the listing's brand filter.
//!
//! The brand list is loaded once per browser session from up to
//! [`BRAND_FACET_CAP`](crate::config::BRAND_FACET_CAP) active products and is
//! not re-scoped by the current search or category.

use std::collections::HashSet;

use serde_json::Value;

use crate::backend::CatalogBackend;
use crate::error::Result;
use crate::query;
use crate::slug;

pub struct FacetLoader<'a> {
    backend: &'a dyn CatalogBackend,
}

impl<'a> FacetLoader<'a> {
    pub fn new(backend: &'a dyn CatalogBackend) -> Self {
        Self { backend }
    }

    /// Distinct brands of active products, collated for display.
    pub async fn brands(&self, cap: usize) -> Result<Vec<String>> {
        let rows = self.backend.execute(&query::brand_facet(cap)).await?;
        Ok(distinct_brands(
            rows.iter()
                .filter_map(|row| row.get("brand").and_then(Value::as_str)),
        ))
    }
}

/// Deduplicate and order brand values.
///
/// Blank values are dropped. Values that only differ in surrounding
/// whitespace count once, keeping the first spelling seen, since the brand
/// filter matches that stored value by equality. Order follows a collation
/// key that ignores case and diacritics ("Álcool" sorts with "alcool",
/// before "Bosch"), falling back to the raw value for ties.
pub fn distinct_brands<'s>(values: impl IntoIterator<Item = &'s str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut brands: Vec<(String, String)> = values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(v.trim()))
        .map(|v| (collation_key(v), v.to_string()))
        .collect();
    brands.sort();
    brands.into_iter().map(|(_, brand)| brand).collect()
}

fn collation_key(value: &str) -> String {
    slug::fold(value.trim())
}
