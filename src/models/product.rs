use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::slug;

// ---------------------------------------------------------------------------
// Product: a catalog row as returned by the backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub specifications: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Category embedded by the backend join (`categories:category_id(id,name)`).
    #[serde(default, alias = "categories")]
    pub category: Option<CategoryRef>,
}

impl Product {
    /// The stored slug, or one derived with [`slug::encode`] when the row has none.
    pub fn slug_or_derived(&self) -> String {
        match self.slug.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => slug::encode(self),
        }
    }

    /// Path token used by the detail route: the stored slug, else the id.
    pub fn route_token(&self) -> &str {
        match self.slug.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => &self.id,
        }
    }

    /// Name with the part number in parentheses, as shown in listings.
    pub fn display_name(&self) -> String {
        match self.part_number.as_deref() {
            Some(pn) if !pn.is_empty() => format!("{} ({})", self.name, pn),
            _ => self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// CategoryRef: {id, name} pair embedded in a product row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// SitemapRow: the columns the sitemap generator reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapRow {
    pub slug: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl SitemapRow {
    /// `updated_at` (or `created_at` when that is absent or unparseable)
    /// normalised to an ISO-8601 UTC timestamp with millisecond precision.
    pub fn last_modified(&self) -> Option<String> {
        self.updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.created_at.as_deref().and_then(parse_timestamp))
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Parse the timestamp shapes the backends produce: RFC 3339 from the hosted
/// API (`2024-03-01T12:00:00.123456+00:00`) and offset-less values from
/// snapshot exports (`2024-03-01 12:00:00`), the latter taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}
