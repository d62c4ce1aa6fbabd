//! PostgREST-style HTTP backend (the hosted data store).
//!
//! Plans are rendered as query parameters on `GET {base}/rest/v1/{table}`:
//!
//! ```text
//! select=*,categories:category_id(id,name)
//! is_active=eq.true
//! or=(name.ilike.*makita*,description.ilike.*makita*,part_number.ilike.*makita*)
//! order=name.asc,id.asc
//! offset=0
//! limit=50
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::backend::CatalogBackend;
use crate::config;
use crate::error::{CatalogError, Result};
use crate::query::{self, Direction, FilterValue, Predicate, QueryPlan};

/// Embedded-resource selector for a product's category.
const CATEGORY_EMBED: &str = "categories:category_id(id,name)";

pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    /// Create a backend for the project at `base_url` (without the
    /// `/rest/v1` suffix), authenticating with `api_key`.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(CatalogError::InvalidArgument(format!(
                "backend URL is empty (set {})",
                config::API_URL_ENV
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, config::REST_PATH, table)
    }
}

#[async_trait]
impl CatalogBackend for RestBackend {
    async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        let url = self.table_url(plan.table);
        let params = postgrest_params(plan);
        debug!(%url, ?params, "backend query");

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<Vec<Value>>().await?)
    }

    fn describe(&self) -> String {
        format!("rest({})", self.base_url)
    }
}

/// Render a plan as PostgREST query parameters.
///
/// Parameter order follows the plan (select, predicates, order, window), so
/// equal plans always render identically.
pub fn postgrest_params(plan: &QueryPlan) -> Vec<(String, String)> {
    let mut params = Vec::new();

    let mut select = if plan.columns.is_empty() {
        "*".to_string()
    } else {
        plan.columns.join(",")
    };
    if plan.embed_category {
        select.push(',');
        select.push_str(CATEGORY_EMBED);
    }
    params.push(("select".to_string(), select));

    for predicate in &plan.predicates {
        match predicate {
            Predicate::Eq { column, value } => {
                let value = match value {
                    FilterValue::Text(text) => text.clone(),
                    FilterValue::Bool(b) => b.to_string(),
                };
                params.push((column.to_string(), format!("eq.{}", value)));
            }
            Predicate::NotNull { column } => {
                params.push((column.to_string(), "not.is.null".to_string()));
            }
            Predicate::AnyContains { columns, needle } => {
                let pattern = quote(&format!("*{}*", query::escape_like(needle)));
                let parts: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{}.ilike.{}", c, pattern))
                    .collect();
                params.push(("or".to_string(), format!("({})", parts.join(","))));
            }
        }
    }

    if !plan.order.is_empty() {
        let order: Vec<String> = plan
            .order
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    Direction::Asc => "asc",
                    Direction::Desc => "desc",
                };
                format!("{}.{}", o.column, dir)
            })
            .collect();
        params.push(("order".to_string(), order.join(",")));
    }

    if let Some(window) = plan.window {
        params.push(("offset".to_string(), window.start.to_string()));
        params.push(("limit".to_string(), window.limit().to_string()));
    }

    params
}

/// Double-quote a value inside a logical (`or=(...)`) filter when it holds
/// characters PostgREST reserves there.
fn quote(value: &str) -> String {
    const RESERVED: &[char] = &[',', '.', ':', '(', ')', '"', '\\'];
    if !value.contains(RESERVED) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
