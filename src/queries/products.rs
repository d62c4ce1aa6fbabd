//! Product listing, detail and sitemap queries.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::backend::CatalogBackend;
use crate::browser::FilterCriteria;
use crate::config;
use crate::error::{CatalogError, Result};
use crate::models::{Product, SitemapRow};
use crate::query::{self, QueryPlan};

/// Outcome of a detail-page lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Found(Box<Product>),
    /// No active product for the token.
    NotFound,
    /// The backend failed; the product may well exist.
    Failed(String),
}

static ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f-]{36}$").unwrap());

/// `true` when `token` has the shape of a product id (36 chars of lowercase
/// hex and dashes), making it eligible for the id fallback.
pub fn looks_like_id(token: &str) -> bool {
    ID_REGEX.is_match(token)
}

pub struct ProductQuery<'a> {
    backend: &'a dyn CatalogBackend,
}

impl<'a> ProductQuery<'a> {
    pub fn new(backend: &'a dyn CatalogBackend) -> Self {
        Self { backend }
    }

    /// One page (1-based) of active products matching `criteria`.
    pub async fn page(
        &self,
        criteria: &FilterCriteria,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<Product>> {
        let plan = query::product_page(criteria, page, page_size)?;
        self.run(&plan).await
    }

    /// Execute a product plan and decode its rows.
    ///
    /// Inactive rows are dropped even if the backend returned them.
    pub async fn run(&self, plan: &QueryPlan) -> Result<Vec<Product>> {
        let rows = self.backend.execute(plan).await?;
        let products: Vec<Product> = super::decode_rows(rows)?;
        Ok(products.into_iter().filter(|p| p.is_active).collect())
    }

    /// Active product whose stored slug equals `slug`.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let products = self.run(&query::product_by_slug(slug)).await?;
        Ok(products.into_iter().next())
    }

    /// Active product with the given id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Product>> {
        let products = self.run(&query::product_by_id(id)).await?;
        Ok(products.into_iter().next())
    }

    /// Resolve a detail-route token: slug first, then id when the token
    /// looks like one.
    ///
    /// Returns [`CatalogError::NotFound`] when neither lookup yields an
    /// active product.
    pub async fn resolve(&self, token: &str) -> Result<Product> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CatalogError::NotFound("empty product token".into()));
        }

        if let Some(product) = self.get_by_slug(token).await? {
            return Ok(product);
        }

        if looks_like_id(token) {
            debug!(token, "no product with this slug, trying id");
            if let Some(product) = self.get_by_id(token).await? {
                return Ok(product);
            }
        }

        Err(CatalogError::NotFound(format!("product '{}'", token)))
    }

    /// [`resolve`](Self::resolve) folded into the three detail outcomes.
    pub async fn detail(&self, token: &str) -> DetailState {
        match self.resolve(token).await {
            Ok(product) => DetailState::Found(Box::new(product)),
            Err(e) if e.is_not_found() => DetailState::NotFound,
            Err(e) => {
                warn!(token, error = %e, "product detail lookup failed");
                DetailState::Failed(e.to_string())
            }
        }
    }

    /// Slug and timestamps of every active product with a slug, most
    /// recently updated first.
    pub async fn sitemap_rows(&self) -> Result<Vec<SitemapRow>> {
        self.sitemap_rows_paged(config::SITEMAP_PAGE_SIZE).await
    }

    /// [`sitemap_rows`](Self::sitemap_rows), fetched `page_size` rows at a
    /// time until a short page arrives. Hosted backends cap rows per
    /// response.
    pub async fn sitemap_rows_paged(&self, page_size: usize) -> Result<Vec<SitemapRow>> {
        if page_size == 0 {
            return Err(CatalogError::InvalidArgument("page size must be positive".into()));
        }
        let mut rows = Vec::new();
        let mut start = 0;
        loop {
            let page = self
                .backend
                .execute(&query::sitemap_page(start, page_size))
                .await?;
            let received = page.len();
            let page: Vec<SitemapRow> = super::decode_rows(page)?;
            rows.extend(page.into_iter().filter(|r| !r.slug.is_empty()));
            debug!(start, received, "sitemap page");
            if received < page_size {
                break;
            }
            start += page_size;
        }
        Ok(rows)
    }
}
