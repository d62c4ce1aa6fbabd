//! Product catalog client for an industrial-parts distributor.
//!
//! Browses the catalog held in a hosted PostgREST-style data store (or an
//! offline NDJSON snapshot of it queried through DuckDB): filtered,
//! debounced, incrementally paginated listings, slug-based product routing,
//! the brand facet and sitemap generation.
//!
//! # Quick start
//!
//! ```no_run
//! use parts_catalog::CatalogClient;
//!
//! # async fn demo() -> parts_catalog::Result<()> {
//! let client = CatalogClient::builder().from_env().build()?;
//!
//! // Resolve a detail-route token (slug, or product id as fallback)
//! let product = client.products().resolve("filtro-de-oleo-hella-fh100").await?;
//!
//! // Browse with filters; results accumulate page by page
//! let mut browser = client.browse();
//! browser.set_search_term("makita")?;
//! let snapshot = browser.wait_for(|s| s.applied.is_some()).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod browser;
pub mod config;
pub mod connection;
pub mod error;
pub mod facets;
mod files;
pub mod models;
pub mod queries;
pub mod query;
pub mod sitemap;
pub mod slug;
pub mod sql_builder;

pub use backend::{CatalogBackend, RestBackend, SnapshotBackend};
pub use browser::{
    BrowseStatus, BrowserCommand, BrowserHandle, BrowserOptions, BrowserSnapshot, FilterCriteria,
};
pub use connection::Connection;
pub use error::{CatalogError, Result};
pub use models::{Category, Product};
pub use queries::DetailState;
pub use query::QueryPlan;
pub use sql_builder::SqlBuilder;

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CatalogClientBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`CatalogClient`].
///
/// Use [`CatalogClient::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](CatalogClientBuilder::build).
pub struct CatalogClientBuilder {
    api_url: Option<String>,
    api_key: Option<String>,
    offline: bool,
    snapshot_dir: Option<PathBuf>,
    timeout: Duration,
    options: BrowserOptions,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            offline: false,
            snapshot_dir: None,
            timeout: config::DEFAULT_TIMEOUT,
            options: BrowserOptions::default(),
        }
    }
}

impl CatalogClientBuilder {
    /// Base URL of the hosted backend, without the `/rest/v1` suffix.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Anonymous API key sent as `apikey` and bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Fill the URL and key from `CATALOG_API_URL` / `CATALOG_API_KEY` when
    /// they have not been set explicitly.
    pub fn from_env(mut self) -> Self {
        if self.api_url.is_none() {
            self.api_url = env::var(config::API_URL_ENV).ok();
        }
        if self.api_key.is_none() {
            self.api_key = env::var(config::API_KEY_ENV).ok();
        }
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, queries run against the local snapshot instead of the
    /// hosted backend. Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the snapshot directory used in offline mode.
    ///
    /// If not set, the platform cache directory is used (e.g.
    /// `~/.cache/parts-catalog` on Linux).
    pub fn snapshot_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.snapshot_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rows per listing page. Defaults to 50.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.options.page_size = page_size;
        self
    }

    /// Quiet period before filter edits are applied. Defaults to 300 ms.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.options.debounce = debounce;
        self
    }

    /// Maximum products scanned for the brand facet. Defaults to 1000.
    pub fn brand_cap(mut self, cap: usize) -> Self {
        self.options.brand_cap = cap;
        self
    }

    /// Build the client.
    ///
    /// Offline mode loads the snapshot eagerly; online mode only builds the
    /// HTTP client and requires a backend URL.
    pub fn build(self) -> Result<CatalogClient> {
        if self.options.page_size == 0 {
            return Err(CatalogError::InvalidArgument(
                "page size must be positive".into(),
            ));
        }

        let backend: Arc<dyn CatalogBackend> = if self.offline {
            let dir = self.snapshot_dir.unwrap_or_else(config::default_snapshot_dir);
            Arc::new(SnapshotBackend::open(dir)?)
        } else {
            let url = self.api_url.unwrap_or_default();
            let key = self.api_key.unwrap_or_default();
            Arc::new(RestBackend::new(&url, &key, self.timeout)?)
        };

        Ok(CatalogClient {
            backend,
            options: self.options,
        })
    }
}

// ---------------------------------------------------------------------------
// CatalogClient
// ---------------------------------------------------------------------------

/// The main entry point of the catalog.
///
/// Holds a shared [`CatalogBackend`] and exposes query interfaces as
/// lightweight borrowing wrappers. Created via [`CatalogClient::builder()`]
/// or [`CatalogClient::with_backend()`].
pub struct CatalogClient {
    backend: Arc<dyn CatalogBackend>,
    options: BrowserOptions,
}

impl CatalogClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    /// Wrap an existing backend.
    pub fn with_backend(backend: Arc<dyn CatalogBackend>, options: BrowserOptions) -> Self {
        Self { backend, options }
    }

    // -- Query accessors ---------------------------------------------------

    /// Product listing, detail resolution and sitemap rows.
    pub fn products(&self) -> queries::ProductQuery<'_> {
        queries::ProductQuery::new(self.backend.as_ref())
    }

    pub fn categories(&self) -> queries::CategoryQuery<'_> {
        queries::CategoryQuery::new(self.backend.as_ref())
    }

    /// Brand facet loader.
    pub fn facets(&self) -> facets::FacetLoader<'_> {
        facets::FacetLoader::new(self.backend.as_ref())
    }

    /// Sitemap generator for the site rooted at `site_url`.
    pub fn sitemap(&self, site_url: &str) -> sitemap::SitemapGenerator<'_> {
        sitemap::SitemapGenerator::new(self.backend.as_ref(), site_url)
    }

    /// Start a browser session on the current tokio runtime.
    ///
    /// Each call starts an independent session; the first page for empty
    /// criteria is requested immediately.
    pub fn browse(&self) -> BrowserHandle {
        BrowserHandle::spawn(self.backend.clone(), self.options.clone())
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Return the backend for advanced usage.
    pub fn backend(&self) -> &Arc<dyn CatalogBackend> {
        &self.backend
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CatalogClient(backend={}, page_size={}, debounce={}ms)",
            self.backend.describe(),
            self.options.page_size,
            self.options.debounce.as_millis()
        )
    }
}
