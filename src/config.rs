use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the backend base URL (e.g. `https://xyz.supabase.co`).
pub const API_URL_ENV: &str = "CATALOG_API_URL";
/// Environment variable holding the anonymous API key sent with every request.
pub const API_KEY_ENV: &str = "CATALOG_API_KEY";

/// Path prefix of the PostgREST endpoint on the hosted backend.
pub const REST_PATH: &str = "rest/v1";

pub const PRODUCTS_TABLE: &str = "products";
pub const CATEGORIES_TABLE: &str = "categories";

/// Rows per page requested by the product browser.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Quiet period before a filter edit turns into a query.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
/// Maximum number of product rows scanned when building the brand facet.
pub const BRAND_FACET_CAP: usize = 1000;
/// Page size used when exporting a snapshot from the hosted backend.
pub const EXPORT_PAGE_SIZE: usize = 1000;
/// Rows per request when collecting sitemap entries.
pub const SITEMAP_PAGE_SIZE: usize = 1000;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Public site root used for sitemap URLs.
pub const DEFAULT_SITE_URL: &str = "https://thdistribuicao.com";

pub const SITEMAP_FILE: &str = "sitemap-products.xml";
pub const ROBOTS_FILE: &str = "robots.txt";

pub const SNAPSHOT_PRODUCTS_FILE: &str = "products.ndjson";
pub const SNAPSHOT_CATEGORIES_FILE: &str = "categories.ndjson";

pub fn default_snapshot_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("parts-catalog")
    } else {
        PathBuf::from(".parts-catalog-snapshot")
    }
}
