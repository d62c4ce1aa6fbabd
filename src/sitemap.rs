//! sitemaps.org 0.9 sitemap and robots.txt for the public site.
//!
//! The sitemap lists the static pages followed by one URL per active
//! product that has a slug, most recently updated first.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::backend::CatalogBackend;
use crate::config;
use crate::error::Result;
use crate::files;
use crate::models::SitemapRow;
use crate::queries::ProductQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        };
        f.write_str(s)
    }
}

/// One `<url>` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: ChangeFreq,
    pub priority: f32,
}

/// Static pages: path, change frequency, priority.
const STATIC_PAGES: &[(&str, ChangeFreq, f32)] = &[
    ("", ChangeFreq::Weekly, 1.0),
    ("/produtos", ChangeFreq::Daily, 0.9),
    ("/sobre", ChangeFreq::Monthly, 0.7),
    ("/representacoes", ChangeFreq::Monthly, 0.7),
];

const PRODUCT_CHANGEFREQ: ChangeFreq = ChangeFreq::Weekly;
const PRODUCT_PRIORITY: f32 = 0.8;

/// Paths and URL count of a written sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapReport {
    pub sitemap_path: PathBuf,
    pub robots_path: PathBuf,
    pub url_count: usize,
}

pub struct SitemapGenerator<'a> {
    backend: &'a dyn CatalogBackend,
    site_url: String,
}

impl<'a> SitemapGenerator<'a> {
    pub fn new(backend: &'a dyn CatalogBackend, site_url: &str) -> Self {
        Self {
            backend,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Static pages, all stamped with `now`.
    pub fn static_urls(&self, now: DateTime<Utc>) -> Vec<SitemapUrl> {
        let lastmod = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        STATIC_PAGES
            .iter()
            .map(|(path, changefreq, priority)| SitemapUrl {
                loc: format!("{}{}", self.site_url, path),
                lastmod: Some(lastmod.clone()),
                changefreq: *changefreq,
                priority: *priority,
            })
            .collect()
    }

    /// One URL per product row. Rows whose timestamps cannot be parsed are
    /// still listed, without `<lastmod>`.
    pub fn product_urls(&self, rows: &[SitemapRow]) -> Vec<SitemapUrl> {
        rows.iter()
            .map(|row| {
                let lastmod = row.last_modified();
                if lastmod.is_none() {
                    warn!(slug = %row.slug, "product has no usable timestamp, omitting lastmod");
                }
                SitemapUrl {
                    loc: format!("{}/produtos/{}", self.site_url, row.slug),
                    lastmod,
                    changefreq: PRODUCT_CHANGEFREQ,
                    priority: PRODUCT_PRIORITY,
                }
            })
            .collect()
    }

    /// Static URLs followed by the product URLs fetched from the backend.
    pub async fn urls(&self, now: DateTime<Utc>) -> Result<Vec<SitemapUrl>> {
        let rows = ProductQuery::new(self.backend).sitemap_rows().await?;
        info!(products = rows.len(), "fetched sitemap rows");
        let mut urls = self.static_urls(now);
        urls.extend(self.product_urls(&rows));
        Ok(urls)
    }

    /// Write the sitemap and robots.txt into `out_dir`.
    pub async fn write(&self, out_dir: &Path, now: DateTime<Utc>) -> Result<SitemapReport> {
        let urls = self.urls(now).await?;

        let sitemap_path = out_dir.join(config::SITEMAP_FILE);
        let robots_path = out_dir.join(config::ROBOTS_FILE);
        files::write_atomically(&sitemap_path, render_sitemap(&urls).as_bytes())?;
        files::write_atomically(&robots_path, render_robots(&self.site_url).as_bytes())?;

        Ok(SitemapReport {
            sitemap_path,
            robots_path,
            url_count: urls.len(),
        })
    }
}

/// Render a `<urlset>` document.
pub fn render_sitemap(urls: &[SitemapUrl]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        xml.push_str("  <url>\n");
        let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&url.loc));
        if let Some(lastmod) = &url.lastmod {
            let _ = writeln!(xml, "    <lastmod>{}</lastmod>", escape_xml(lastmod));
        }
        let _ = writeln!(xml, "    <changefreq>{}</changefreq>", url.changefreq);
        let _ = writeln!(xml, "    <priority>{:.1}</priority>", url.priority);
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// robots.txt allowing everything and pointing at both sitemaps.
pub fn render_robots(site_url: &str) -> String {
    let site = site_url.trim_end_matches('/');
    format!(
        "User-agent: *\n\
         Allow: /\n\
         \n\
         # Sitemaps\n\
         Sitemap: {site}/{products}\n\
         Sitemap: {site}/sitemap.xml\n\
         \n\
         # Crawl-delay\n\
         Crawl-delay: 1\n",
        site = site,
        products = config::SITEMAP_FILE,
    )
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
