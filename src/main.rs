//! parts-catalog CLI.
//!
//! Commands:
//! - `parts-catalog sitemap` - write the product sitemap and robots.txt
//! - `parts-catalog snapshot` - export the catalog for offline use
//! - `parts-catalog search` - print one page of the filtered listing
//! - `parts-catalog show` - resolve a slug or product id
//! - `parts-catalog brands` - print the brand facet

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parts_catalog::backend::snapshot;
use parts_catalog::{config, CatalogClient, DetailState, FilterCriteria, Result};

/// Product catalog tools for the parts distributor site
#[derive(Parser)]
#[command(name = "parts-catalog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = config::API_URL_ENV)]
    api_url: Option<String>,

    /// Backend API key
    #[arg(long, global = true, env = config::API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Query the local snapshot instead of the backend
    #[arg(long, global = true)]
    offline: bool,

    /// Snapshot directory (defaults to the platform cache directory)
    #[arg(long, global = true)]
    snapshot_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write sitemap-products.xml and robots.txt
    Sitemap(SitemapArgs),

    /// Export active products and categories as an offline snapshot
    Snapshot(SnapshotArgs),

    /// Print one page of the product listing
    Search(SearchArgs),

    /// Resolve a detail-route token and print the product
    Show(ShowArgs),

    /// Print the brand facet
    Brands,
}

#[derive(Args)]
struct SitemapArgs {
    /// Output directory
    #[arg(long, default_value = "public")]
    out: PathBuf,

    /// Public site root
    #[arg(long, default_value = config::DEFAULT_SITE_URL)]
    site_url: String,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output directory (defaults to the snapshot directory)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text term matched against name, description and part number
    #[arg(default_value = "")]
    term: String,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    brand: Option<String>,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = config::DEFAULT_PAGE_SIZE)]
    page_size: usize,
}

#[derive(Args)]
struct ShowArgs {
    /// Product slug or id
    token: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut builder = CatalogClient::builder().offline(cli.offline);
    if let Some(url) = cli.api_url {
        builder = builder.api_url(url);
    }
    if let Some(key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(dir) = &cli.snapshot_dir {
        builder = builder.snapshot_dir(dir);
    }
    let client = builder.build()?;
    info!(%client, "catalog client ready");

    match cli.command {
        Commands::Sitemap(args) => {
            let report = client
                .sitemap(&args.site_url)
                .write(&args.out, Utc::now())
                .await?;
            info!(
                urls = report.url_count,
                sitemap = %report.sitemap_path.display(),
                robots = %report.robots_path.display(),
                "sitemap written"
            );
        }
        Commands::Snapshot(args) => {
            let out = args
                .out
                .or(cli.snapshot_dir)
                .unwrap_or_else(config::default_snapshot_dir);
            let summary = snapshot::export_snapshot(client.backend().as_ref(), &out).await?;
            info!(
                products = summary.products,
                categories = summary.categories,
                dir = %out.display(),
                "snapshot written"
            );
        }
        Commands::Search(args) => {
            let criteria = FilterCriteria {
                search_term: args.term,
                category_id: args.category,
                brand: args.brand,
            };
            let products = client
                .products()
                .page(&criteria, args.page, args.page_size)
                .await?;
            if products.is_empty() {
                println!("No products match these filters.");
            }
            for product in &products {
                println!(
                    "{}\t{}\t{}",
                    product.route_token(),
                    product.display_name(),
                    product.brand.as_deref().unwrap_or("-")
                );
            }
            if products.len() == args.page_size {
                info!(next_page = args.page + 1, "more results may be available");
            }
        }
        Commands::Show(args) => match client.products().detail(&args.token).await {
            DetailState::Found(product) => {
                println!("{}", serde_json::to_string_pretty(&product)?);
            }
            DetailState::NotFound => {
                println!("Product not found: {}", args.token);
                return Ok(ExitCode::from(2));
            }
            DetailState::Failed(message) => {
                error!(%message, "could not load product");
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Brands => {
            for brand in client.facets().brands(config::BRAND_FACET_CAP).await? {
                println!("{}", brand);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
