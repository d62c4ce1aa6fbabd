//! Offline backend over an NDJSON export of the catalog tables.
//!
//! A snapshot directory holds `products.ndjson` and (optionally)
//! `categories.ndjson`, one row object per line, as written by
//! [`export_snapshot`]. The files are loaded into an in-memory DuckDB
//! database and plans are rendered to SQL with [`SqlBuilder`].
//!
//! DuckDB work runs on the blocking thread pool via
//! [`tokio::task::spawn_blocking`]; the connection sits behind a [`Mutex`]
//! since it uses `RefCell` internally.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::backend::CatalogBackend;
use crate::config;
use crate::connection::Connection;
use crate::error::{CatalogError, Result};
use crate::files;
use crate::query::{self, Direction, FilterValue, Predicate, QueryPlan};
use crate::sql_builder::SqlBuilder;

/// Column schema of the `products` snapshot table.
pub const PRODUCT_COLUMNS: &[(&str, &str)] = &[
    ("id", "VARCHAR"),
    ("name", "VARCHAR"),
    ("description", "VARCHAR"),
    ("part_number", "VARCHAR"),
    ("category_id", "VARCHAR"),
    ("brand", "VARCHAR"),
    ("price", "DOUBLE"),
    ("stock_quantity", "BIGINT"),
    ("is_active", "BOOLEAN"),
    ("specifications", "JSON"),
    ("slug", "VARCHAR"),
    ("image_url", "VARCHAR"),
    ("created_at", "VARCHAR"),
    ("updated_at", "VARCHAR"),
];

/// Column schema of the `categories` snapshot table.
pub const CATEGORY_COLUMNS: &[(&str, &str)] = &[
    ("id", "VARCHAR"),
    ("name", "VARCHAR"),
    ("description", "VARCHAR"),
    ("created_at", "VARCHAR"),
    ("updated_at", "VARCHAR"),
];

/// Aliases of the joined category columns before they are folded back into
/// a `categories` object.
const CATEGORY_ID_ALIAS: &str = "category_ref_id";
const CATEGORY_NAME_ALIAS: &str = "category_ref_name";

pub struct SnapshotBackend {
    inner: Arc<Mutex<Connection>>,
    dir: Option<PathBuf>,
}

impl SnapshotBackend {
    /// Load the snapshot stored in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let products = dir.join(config::SNAPSHOT_PRODUCTS_FILE);
        if !products.exists() {
            return Err(CatalogError::NotFound(format!(
                "no snapshot at {} (run `parts-catalog snapshot` first)",
                dir.display()
            )));
        }

        let conn = Connection::open_in_memory()?;
        conn.register_table_from_ndjson(
            config::PRODUCTS_TABLE,
            &products.to_string_lossy(),
            PRODUCT_COLUMNS,
        )?;

        let categories = dir.join(config::SNAPSHOT_CATEGORIES_FILE);
        if categories.exists() {
            conn.register_table_from_ndjson(
                config::CATEGORIES_TABLE,
                &categories.to_string_lossy(),
                CATEGORY_COLUMNS,
            )?;
        } else {
            conn.create_empty_table(config::CATEGORIES_TABLE, CATEGORY_COLUMNS)?;
        }

        info!(
            dir = %dir.display(),
            products = conn.row_count(config::PRODUCTS_TABLE)?,
            "snapshot loaded"
        );

        Ok(Self {
            inner: Arc::new(Mutex::new(conn)),
            dir: Some(dir.to_path_buf()),
        })
    }

    /// Wrap a connection whose `products` and `categories` tables were
    /// registered by the caller.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
            dir: None,
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Run a closure against the connection on the blocking pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| CatalogError::InvalidArgument("snapshot lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CatalogError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

#[async_trait]
impl CatalogBackend for SnapshotBackend {
    async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        let plan = plan.clone();
        self.run(move |conn| {
            if !conn.has_table(plan.table) {
                return Err(CatalogError::NotFound(format!(
                    "Unknown snapshot table: {}",
                    plan.table
                )));
            }
            let (sql, params) = render_sql(&plan);
            debug!(%sql, ?params, "snapshot query");
            let rows = conn.execute(&sql, &params)?;
            Ok(rows
                .into_iter()
                .map(|row| shape_row(row, plan.embed_category))
                .collect())
        })
        .await
    }

    fn describe(&self) -> String {
        match &self.dir {
            Some(dir) => format!("snapshot({})", dir.display()),
            None => "snapshot(in-memory)".to_string(),
        }
    }
}

/// Render a plan as DuckDB SQL against the snapshot tables.
///
/// The plan's table is aliased `t`; the embedded category is a LEFT JOIN on
/// `categories c`.
pub fn render_sql(plan: &QueryPlan) -> (String, Vec<String>) {
    let mut qb = SqlBuilder::new(plan.table, "t");
    qb.columns(&plan.columns);

    if plan.embed_category {
        qb.left_join(config::CATEGORIES_TABLE, "c", "t.category_id = c.id");
        qb.expr(&format!("c.id AS {}", CATEGORY_ID_ALIAS));
        qb.expr(&format!("c.name AS {}", CATEGORY_NAME_ALIAS));
    }

    for predicate in &plan.predicates {
        match predicate {
            Predicate::Eq {
                column,
                value: FilterValue::Text(text),
            } => {
                qb.eq(column, text);
            }
            Predicate::Eq {
                column,
                value: FilterValue::Bool(b),
            } => {
                let literal = if *b { "TRUE" } else { "FALSE" };
                let condition = format!("{} = {}", qb.qualify(column), literal);
                qb.condition(&condition);
            }
            Predicate::NotNull { column } => {
                let condition = format!("{} IS NOT NULL", qb.qualify(column));
                qb.condition(&condition);
            }
            Predicate::AnyContains { columns, needle } => {
                let pattern = format!("%{}%", query::escape_like(needle));
                let conditions: Vec<String> = columns
                    .iter()
                    .map(|c| format!("LOWER({}) LIKE LOWER(?) ESCAPE '\\'", qb.qualify(c)))
                    .collect();
                qb.any_of(&conditions, &pattern);
            }
        }
    }

    for o in &plan.order {
        qb.order(o.column, o.direction == Direction::Desc);
    }

    if let Some(window) = plan.window {
        qb.window(window.limit(), window.start);
    }

    qb.build()
}

/// Turn a flat DuckDB row into the row shape the hosted backend returns.
fn shape_row(mut row: HashMap<String, Value>, embed_category: bool) -> Value {
    let category_id = row.remove(CATEGORY_ID_ALIAS);
    let category_name = row.remove(CATEGORY_NAME_ALIAS);
    if embed_category {
        let category = match (category_id, category_name) {
            (Some(id @ Value::String(_)), Some(name)) => {
                let mut obj = Map::new();
                obj.insert("id".to_string(), id);
                obj.insert("name".to_string(), name);
                Value::Object(obj)
            }
            _ => Value::Null,
        };
        row.insert("categories".to_string(), category);
    }

    // JSON columns come back as their text.
    if let Some(specs) = row.remove("specifications") {
        let parsed = match specs {
            Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
            other => other,
        };
        row.insert("specifications".to_string(), parsed);
    }

    Value::Object(row.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Counts written by [`export_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub products: usize,
    pub categories: usize,
}

/// Write the active products and all categories of `backend` to `dir` in
/// the snapshot format.
///
/// Products are fetched in pages of
/// [`EXPORT_PAGE_SIZE`](config::EXPORT_PAGE_SIZE) until a short page arrives.
/// Files are replaced atomically, so a failed export leaves any previous
/// snapshot intact.
pub async fn export_snapshot(backend: &dyn CatalogBackend, dir: &Path) -> Result<ExportSummary> {
    let mut products = Vec::new();
    let mut start = 0;
    loop {
        let page = backend
            .execute(&query::export_page(start, config::EXPORT_PAGE_SIZE))
            .await?;
        let received = page.len();
        products.extend(page);
        debug!(start, received, "exported product page");
        if received < config::EXPORT_PAGE_SIZE {
            break;
        }
        start += config::EXPORT_PAGE_SIZE;
    }

    let categories = backend.execute(&query::categories()).await?;

    fs::create_dir_all(dir)?;
    files::write_atomically(&dir.join(config::SNAPSHOT_PRODUCTS_FILE), &to_ndjson(&products)?)?;
    files::write_atomically(
        &dir.join(config::SNAPSHOT_CATEGORIES_FILE),
        &to_ndjson(&categories)?,
    )?;

    Ok(ExportSummary {
        products: products.len(),
        categories: categories.len(),
    })
}

fn to_ndjson(rows: &[Value]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut buf, row)?;
        buf.write_all(b"\n")?;
    }
    Ok(buf)
}
