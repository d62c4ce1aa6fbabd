//! Shared test fixtures for the parts-catalog integration tests.
//!
//! Provides `setup_snapshot()`, which writes a small sample catalog as NDJSON
//! into a temp dir and opens it as a `SnapshotBackend`, and `MemoryBackend`,
//! an in-process backend that evaluates plans over the same rows while
//! recording calls, injecting latency and failing on demand.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use parts_catalog::backend::snapshot;
use parts_catalog::config;
use parts_catalog::query::{Direction, FilterValue, Predicate, QueryPlan};
use parts_catalog::{CatalogBackend, CatalogError, Connection, Product, Result, SnapshotBackend};

pub const MAKITA_DRILL_ID: &str = "0b6f3c2e-8d1a-4e57-9c2b-1a2b3c4d5e01";
pub const MAKITA_WRENCH_ID: &str = "0b6f3c2e-8d1a-4e57-9c2b-1a2b3c4d5e02";
pub const OIL_FILTER_ID: &str = "0b6f3c2e-8d1a-4e57-9c2b-1a2b3c4d5e03";
pub const CUTTING_DISC_ID: &str = "0b6f3c2e-8d1a-4e57-9c2b-1a2b3c4d5e04";
pub const TIMING_BELT_ID: &str = "0b6f3c2e-8d1a-4e57-9c2b-1a2b3c4d5e05";
pub const BEARING_ID: &str = "0b6f3c2e-8d1a-4e57-9c2b-1a2b3c4d5e06";

pub const TOOLS_CATEGORY: &str = "cat-ferramentas";
pub const FILTERS_CATEGORY: &str = "cat-filtros";

/// Number of active rows in `sample_products()`.
pub const ACTIVE_PRODUCTS: usize = 5;

pub fn sample_products() -> Vec<Value> {
    vec![
        json!({
            "id": MAKITA_DRILL_ID,
            "name": "Makita Furadeira",
            "description": "Furadeira de impacto 710W",
            "part_number": "HP1640",
            "category_id": TOOLS_CATEGORY,
            "brand": "Makita",
            "price": 459.9,
            "stock_quantity": 12,
            "is_active": true,
            "specifications": {"voltage": "220V", "power_w": 710},
            "slug": "makita-furadeira-makita-hp1640",
            "image_url": null,
            "created_at": "2024-01-02T09:00:00+00:00",
            "updated_at": "2024-03-01T12:00:00.123456+00:00"
        }),
        json!({
            "id": MAKITA_WRENCH_ID,
            "name": "Chave Makita",
            "description": "Chave de impacto",
            "part_number": "TW0350",
            "category_id": TOOLS_CATEGORY,
            "brand": "Makita",
            "price": 899.0,
            "stock_quantity": 3,
            "is_active": true,
            "specifications": null,
            "slug": null,
            "image_url": null,
            "created_at": "2024-01-05T10:00:00+00:00",
            "updated_at": null
        }),
        json!({
            "id": OIL_FILTER_ID,
            "name": "Filtro de Óleo",
            "description": "Filtro para motores diesel",
            "part_number": "FH-100",
            "category_id": FILTERS_CATEGORY,
            "brand": "Hella",
            "price": 49.5,
            "stock_quantity": 40,
            "is_active": true,
            "specifications": {"thread": "M20x1.5"},
            "slug": "filtro-de-oleo-hella-fh100",
            "image_url": "https://cdn.example.com/fh100.jpg",
            "created_at": "2024-01-15 08:30:00",
            "updated_at": null
        }),
        json!({
            "id": CUTTING_DISC_ID,
            "name": "Disco de Corte",
            "description": "Disco abrasivo 115mm",
            "part_number": "2608600",
            "category_id": TOOLS_CATEGORY,
            "brand": "Bosch",
            "price": 12.0,
            "stock_quantity": 200,
            "is_active": true,
            "specifications": null,
            "slug": "disco-de-corte-bosch-2608600",
            "image_url": null,
            "created_at": "2024-01-20T00:00:00Z",
            "updated_at": "2024-02-10T10:00:00Z"
        }),
        json!({
            "id": TIMING_BELT_ID,
            "name": "Correia Dentada",
            "description": "Correia sincronizadora",
            "part_number": "T100",
            "category_id": null,
            "brand": "Gates",
            "price": 80.0,
            "stock_quantity": 0,
            "is_active": false,
            "specifications": null,
            "slug": "correia-dentada-gates-t100",
            "image_url": null,
            "created_at": "2023-11-01T00:00:00Z",
            "updated_at": "2023-12-01T00:00:00Z"
        }),
        json!({
            "id": BEARING_ID,
            "name": "Rolamento 6205",
            "description": "Rolamento de esferas",
            "part_number": null,
            "category_id": null,
            "brand": null,
            "price": 25.0,
            "stock_quantity": 18,
            "is_active": true,
            "specifications": null,
            "slug": "rolamento-6205",
            "image_url": null,
            "created_at": null,
            "updated_at": "not a timestamp"
        }),
    ]
}

pub fn sample_categories() -> Vec<Value> {
    vec![
        json!({"id": TOOLS_CATEGORY, "name": "Ferramentas", "description": null,
               "created_at": "2023-10-01T00:00:00Z", "updated_at": null}),
        json!({"id": FILTERS_CATEGORY, "name": "Filtros", "description": "Filtros automotivos",
               "created_at": "2023-10-01T00:00:00Z", "updated_at": null}),
    ]
}

pub fn write_ndjson(path: &std::path::Path, rows: &[Value]) {
    let mut file = std::fs::File::create(path).unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
}

/// Write the sample catalog into a temp dir and open it.
///
/// The caller must keep the `TempDir` alive for the duration of the test.
pub fn setup_snapshot() -> (SnapshotBackend, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    write_ndjson(
        &tmp_dir.path().join(config::SNAPSHOT_PRODUCTS_FILE),
        &sample_products(),
    );
    write_ndjson(
        &tmp_dir.path().join(config::SNAPSHOT_CATEGORIES_FILE),
        &sample_categories(),
    );
    let backend = SnapshotBackend::open(tmp_dir.path()).unwrap();
    (backend, tmp_dir)
}

/// Register the sample tables on a fresh in-memory connection.
pub fn setup_connection() -> (Connection, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let products = tmp_dir.path().join(config::SNAPSHOT_PRODUCTS_FILE);
    let categories = tmp_dir.path().join(config::SNAPSHOT_CATEGORIES_FILE);
    write_ndjson(&products, &sample_products());
    write_ndjson(&categories, &sample_categories());

    let conn = Connection::open_in_memory().unwrap();
    conn.register_table_from_ndjson(
        config::PRODUCTS_TABLE,
        &products.to_string_lossy(),
        snapshot::PRODUCT_COLUMNS,
    )
    .unwrap();
    conn.register_table_from_ndjson(
        config::CATEGORIES_TABLE,
        &categories.to_string_lossy(),
        snapshot::CATEGORY_COLUMNS,
    )
    .unwrap();
    (conn, tmp_dir)
}

/// Build a product from the fields the pager cares about.
pub fn product(id: &str, name: &str) -> Product {
    serde_json::from_value(json!({"id": id, "name": name, "is_active": true})).unwrap()
}

pub fn inactive_product(id: &str, name: &str) -> Product {
    serde_json::from_value(json!({"id": id, "name": name, "is_active": false})).unwrap()
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

type Latency = Box<dyn Fn(&QueryPlan) -> Duration + Send + Sync>;

/// Evaluates plans over in-memory rows.
pub struct MemoryBackend {
    tables: HashMap<&'static str, Vec<Value>>,
    calls: Mutex<Vec<QueryPlan>>,
    failures: Mutex<usize>,
    latency: Latency,
}

impl MemoryBackend {
    pub fn new(products: Vec<Value>, categories: Vec<Value>) -> Self {
        let mut tables = HashMap::new();
        tables.insert(config::PRODUCTS_TABLE, products);
        tables.insert(config::CATEGORIES_TABLE, categories);
        Self {
            tables,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(0),
            latency: Box::new(|_| Duration::ZERO),
        }
    }

    pub fn sample() -> Self {
        Self::new(sample_products(), sample_categories())
    }

    /// Delay each call by what `latency` returns for its plan.
    pub fn with_latency(
        mut self,
        latency: impl Fn(&QueryPlan) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.latency = Box::new(latency);
        self
    }

    /// Make the next `n` calls fail with a 503.
    pub fn fail_next(&self, n: usize) {
        *self.failures.lock().unwrap() = n;
    }

    pub fn calls(&self) -> Vec<QueryPlan> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that requested a listing page.
    pub fn page_calls(&self) -> Vec<QueryPlan> {
        self.calls()
            .into_iter()
            .filter(|p| p.table == config::PRODUCTS_TABLE && p.embed_category && p.window.is_some())
            .collect()
    }

    fn evaluate(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        let rows = self
            .tables
            .get(plan.table)
            .ok_or_else(|| CatalogError::NotFound(plan.table.to_string()))?;

        let mut rows: Vec<Value> = rows
            .iter()
            .filter(|row| plan.predicates.iter().all(|p| matches(row, p)))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            for order in &plan.order {
                let ord = field(a, order.column).cmp(&field(b, order.column));
                let ord = match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        if let Some(window) = plan.window {
            rows = rows
                .into_iter()
                .skip(window.start)
                .take(window.limit())
                .collect();
        }

        if !plan.columns.is_empty() {
            rows = rows
                .into_iter()
                .map(|row| {
                    let projected: serde_json::Map<String, Value> = plan
                        .columns
                        .iter()
                        .map(|c| (c.to_string(), row.get(*c).cloned().unwrap_or(Value::Null)))
                        .collect();
                    Value::Object(projected)
                })
                .collect();
        }

        Ok(rows)
    }
}

#[async_trait]
impl CatalogBackend for MemoryBackend {
    async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        self.calls.lock().unwrap().push(plan.clone());

        let delay = (self.latency)(plan);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(CatalogError::Backend {
                    status: 503,
                    message: "service unavailable".into(),
                });
            }
        }

        self.evaluate(plan)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Search needle of a plan, if it has one.
pub fn needle(plan: &QueryPlan) -> Option<&str> {
    plan.predicates.iter().find_map(|p| match p {
        Predicate::AnyContains { needle, .. } => Some(needle.as_str()),
        _ => None,
    })
}

fn field<'a>(row: &'a Value, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

fn matches(row: &Value, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq {
            column,
            value: FilterValue::Text(text),
        } => field(row, column) == Some(text.as_str()),
        Predicate::Eq {
            column,
            value: FilterValue::Bool(b),
        } => row.get(*column).and_then(Value::as_bool) == Some(*b),
        Predicate::NotNull { column } => row.get(*column).is_some_and(|v| !v.is_null()),
        Predicate::AnyContains { columns, needle } => {
            let needle = needle.to_lowercase();
            columns.iter().any(|c| {
                field(row, c).is_some_and(|v| v.to_lowercase().contains(&needle))
            })
        }
    }
}
