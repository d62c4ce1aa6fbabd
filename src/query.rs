//! Backend-agnostic query plans.
//!
//! A [`QueryPlan`] mirrors the hosted backend's query surface
//! (`select -> filter -> order -> range`) without committing to a transport.
//! [`RestBackend`](crate::backend::RestBackend) renders plans as PostgREST
//! query parameters, [`SnapshotBackend`](crate::backend::SnapshotBackend) as
//! SQL through [`SqlBuilder`](crate::SqlBuilder).
//!
//! Plan construction is pure: the same inputs always produce an equal plan,
//! and equal plans render to byte-identical parameters.
//!
//! # Example
//!
//! ```rust
//! use parts_catalog::query::{self, FilterValue, Predicate};
//! use parts_catalog::FilterCriteria;
//!
//! let criteria = FilterCriteria {
//!     search_term: "makita".into(),
//!     ..Default::default()
//! };
//! let plan = query::product_page(&criteria, 2, 50).unwrap();
//! assert_eq!(plan.window.unwrap().start, 50);
//! assert!(plan.predicates.contains(&Predicate::Eq {
//!     column: "is_active",
//!     value: FilterValue::Bool(true),
//! }));
//! ```

use crate::browser::criteria::FilterCriteria;
use crate::config;
use crate::error::{CatalogError, Result};

/// Columns matched by the free-text search.
pub const SEARCH_COLUMNS: [&str; 3] = ["name", "description", "part_number"];

/// Value on the right-hand side of an equality filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterValue {
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// `column = value`
    Eq {
        column: &'static str,
        value: FilterValue,
    },
    /// `column IS NOT NULL`
    NotNull { column: &'static str },
    /// Case-insensitive substring match of `needle` against any of `columns`.
    AnyContains {
        columns: Vec<&'static str>,
        needle: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: Direction,
}

/// Zero-indexed row window, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn limit(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPlan {
    pub table: &'static str,
    /// Selected columns; empty selects every column.
    pub columns: Vec<&'static str>,
    /// Embed the referenced category as `categories: {id, name}`.
    pub embed_category: bool,
    pub predicates: Vec<Predicate>,
    pub order: Vec<OrderBy>,
    pub window: Option<Window>,
}

impl QueryPlan {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            embed_category: false,
            predicates: Vec::new(),
            order: Vec::new(),
            window: None,
        }
    }

    pub fn select(mut self, columns: &[&'static str]) -> Self {
        self.columns = columns.to_vec();
        self
    }

    pub fn with_category(mut self) -> Self {
        self.embed_category = true;
        self
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Eq {
            column,
            value: FilterValue::Text(value.into()),
        });
        self
    }

    pub fn eq_bool(mut self, column: &'static str, value: bool) -> Self {
        self.predicates.push(Predicate::Eq {
            column,
            value: FilterValue::Bool(value),
        });
        self
    }

    pub fn not_null(mut self, column: &'static str) -> Self {
        self.predicates.push(Predicate::NotNull { column });
        self
    }

    pub fn any_contains(mut self, columns: &[&'static str], needle: impl Into<String>) -> Self {
        self.predicates.push(Predicate::AnyContains {
            columns: columns.to_vec(),
            needle: needle.into(),
        });
        self
    }

    pub fn order(mut self, column: &'static str, direction: Direction) -> Self {
        self.order.push(OrderBy { column, direction });
        self
    }

    /// Restrict to rows `start..=end`.
    pub fn range(mut self, start: usize, end: usize) -> Self {
        self.window = Some(Window { start, end });
        self
    }

    /// First `n` rows; `0` leaves the plan unbounded.
    pub fn limit(self, n: usize) -> Self {
        if n == 0 {
            return self;
        }
        self.range(0, n - 1)
    }
}

// ---------------------------------------------------------------------------
// Plans used by the catalog
// ---------------------------------------------------------------------------

/// Active products, category embedded.
fn active_products() -> QueryPlan {
    QueryPlan::new(config::PRODUCTS_TABLE)
        .with_category()
        .eq_bool("is_active", true)
}

/// One page of the product listing for the given criteria.
///
/// Pages are 1-based; page `p` covers rows `(p-1)*size ..= p*size-1` of the
/// listing sorted by name, with the id as tie-break so page boundaries are
/// stable between requests.
pub fn product_page(criteria: &FilterCriteria, page: u32, page_size: usize) -> Result<QueryPlan> {
    if page == 0 {
        return Err(CatalogError::InvalidArgument("page numbers start at 1".into()));
    }
    if page_size == 0 {
        return Err(CatalogError::InvalidArgument("page size must be positive".into()));
    }

    let mut plan = active_products();

    if let Some(term) = criteria.search() {
        plan = plan.any_contains(&SEARCH_COLUMNS, term);
    }
    if let Some(category_id) = criteria.category_id.as_deref() {
        plan = plan.eq("category_id", category_id);
    }
    if let Some(brand) = criteria.brand.as_deref() {
        plan = plan.eq("brand", brand);
    }

    let start = (page as usize - 1) * page_size;
    Ok(plan
        .order("name", Direction::Asc)
        .order("id", Direction::Asc)
        .range(start, start + page_size - 1))
}

/// Active product whose stored slug equals `slug`.
pub fn product_by_slug(slug: &str) -> QueryPlan {
    active_products().eq("slug", slug).limit(1)
}

/// Active product with the given id.
pub fn product_by_id(id: &str) -> QueryPlan {
    active_products().eq("id", id).limit(1)
}

/// Brand column of up to `cap` active products.
pub fn brand_facet(cap: usize) -> QueryPlan {
    QueryPlan::new(config::PRODUCTS_TABLE)
        .select(&["brand"])
        .eq_bool("is_active", true)
        .limit(cap)
}

/// Every category ordered by name.
pub fn categories() -> QueryPlan {
    QueryPlan::new(config::CATEGORIES_TABLE).order("name", Direction::Asc)
}

/// One page of sitemap rows: active products with a slug, most recently
/// updated first, id as tie-break.
pub fn sitemap_page(start: usize, page_size: usize) -> QueryPlan {
    QueryPlan::new(config::PRODUCTS_TABLE)
        .select(&["slug", "updated_at", "created_at"])
        .eq_bool("is_active", true)
        .not_null("slug")
        .order("updated_at", Direction::Desc)
        .order("id", Direction::Asc)
        .range(start, start + page_size - 1)
}

/// One page of the raw active-product export, ordered by id.
pub fn export_page(start: usize, page_size: usize) -> QueryPlan {
    QueryPlan::new(config::PRODUCTS_TABLE)
        .eq_bool("is_active", true)
        .order("id", Direction::Asc)
        .range(start, start + page_size - 1)
}

/// Backslash-escape LIKE wildcards so a search needle matches literally.
pub fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
