//! Parameterized SELECT construction for the snapshot backend.
//!
//! The builder targets one aliased base table. Column names passed to it are
//! qualified with that alias; every value goes into the parameter list
//! behind a `?` placeholder and never into the SQL text.
//!
//! # Example
//!
//! ```rust
//! use parts_catalog::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("products", "p")
//!     .eq("brand", "Makita")
//!     .order("name", false)
//!     .window(50, 50)
//!     .build();
//! assert!(sql.contains("WHERE p.brand = ?"));
//! assert!(sql.ends_with("LIMIT 50\nOFFSET 50"));
//! assert_eq!(params, vec!["Makita"]);
//! ```

pub struct SqlBuilder {
    table: String,
    alias: String,
    columns: Vec<String>,
    extra: Vec<String>,
    joins: Vec<String>,
    conditions: Vec<String>,
    params: Vec<String>,
    order: Vec<String>,
    window: Option<(usize, usize)>,
}

impl SqlBuilder {
    pub fn new(table: &str, alias: &str) -> Self {
        Self {
            table: table.to_string(),
            alias: alias.to_string(),
            columns: Vec::new(),
            extra: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            params: Vec::new(),
            order: Vec::new(),
            window: None,
        }
    }

    /// `column` qualified with the base table's alias.
    pub fn qualify(&self, column: &str) -> String {
        format!("{}.{}", self.alias, column)
    }

    /// Select these base-table columns instead of `alias.*`.
    pub fn columns(&mut self, cols: &[&str]) -> &mut Self {
        self.columns = cols.iter().map(|c| self.qualify(c)).collect();
        self
    }

    /// Append a select expression after the base-table columns, e.g.
    /// `c.name AS category_name`.
    pub fn expr(&mut self, expr: &str) -> &mut Self {
        self.extra.push(expr.to_string());
        self
    }

    pub fn left_join(&mut self, table: &str, alias: &str, on: &str) -> &mut Self {
        self.joins
            .push(format!("LEFT JOIN {} {} ON {}", table, alias, on));
        self
    }

    /// `alias.column = ?`
    pub fn eq(&mut self, column: &str, value: &str) -> &mut Self {
        self.conditions.push(format!("{} = ?", self.qualify(column)));
        self.params.push(value.to_string());
        self
    }

    /// A condition without placeholders.
    pub fn condition(&mut self, sql: &str) -> &mut Self {
        self.conditions.push(sql.to_string());
        self
    }

    /// OR-group of single-placeholder conditions that all bind `value`.
    /// An empty slice adds nothing.
    pub fn any_of(&mut self, conditions: &[String], value: &str) -> &mut Self {
        if conditions.is_empty() {
            return self;
        }
        self.conditions
            .push(format!("({})", conditions.join(" OR ")));
        self.params
            .extend(std::iter::repeat(value.to_string()).take(conditions.len()));
        self
    }

    pub fn order(&mut self, column: &str, descending: bool) -> &mut Self {
        let dir = if descending { "DESC" } else { "ASC" };
        self.order.push(format!("{} {}", self.qualify(column), dir));
        self
    }

    pub fn window(&mut self, limit: usize, offset: usize) -> &mut Self {
        self.window = Some((limit, offset));
        self
    }

    /// SQL text (clauses separated by newlines) and bound parameters.
    pub fn build(&self) -> (String, Vec<String>) {
        let mut select = if self.columns.is_empty() {
            vec![format!("{}.*", self.alias)]
        } else {
            self.columns.clone()
        };
        select.extend(self.extra.iter().cloned());

        let mut lines = vec![
            format!("SELECT {}", select.join(", ")),
            format!("FROM {} {}", self.table, self.alias),
        ];
        lines.extend(self.joins.iter().cloned());
        if !self.conditions.is_empty() {
            lines.push(format!("WHERE {}", self.conditions.join(" AND ")));
        }
        if !self.order.is_empty() {
            lines.push(format!("ORDER BY {}", self.order.join(", ")));
        }
        if let Some((limit, offset)) = self.window {
            lines.push(format!("LIMIT {}", limit));
            lines.push(format!("OFFSET {}", offset));
        }

        (lines.join("\n"), self.params.clone())
    }
}
