//! DuckDB connection wrapper for snapshot tables.
//!
//! Snapshot tables are created from newline-delimited JSON with an explicit
//! column schema, so every row has the same shape no matter which keys the
//! export happened to contain.

use crate::error::{CatalogError, Result};
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Wraps an in-memory DuckDB database holding snapshot tables.
pub struct Connection {
    conn: DuckDbConnection,
    tables: RefCell<HashSet<String>>,
}

impl Connection {
    /// Open an empty in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self {
            conn,
            tables: RefCell::new(HashSet::new()),
        })
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has run.
        let stmt_ref = rows_result
            .as_ref()
            .ok_or_else(|| CatalogError::InvalidArgument("statement has no result set".into()))?;
        let column_names: Vec<String> = stmt_ref
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::with_capacity(column_names.len());
            for (i, col_name) in column_names.iter().enumerate() {
                let value = convert_value_ref(row.get_ref(i)?);
                map.insert(col_name.clone(), value);
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            let value = convert_value_ref(row.get_ref(0)?);
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Create a table from a newline-delimited JSON file.
    ///
    /// `columns` fixes the name and DuckDB type of every column; keys missing
    /// from a line become NULL and keys not listed are ignored.
    pub fn register_table_from_ndjson(
        &self,
        table_name: &str,
        ndjson_path: &str,
        columns: &[(&str, &str)],
    ) -> Result<()> {
        let path_fwd = ndjson_path.replace('\\', "/").replace('\'', "''");
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; \
             CREATE TABLE {} AS SELECT * FROM read_json('{}', \
             format='newline_delimited', columns={})",
            table_name,
            table_name,
            path_fwd,
            column_struct(columns)
        ))?;
        self.tables.borrow_mut().insert(table_name.to_string());
        Ok(())
    }

    /// Create an empty table with the given schema.
    pub fn create_empty_table(&self, table_name: &str, columns: &[(&str, &str)]) -> Result<()> {
        let cols: Vec<String> = columns
            .iter()
            .map(|(name, ty)| format!("\"{}\" {}", name, ty))
            .collect();
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; CREATE TABLE {} ({})",
            table_name,
            table_name,
            cols.join(", ")
        ))?;
        self.tables.borrow_mut().insert(table_name.to_string());
        Ok(())
    }

    /// Check whether a table has been registered.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.borrow().contains(name)
    }

    /// Number of rows in a registered table.
    pub fn row_count(&self, table_name: &str) -> Result<i64> {
        if !self.has_table(table_name) {
            return Err(CatalogError::NotFound(format!("Unknown snapshot table: {}", table_name)));
        }
        let count = self
            .execute_scalar(&format!("SELECT COUNT(*) FROM {}", table_name), &[])?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(count)
    }
}

/// `{'id': 'VARCHAR', 'price': 'DOUBLE'}` struct literal for `read_json`.
fn column_struct(columns: &[(&str, &str)]) -> String {
    let fields: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("'{}': '{}'", name, ty))
        .collect();
    format!("{{{}}}", fields.join(", "))
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).to_string()),
        // Snapshot schemas only use VARCHAR, JSON, DOUBLE, BIGINT and BOOLEAN.
        _ => serde_json::Value::Null,
    }
}
