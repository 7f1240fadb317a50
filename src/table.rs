//! Tabular view of API records.
//!
//! Records are flattened into `dotted.key` columns (`author.0.authname`), which
//! makes them easy to export as CSV and to snapshot to disk for later reuse.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Flattens a JSON value into `(path, text)` pairs.
///
/// Objects join keys with `.` and are walked in key order (`serde_json` maps are
/// sorted); arrays use the element index. `null` yields no pair.
pub fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(v, join(&prefix, k), out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(v, join(&prefix, &i.to_string()), out);
            }
        }
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Bool(_) | Value::Number(_) => out.push((prefix, value.to_string())),
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Rows of flattened records sharing one column list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Builds a table whose columns are the union of all flattened keys,
    /// in the order they are first seen.
    pub fn from_records(records: &[Value]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut flat_rows = Vec::with_capacity(records.len());

        for record in records {
            let pairs = flatten(record);
            for (k, _) in &pairs {
                if !index.contains_key(k) {
                    index.insert(k.clone(), columns.len());
                    columns.push(k.clone());
                }
            }
            flat_rows.push(pairs);
        }

        let rows = flat_rows
            .into_iter()
            .map(|pairs| {
                let mut row = vec![None; columns.len()];
                for (k, v) in pairs {
                    let cell = &mut row[index[&k]];
                    if cell.is_some() {
                        tracing::debug!(column = %k, "duplicate flattened key; keeping last value");
                    }
                    *cell = Some(v);
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of `name`, one per row.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx].as_deref()).collect())
    }

    /// Writes the table as CSV with a header row. Missing cells are empty.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        wtr.write_record(&self.columns)
            .context("failed to write CSV header")?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
                .context("failed to write CSV record")?;
        }
        wtr.flush().context("failed to flush CSV")?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "saved CSV");
        Ok(())
    }

    /// Saves a snapshot that [`Table::load`] reads back unchanged.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "saved snapshot");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to read snapshot {}", path.display()))
    }
}
