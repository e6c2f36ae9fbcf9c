//! Catalog (C5): persistent metadata for tables, columns, keys and the
//! page directory per table.
//!
//! A single `Catalog` is owned by the `Database` and passed by reference
//! to every subsystem that needs it (§9 "Catalog as process-wide state").
//! It is serialized as pretty-printed JSON on every DDL and at shutdown,
//! via ordinary `serde`-derived persistence.

use crate::error::{DbError, Result};
use crate::value::ColumnType;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub col_type: ColumnType,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.is_primary_key)
    }
}

/// On-disk document shape. Kept separate from `Catalog` so (de)serialization
/// is a single, obvious boundary.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogDoc {
    /// Recorded per §6's "alternative permitted" note: which physical
    /// scheme the page files use. This rewrite always uses
    /// "single-file-per-table".
    layout: String,
    tables: Vec<TableSchema>,
    pages: FxHashMap<String, Vec<u64>>,
}

/// In-memory catalog plus its on-disk path. Exclusively owned by `Database`.
pub struct Catalog {
    path: PathBuf,
    tables: FxHashMap<String, TableSchema>,
    /// table name -> ordered list of page ids belonging to that table.
    pages: FxHashMap<String, Vec<u64>>,
}

impl Catalog {
    /// Load `path` if it exists, otherwise start with an empty catalog.
    /// A file that exists but fails to parse is a hard error (the shell
    /// turns this into exit code 1, per §6).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let doc: CatalogDoc = serde_json::from_str(&text)?;
            let tables = doc
                .tables
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect();
            Ok(Catalog { path, tables, pages: doc.pages })
        } else {
            Ok(Catalog { path, tables: FxHashMap::default(), pages: FxHashMap::default() })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        if self.tables.contains_key(&schema.name) {
            return Err(DbError::semantic(format!("table '{}' already exists", schema.name)));
        }
        self.pages.insert(schema.name.clone(), Vec::new());
        self.tables.insert(schema.name.clone(), schema);
        Ok(())
    }

    pub fn page_ids(&self, table: &str) -> &[u64] {
        self.pages.get(table).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn add_page(&mut self, table: &str, page_id: u64) {
        self.pages.entry(table.to_string()).or_default().push(page_id);
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let doc = CatalogDoc {
            layout: "single-file-per-table".to_string(),
            tables: self.tables.values().cloned().collect(),
            pages: self.pages.clone(),
        };
        let text = serde_json::to_string_pretty(&doc)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
