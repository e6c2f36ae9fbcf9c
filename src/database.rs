//! Ties the front-end (C6-C9), catalog (C5) and storage engine (C1-C4,
//! C10) together behind one statement-execution entry point.
//!
//! Callers never touch the catalog or buffer pool directly, only
//! `Database::execute`.

use crate::buffer_pool::{BufferPool, ReplacementPolicy};
use crate::catalog::{Catalog, ColumnSchema, ForeignKey, TableSchema};
use crate::error::{DbError, Result};
use crate::exec::{self, QueryResult};
use crate::pager::PageManager;
use crate::plan::{self, Plan};
use crate::semantic;
use crate::{ast::Stmt, ast::CreateTableStmt};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub buffer_capacity: usize,
    pub replacement_policy: ReplacementPolicy,
    /// Disables predicate push-down in the planner (testable property 4:
    /// result sets must be identical either way).
    pub pushdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            buffer_capacity: 16,
            replacement_policy: ReplacementPolicy::Lru,
            pushdown: true,
        }
    }
}

#[derive(Debug)]
pub enum StatementOutcome {
    TableCreated { table: String },
    RowsAffected(usize),
    Rows(QueryResult),
}

pub struct Database {
    catalog: Catalog,
    pool: BufferPool,
    pushdown: bool,
}

impl Database {
    pub fn open(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let catalog = Catalog::open(config.data_dir.join("catalog.json"))?;
        let pager = PageManager::new(&config.data_dir)?;
        let pool = BufferPool::new(pager, config.buffer_capacity, config.replacement_policy);
        Ok(Database { catalog, pool, pushdown: config.pushdown })
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<StatementOutcome> {
        semantic::analyze(&self.catalog, stmt)?;
        match stmt {
            Stmt::CreateTable(c) => self.execute_create_table(c),
            _ => {
                let built = plan::build_plan(stmt, self.pushdown)?;
                self.execute_plan(built)
            }
        }
    }

    fn execute_create_table(&mut self, c: &CreateTableStmt) -> Result<StatementOutcome> {
        let schema = table_schema_from_ast(c);
        self.catalog.create_table(schema)?;
        self.catalog
            .save()
            .map_err(|e| DbError::fatal(format!("catalog save failed during DDL: {e}")))?;
        self.pool
            .flush_all()
            .map_err(|e| DbError::fatal(format!("page flush failed during DDL: {e}")))?;
        log::info!("created table '{}'", c.table);
        Ok(StatementOutcome::TableCreated { table: c.table.clone() })
    }

    fn execute_plan(&mut self, plan: Plan) -> Result<StatementOutcome> {
        match plan {
            Plan::Insert { table, columns, rows } => {
                let n = exec::execute_insert(&table, &columns, &rows, &mut self.pool, &mut self.catalog)?;
                Ok(StatementOutcome::RowsAffected(n))
            }
            Plan::Update { table, assignments, predicate } => {
                let n = exec::execute_update(&table, &assignments, &predicate, &mut self.pool, &mut self.catalog)?;
                Ok(StatementOutcome::RowsAffected(n))
            }
            Plan::Delete { table, predicate } => {
                let n = exec::execute_delete(&table, &predicate, &mut self.pool, &mut self.catalog)?;
                Ok(StatementOutcome::RowsAffected(n))
            }
            select_plan => {
                let result = exec::execute_select(&select_plan, &mut self.pool, &mut self.catalog)?;
                Ok(StatementOutcome::Rows(result))
            }
        }
    }

    /// Flush every dirty page and persist the catalog. Called on clean
    /// shutdown and, per §5, after every DDL (handled inline above).
    pub fn shutdown(&mut self) -> Result<()> {
        self.pool.flush_all()?;
        self.catalog.save()?;
        log::info!("database shut down cleanly");
        Ok(())
    }
}

fn table_schema_from_ast(c: &CreateTableStmt) -> TableSchema {
    let columns = c
        .columns
        .iter()
        .map(|col| ColumnSchema {
            name: col.name.clone(),
            col_type: col.col_type,
            is_primary_key: col.is_primary_key || c.table_primary_key.as_deref() == Some(col.name.as_str()),
        })
        .collect();
    let foreign_keys = c
        .foreign_keys
        .iter()
        .map(|fk| ForeignKey { column: fk.column.clone(), ref_table: fk.ref_table.clone(), ref_column: fk.ref_column.clone() })
        .collect();
    TableSchema { name: c.table.clone(), columns, foreign_keys }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statements;

    fn exec_all(db: &mut Database, src: &str) -> Vec<Result<StatementOutcome>> {
        parse_statements(src)
            .into_iter()
            .map(|r| match r {
                Ok(stmt) => db.execute(&stmt),
                Err(e) => Err(e),
            })
            .collect()
    }

    #[test]
    fn full_lifecycle_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { data_dir: dir.path().to_path_buf(), ..Default::default() };
        {
            let mut db = Database::open(&config).unwrap();
            let results = exec_all(
                &mut db,
                "CREATE TABLE t(id INT PRIMARY KEY, n VARCHAR(4)); INSERT INTO t VALUES (1,'ab');",
            );
            assert!(results.iter().all(|r| r.is_ok()));
            db.shutdown().unwrap();
        }
        {
            let mut db = Database::open(&config).unwrap();
            let results = exec_all(&mut db, "SELECT * FROM t;");
            match &results[0] {
                Ok(StatementOutcome::Rows(r)) => assert_eq!(r.rows.len(), 1),
                other => panic!("unexpected: {:?}", other),
            }
        }
    }

    #[test]
    fn duplicate_table_is_a_statement_local_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { data_dir: dir.path().to_path_buf(), ..Default::default() };
        let mut db = Database::open(&config).unwrap();
        let results = exec_all(&mut db, "CREATE TABLE t(id INT); CREATE TABLE t(id INT); SELECT * FROM t;");
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
