//! Executor (C10): interprets a logical plan against the file manager (C4)
//! and catalog (C5).
//!
//! §4.10 describes a pull-based `open`/`next`/`close` pipeline. `Aggregate`
//! and `Sort` must fully materialize their input regardless (a running
//! aggregate needs every row before it can emit one; a stable sort needs
//! the whole set), and `NestedLoopJoin` caches its finite right side rather
//! than re-scanning it per left row. Once every stage above `SeqScan`
//! already buffers its input, nothing is gained by threading a lazy
//! `next()` through the remaining nodes too, so this evaluator resolves
//! each node to a materialized `Vec` in one recursive pass. What carries
//! over from C4's design is the pinned-page discipline: the buffer pool is
//! always a borrowed parameter, never a field stored across calls, and at
//! most one `TableScan` is ever alive at a time.

use crate::ast::{AggKind, BinOpKind, Expr, SelectItem};
use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::{ConstraintKind, DbError, Result};
use crate::file_manager::{self, TableScan};
use crate::plan::Plan;
use crate::value::{ColumnType, Value};
use std::cmp::Ordering;
use std::rc::Rc;

/// A row produced by a scan/filter/join stage, still carrying which table
/// alias each column came from so later stages can resolve qualified names.
#[derive(Debug, Clone)]
struct Tuple {
    schema: Rc<Vec<(String, String)>>,
    values: Vec<Value>,
}

impl Tuple {
    fn get(&self, qualifier: Option<&str>, name: &str) -> Result<&Value> {
        let idx = match qualifier {
            Some(alias) => self.schema.iter().position(|(a, n)| a == alias && n == name),
            None => self.schema.iter().position(|(_, n)| n == name),
        };
        idx.map(|i| &self.values[i])
            .ok_or_else(|| DbError::runtime(format!("column '{}' not found in row", name)))
    }
}

#[derive(Debug)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

enum Rows {
    Tuples(Vec<Tuple>),
    Named { columns: Vec<String>, rows: Vec<Vec<Value>> },
}

pub fn execute_select(plan: &Plan, pool: &mut BufferPool, catalog: &mut Catalog) -> Result<QueryResult> {
    match eval(plan, pool, catalog)? {
        Rows::Named { columns, rows } => Ok(QueryResult { columns, rows }),
        Rows::Tuples(tuples) => {
            let schema = plan_schema(plan, catalog)?;
            let multi_table = schema.iter().map(|(a, _)| a).collect::<std::collections::HashSet<_>>().len() > 1;
            let columns = schema
                .iter()
                .map(|(a, n)| if multi_table { format!("{a}.{n}") } else { n.clone() })
                .collect();
            let rows = tuples.into_iter().map(|t| t.values).collect();
            Ok(QueryResult { columns, rows })
        }
    }
}

fn eval(plan: &Plan, pool: &mut BufferPool, catalog: &mut Catalog) -> Result<Rows> {
    match plan {
        Plan::SeqScan { table, alias, predicate } => {
            let schema = scan_schema(table, alias, catalog)?;
            let page_ids = catalog.page_ids(table).to_vec();
            let mut scan = TableScan::new(table.clone(), page_ids);
            let mut out = Vec::new();
            while let Some((_, _, values)) = scan.advance(pool)? {
                let tuple = Tuple { schema: schema.clone(), values };
                if let Some(pred) = predicate {
                    if !eval_bool(pred, &tuple)? {
                        continue;
                    }
                }
                out.push(tuple);
            }
            Ok(Rows::Tuples(out))
        }
        Plan::Filter { child, predicate } => {
            let rows = eval(child, pool, catalog)?;
            match rows {
                Rows::Tuples(tuples) => {
                    let mut kept = Vec::with_capacity(tuples.len());
                    for t in tuples {
                        if eval_bool(predicate, &t)? {
                            kept.push(t);
                        }
                    }
                    Ok(Rows::Tuples(kept))
                }
                Rows::Named { .. } => Err(DbError::plan("Filter over an already-projected row set")),
            }
        }
        Plan::NestedLoopJoin { left, right, predicate } => {
            let left_tuples = match eval(left, pool, catalog)? {
                Rows::Tuples(t) => t,
                Rows::Named { .. } => return Err(DbError::plan("join input must be raw tuples")),
            };
            let right_tuples = match eval(right, pool, catalog)? {
                Rows::Tuples(t) => t,
                Rows::Named { .. } => return Err(DbError::plan("join input must be raw tuples")),
            };
            let joined_schema: Rc<Vec<(String, String)>> = Rc::new(
                plan_schema(left, catalog)?
                    .iter()
                    .cloned()
                    .chain(plan_schema(right, catalog)?.iter().cloned())
                    .collect(),
            );
            let mut out = Vec::new();
            for l in &left_tuples {
                for r in &right_tuples {
                    let mut values = l.values.clone();
                    values.extend(r.values.clone());
                    let combined = Tuple { schema: joined_schema.clone(), values };
                    if eval_bool(predicate, &combined)? {
                        out.push(combined);
                    }
                }
            }
            Ok(Rows::Tuples(out))
        }
        Plan::Aggregate { child, group_key, items } => {
            let tuples = match eval(child, pool, catalog)? {
                Rows::Tuples(t) => t,
                Rows::Named { .. } => return Err(DbError::plan("aggregate input must be raw tuples")),
            };
            let (columns, rows) = aggregate(&tuples, group_key, items)?;
            Ok(Rows::Named { columns, rows })
        }
        Plan::Sort { child, key, dir } => {
            let rows = eval(child, pool, catalog)?;
            Ok(sort_rows(rows, key, *dir)?)
        }
        Plan::Project { child, items } => {
            let tuples = match eval(child, pool, catalog)? {
                Rows::Tuples(t) => t,
                Rows::Named { .. } => return Err(DbError::plan("project input must be raw tuples")),
            };
            let columns = items.iter().map(|i| output_name(i)).collect();
            let mut rows = Vec::with_capacity(tuples.len());
            for t in &tuples {
                let mut row = Vec::with_capacity(items.len());
                for item in items {
                    row.push(eval_scalar(&item.expr, t)?);
                }
                rows.push(row);
            }
            Ok(Rows::Named { columns, rows })
        }
        Plan::Insert { .. } | Plan::Update { .. } | Plan::Delete { .. } => {
            Err(DbError::plan("DML plan nodes are executed directly, not via eval"))
        }
    }
}

fn output_name(item: &SelectItem) -> String {
    item.alias.clone().unwrap_or_else(|| item.expr.display_name())
}

fn scan_schema(table: &str, alias: &str, catalog: &Catalog) -> Result<Rc<Vec<(String, String)>>> {
    let schema = catalog
        .table(table)
        .ok_or_else(|| DbError::runtime(format!("unknown table '{table}'")))?;
    Ok(Rc::new(schema.columns.iter().map(|c| (alias.to_string(), c.name.clone())).collect()))
}

fn plan_schema(plan: &Plan, catalog: &Catalog) -> Result<Rc<Vec<(String, String)>>> {
    match plan {
        Plan::SeqScan { table, alias, .. } => scan_schema(table, alias, catalog),
        Plan::Filter { child, .. } | Plan::Sort { child, .. } => plan_schema(child, catalog),
        Plan::NestedLoopJoin { left, right, .. } => {
            let mut v = (*plan_schema(left, catalog)?).clone();
            v.extend((*plan_schema(right, catalog)?).clone());
            Ok(Rc::new(v))
        }
        _ => Err(DbError::plan("plan node carries no row schema")),
    }
}

fn sort_rows(rows: Rows, key: &str, dir: crate::plan::SortDir) -> Result<Rows> {
    match rows {
        Rows::Tuples(mut tuples) => {
            let mut err = None;
            tuples.sort_by(|a, b| compare_for_sort(a.get(None, key), b.get(None, key), dir, &mut err));
            if let Some(e) = err {
                return Err(e);
            }
            Ok(Rows::Tuples(tuples))
        }
        Rows::Named { columns, mut rows } => {
            let idx = columns
                .iter()
                .position(|c| c == key)
                .ok_or_else(|| DbError::plan(format!("ORDER BY column '{key}' not in result")))?;
            let mut err = None;
            rows.sort_by(|a, b| compare_for_sort(Ok(&a[idx]), Ok(&b[idx]), dir, &mut err));
            if let Some(e) = err {
                return Err(e);
            }
            Ok(Rows::Named { columns, rows })
        }
    }
}

/// NULLs sort last regardless of direction (§4.10); the comparator is
/// stable because `sort_by` is a stable sort.
fn compare_for_sort(
    a: Result<&Value>,
    b: Result<&Value>,
    dir: crate::plan::SortDir,
    err: &mut Option<DbError>,
) -> Ordering {
    if err.is_some() {
        return Ordering::Equal;
    }
    let (a, b) = match (a, b) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            *err = Some(e);
            return Ordering::Equal;
        }
    };
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.compare(b).unwrap_or_else(|e| {
                *err = Some(e);
                Ordering::Equal
            });
            match dir {
                crate::plan::SortDir::Asc => ord,
                crate::plan::SortDir::Desc => ord.reverse(),
            }
        }
    }
}

fn eval_scalar(expr: &Expr, tuple: &Tuple) -> Result<Value> {
    match expr {
        Expr::Column { qualifier, name } => tuple.get(qualifier.as_deref(), name).cloned(),
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Agg { .. } => Err(DbError::runtime("aggregate expression used outside of aggregation")),
        Expr::BinOp { .. } => Err(DbError::runtime("boolean expression used in a scalar position")),
    }
}

/// Evaluate a predicate; a NULL comparison result is falsy (§4.10).
fn eval_bool(expr: &Expr, tuple: &Tuple) -> Result<bool> {
    match expr {
        Expr::BinOp { op: BinOpKind::And, left, right } => Ok(eval_bool(left, tuple)? && eval_bool(right, tuple)?),
        Expr::BinOp { op, left, right } => {
            let l = eval_scalar(left, tuple)?;
            let r = eval_scalar(right, tuple)?;
            if l.is_null() || r.is_null() {
                return Ok(false);
            }
            let ord = l.compare(&r)?;
            Ok(match op {
                BinOpKind::Eq => ord == Ordering::Equal,
                BinOpKind::Ne => ord != Ordering::Equal,
                BinOpKind::Lt => ord == Ordering::Less,
                BinOpKind::Gt => ord == Ordering::Greater,
                BinOpKind::Le => ord != Ordering::Greater,
                BinOpKind::Ge => ord != Ordering::Less,
                BinOpKind::And => unreachable!(),
            })
        }
        _ => Err(DbError::runtime("expected a boolean condition")),
    }
}

fn aggregate(
    tuples: &[Tuple],
    group_key: &Option<String>,
    items: &[SelectItem],
) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let columns = items.iter().map(output_name).collect();

    // Partition into groups, preserving first-seen order (§4.10).
    let mut groups: Vec<(Option<Value>, Vec<&Tuple>)> = Vec::new();
    match group_key {
        None => groups.push((None, tuples.iter().collect())),
        Some(key) => {
            for t in tuples {
                let v = t.get(None, key)?.clone();
                match groups.iter_mut().find(|(k, _)| k.as_ref().is_some_and(|k| k.key_eq(&v))) {
                    Some((_, rows)) => rows.push(t),
                    None => groups.push((Some(v), vec![t])),
                }
            }
        }
    }
    // `group_key = None` with zero input rows still emits exactly one row.
    if group_key.is_none() && groups.is_empty() {
        groups.push((None, Vec::new()));
    }

    let mut rows = Vec::with_capacity(groups.len());
    for (_, group) in &groups {
        let mut row = Vec::with_capacity(items.len());
        for item in items {
            row.push(aggregate_item(&item.expr, group)?);
        }
        rows.push(row);
    }
    Ok((columns, rows))
}

fn aggregate_item(expr: &Expr, group: &[&Tuple]) -> Result<Value> {
    match expr {
        Expr::Agg { kind: AggKind::CountStar, .. } => Ok(Value::Int(group.len() as i64)),
        Expr::Agg { kind: AggKind::Count, arg: Some(arg) } => {
            let mut n = 0i64;
            for t in group {
                if !eval_scalar(arg, t)?.is_null() {
                    n += 1;
                }
            }
            Ok(Value::Int(n))
        }
        Expr::Agg { kind: AggKind::Sum, arg: Some(arg) } => {
            let mut acc: Option<Value> = None;
            for t in group {
                let v = eval_scalar(arg, t)?;
                if v.is_null() {
                    continue;
                }
                acc = Some(match acc {
                    None => v,
                    Some(a) => a.add(&v)?,
                });
            }
            Ok(acc.unwrap_or(Value::Null))
        }
        Expr::Agg { kind: AggKind::Avg, arg: Some(arg) } => {
            let mut sum = 0.0f64;
            let mut n = 0i64;
            for t in group {
                let v = eval_scalar(arg, t)?;
                if let Some(f) = v.as_f64() {
                    sum += f;
                    n += 1;
                }
            }
            if n == 0 {
                Ok(Value::Null)
            } else {
                Ok(Value::Float(sum / n as f64))
            }
        }
        Expr::Agg { arg: None, .. } => Err(DbError::runtime("aggregate is missing its argument")),
        other => {
            // A bare grouping-column reference: every row in the group
            // shares the same value by construction, so the first suffices.
            let first = group.first().ok_or_else(|| DbError::runtime("empty group has no representative row"))?;
            eval_scalar(other, first)
        }
    }
}

// ---------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------

/// Evaluate each INSERT row's literals into a full row (declared-column
/// order, missing columns default to `NULL`), enforcing primary-key
/// uniqueness, `VARCHAR(n)`, and foreign-key referential integrity before
/// each append. Per §7, one row's failure does not undo earlier rows in
/// the same statement; this stops at the first failing row.
pub fn execute_insert(
    table: &str,
    columns: &Option<Vec<String>>,
    rows: &[Vec<Expr>],
    pool: &mut BufferPool,
    catalog: &mut Catalog,
) -> Result<usize> {
    let schema = catalog
        .table(table)
        .ok_or_else(|| DbError::runtime(format!("unknown table '{table}'")))?
        .clone();
    let target_columns: Vec<String> = match columns {
        Some(cols) => cols.clone(),
        None => schema.columns.iter().map(|c| c.name.clone()).collect(),
    };

    let mut inserted = 0;
    for row_exprs in rows {
        let mut full_row = vec![Value::Null; schema.columns.len()];
        for (col_name, expr) in target_columns.iter().zip(row_exprs.iter()) {
            let idx = schema
                .column_index(col_name)
                .ok_or_else(|| DbError::runtime(format!("unknown column '{col_name}'")))?;
            full_row[idx] = eval_literal(expr)?;
        }

        check_varchar_lengths(&schema.columns, &full_row)?;

        if let Some(pk_idx) = schema.primary_key_index() {
            let mut scan = TableScan::new(table.to_string(), catalog.page_ids(table).to_vec());
            let mut clash = false;
            while let Some((_, _, existing)) = scan.advance(pool)? {
                if existing[pk_idx].key_eq(&full_row[pk_idx]) {
                    clash = true;
                    break;
                }
            }
            scan.close(pool);
            if clash {
                return Err(DbError::constraint(
                    ConstraintKind::PrimaryKey,
                    format!("duplicate primary key {} in table '{table}'", full_row[pk_idx]),
                ));
            }
        }

        for fk in &schema.foreign_keys {
            let local_idx = schema.column_index(&fk.column).expect("foreign key column declared on its own table");
            let value = &full_row[local_idx];
            if value.is_null() {
                continue;
            }
            if !foreign_key_value_exists(catalog, pool, &fk.ref_table, &fk.ref_column, value)? {
                return Err(DbError::constraint(
                    ConstraintKind::ForeignKey,
                    format!("no row in '{}' with {} = {}", fk.ref_table, fk.ref_column, value),
                ));
            }
        }

        file_manager::append(pool, catalog, table, &full_row)?;
        inserted += 1;
    }
    Ok(inserted)
}

fn foreign_key_value_exists(
    catalog: &Catalog,
    pool: &mut BufferPool,
    ref_table: &str,
    ref_column: &str,
    value: &Value,
) -> Result<bool> {
    let ref_schema = catalog
        .table(ref_table)
        .ok_or_else(|| DbError::runtime(format!("unknown table '{ref_table}'")))?;
    let col_idx = ref_schema
        .column_index(ref_column)
        .ok_or_else(|| DbError::runtime(format!("unknown column '{ref_column}'")))?;
    let mut scan = TableScan::new(ref_table.to_string(), catalog.page_ids(ref_table).to_vec());
    let mut found = false;
    while let Some((_, _, row)) = scan.advance(pool)? {
        if row[col_idx].key_eq(value) {
            found = true;
            break;
        }
    }
    scan.close(pool);
    Ok(found)
}

fn check_varchar_lengths(columns: &[crate::catalog::ColumnSchema], row: &[Value]) -> Result<()> {
    for (col, value) in columns.iter().zip(row.iter()) {
        if let (ColumnType::Varchar(Some(cap)), Value::Varchar(s)) = (col.col_type, value) {
            if s.chars().count() > cap as usize {
                return Err(DbError::constraint(
                    ConstraintKind::VarcharLength,
                    format!("'{}' exceeds VARCHAR({}) in column '{}'", s, cap, col.name),
                ));
            }
        }
    }
    Ok(())
}

fn eval_literal(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        _ => Err(DbError::runtime("expected a literal value")),
    }
}

pub fn execute_update(
    table: &str,
    assignments: &[crate::ast::Assignment],
    predicate: &Option<Expr>,
    pool: &mut BufferPool,
    catalog: &mut Catalog,
) -> Result<usize> {
    let schema = catalog
        .table(table)
        .ok_or_else(|| DbError::runtime(format!("unknown table '{table}'")))?
        .clone();
    let table_schema = scan_schema(table, table, catalog)?;

    let mut targets = Vec::new();
    {
        let mut scan = TableScan::new(table.to_string(), catalog.page_ids(table).to_vec());
        while let Some((page_id, slot, values)) = scan.advance(pool)? {
            let matches = match predicate {
                None => true,
                Some(p) => eval_bool(p, &Tuple { schema: table_schema.clone(), values: values.clone() })?,
            };
            if matches {
                targets.push((page_id, slot, values));
            }
        }
        scan.close(pool);
    }

    let mut updated = 0;
    for (page_id, slot, mut row) in targets {
        for assign in assignments {
            let idx = schema
                .column_index(&assign.column)
                .ok_or_else(|| DbError::runtime(format!("unknown column '{}'", assign.column)))?;
            row[idx] = eval_literal(&assign.value)?;
        }
        check_varchar_lengths(&schema.columns, &row)?;
        file_manager::update_in_place(pool, catalog, table, page_id, slot, &row)?;
        updated += 1;
    }
    Ok(updated)
}

pub fn execute_delete(
    table: &str,
    predicate: &Option<Expr>,
    pool: &mut BufferPool,
    catalog: &mut Catalog,
) -> Result<usize> {
    let table_schema = scan_schema(table, table, catalog)?;
    let mut targets = Vec::new();
    {
        let mut scan = TableScan::new(table.to_string(), catalog.page_ids(table).to_vec());
        while let Some((page_id, slot, values)) = scan.advance(pool)? {
            let matches = match predicate {
                None => true,
                Some(p) => eval_bool(p, &Tuple { schema: table_schema.clone(), values })?,
            };
            if matches {
                targets.push((page_id, slot));
            }
        }
        scan.close(pool);
    }

    let mut deleted = 0;
    for (page_id, slot) in targets {
        file_manager::delete(pool, table, page_id, slot)?;
        deleted += 1;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_pool::ReplacementPolicy;
    use crate::catalog::{Catalog, ColumnSchema, TableSchema};
    use crate::pager::PageManager;
    use crate::parser::parse_statements;
    use crate::plan::build_plan;

    fn env() -> (Catalog, BufferPool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(dir.path().join("catalog.json")).unwrap();
        let pool = BufferPool::new(PageManager::new(dir.path()).unwrap(), 16, ReplacementPolicy::Lru);
        (catalog, pool, dir)
    }

    fn students_schema() -> TableSchema {
        TableSchema {
            name: "students".into(),
            columns: vec![
                ColumnSchema { name: "id".into(), col_type: ColumnType::Int, is_primary_key: true },
                ColumnSchema { name: "name".into(), col_type: ColumnType::Varchar(Some(8)), is_primary_key: false },
                ColumnSchema { name: "age".into(), col_type: ColumnType::Int, is_primary_key: false },
            ],
            foreign_keys: vec![],
        }
    }

    fn run_insert(src: &str, pool: &mut BufferPool, catalog: &mut Catalog) -> Result<usize> {
        match parse_statements(src).remove(0).unwrap() {
            crate::ast::Stmt::Insert(i) => execute_insert(&i.table, &i.columns, &i.rows, pool, catalog),
            _ => panic!("expected INSERT"),
        }
    }

    fn run_select(src: &str, pool: &mut BufferPool, catalog: &mut Catalog) -> QueryResult {
        let stmt = parse_statements(src).remove(0).unwrap();
        let plan = build_plan(&stmt, true).unwrap();
        execute_select(&plan, pool, catalog).unwrap()
    }

    #[test]
    fn s1_primary_key_violation_leaves_first_row() {
        let (mut catalog, mut pool, _dir) = env();
        catalog.create_table(students_schema()).unwrap();
        run_insert("INSERT INTO students VALUES (1,'Al',20);", &mut pool, &mut catalog).unwrap();
        let err = run_insert("INSERT INTO students VALUES (1,'Bo',21);", &mut pool, &mut catalog);
        assert!(err.is_err());
        let result = run_select("SELECT * FROM students;", &mut pool, &mut catalog);
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn s2_varchar_overflow_leaves_table_empty() {
        let (mut catalog, mut pool, _dir) = env();
        catalog.create_table(students_schema()).unwrap();
        let err = run_insert("INSERT INTO students VALUES (1,'Engineering',20);", &mut pool, &mut catalog);
        assert!(err.is_err());
        let result = run_select("SELECT * FROM students;", &mut pool, &mut catalog);
        assert_eq!(result.rows.len(), 0);
    }

    #[test]
    fn s3_filter_on_age() {
        let (mut catalog, mut pool, _dir) = env();
        catalog.create_table(students_schema()).unwrap();
        run_insert("INSERT INTO students VALUES (1,'Alice',20);", &mut pool, &mut catalog).unwrap();
        run_insert("INSERT INTO students VALUES (2,'Bob',22);", &mut pool, &mut catalog).unwrap();
        run_insert("INSERT INTO students VALUES (3,'Cindy',20);", &mut pool, &mut catalog).unwrap();
        let result = run_select("SELECT name, age FROM students WHERE age > 20;", &mut pool, &mut catalog);
        assert_eq!(result.rows, vec![vec![Value::Varchar("Bob".into()), Value::Int(22)]]);
    }

    #[test]
    fn s5_group_by_with_order_by_desc() {
        let (mut catalog, mut pool, _dir) = env();
        catalog.create_table(students_schema()).unwrap();
        run_insert("INSERT INTO students VALUES (1,'Alice',20);", &mut pool, &mut catalog).unwrap();
        run_insert("INSERT INTO students VALUES (2,'Bob',22);", &mut pool, &mut catalog).unwrap();
        run_insert("INSERT INTO students VALUES (3,'Cindy',20);", &mut pool, &mut catalog).unwrap();
        let result = run_select(
            "SELECT age, COUNT(*) FROM students GROUP BY age ORDER BY age DESC;",
            &mut pool,
            &mut catalog,
        );
        assert_eq!(result.rows, vec![vec![Value::Int(22), Value::Int(1)], vec![Value::Int(20), Value::Int(2)]]);
    }

    #[test]
    fn s4_inner_join() {
        let (mut catalog, mut pool, _dir) = env();
        catalog.create_table(students_schema()).unwrap();
        catalog
            .create_table(TableSchema {
                name: "courses".into(),
                columns: vec![
                    ColumnSchema { name: "cid".into(), col_type: ColumnType::Int, is_primary_key: true },
                    ColumnSchema { name: "cname".into(), col_type: ColumnType::Varchar(None), is_primary_key: false },
                ],
                foreign_keys: vec![],
            })
            .unwrap();
        run_insert("INSERT INTO students VALUES (1,'Alice',20);", &mut pool, &mut catalog).unwrap();
        run_insert("INSERT INTO students VALUES (2,'Bob',22);", &mut pool, &mut catalog).unwrap();
        run_insert("INSERT INTO courses VALUES (1,'CS');", &mut pool, &mut catalog).unwrap();
        run_insert("INSERT INTO courses VALUES (2,'OS');", &mut pool, &mut catalog).unwrap();
        let result = run_select(
            "SELECT s.name, c.cname FROM students s JOIN courses c ON s.id = c.cid;",
            &mut pool,
            &mut catalog,
        );
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Varchar("Alice".into()), Value::Varchar("CS".into())],
                vec![Value::Varchar("Bob".into()), Value::Varchar("OS".into())],
            ]
        );
    }

    #[test]
    fn foreign_key_violation_is_rejected() {
        let (mut catalog, mut pool, _dir) = env();
        catalog.create_table(students_schema()).unwrap();
        catalog
            .create_table(TableSchema {
                name: "enrollments".into(),
                columns: vec![ColumnSchema {
                    name: "student_id".into(),
                    col_type: ColumnType::Int,
                    is_primary_key: false,
                }],
                foreign_keys: vec![crate::catalog::ForeignKey {
                    column: "student_id".into(),
                    ref_table: "students".into(),
                    ref_column: "id".into(),
                }],
            })
            .unwrap();
        let err = run_insert("INSERT INTO enrollments VALUES (99);", &mut pool, &mut catalog);
        assert!(err.is_err());
    }
}
