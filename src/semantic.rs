//! Semantic Analyzer (C8): validates an AST against the catalog before it
//! ever reaches the planner.
//!
//! Checks accumulate into a single `DbError::Semantic` with every problem
//! found in the statement, rather than stopping at the first one, per
//! §4.3's "continues to collect multiple errors per statement when cheaply
//! possible."

use crate::ast::*;
use crate::catalog::{Catalog, TableSchema};
use crate::error::{DbError, Result};
use crate::value::{ColumnType, Value};

pub fn analyze(catalog: &Catalog, stmt: &Stmt) -> Result<()> {
    let mut problems = Vec::new();
    match stmt {
        Stmt::CreateTable(c) => check_create_table(catalog, c, &mut problems),
        Stmt::Insert(i) => check_insert(catalog, i, &mut problems),
        Stmt::Select(s) => check_select(catalog, s, &mut problems),
        Stmt::Update(u) => check_update(catalog, u, &mut problems),
        Stmt::Delete(d) => check_delete(catalog, d, &mut problems),
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(DbError::semantic(problems.join("; ")))
    }
}

fn check_create_table(catalog: &Catalog, c: &CreateTableStmt, problems: &mut Vec<String>) {
    if catalog.table_exists(&c.table) {
        problems.push(format!("table '{}' already exists", c.table));
    }

    let mut seen = std::collections::HashSet::new();
    for col in &c.columns {
        if !seen.insert(col.name.as_str()) {
            problems.push(format!("column '{}' declared more than once", col.name));
        }
    }

    let column_level_pks = c.columns.iter().filter(|col| col.is_primary_key).count();
    if column_level_pks > 1 {
        problems.push("at most one column may be declared PRIMARY KEY".to_string());
    }
    if column_level_pks > 0 && c.table_primary_key.is_some() {
        problems.push("cannot declare both a column-level and a table-level PRIMARY KEY".to_string());
    }
    if let Some(pk) = &c.table_primary_key {
        if !c.columns.iter().any(|col| &col.name == pk) {
            problems.push(format!("PRIMARY KEY references undeclared column '{}'", pk));
        }
    }

    for fk in &c.foreign_keys {
        if !c.columns.iter().any(|col| col.name == fk.column) {
            problems.push(format!("FOREIGN KEY references undeclared local column '{}'", fk.column));
        }
        match catalog.table(&fk.ref_table) {
            None => problems.push(format!("FOREIGN KEY references unknown table '{}'", fk.ref_table)),
            Some(target) => {
                if target.column_index(&fk.ref_column).is_none() {
                    problems.push(format!(
                        "FOREIGN KEY references unknown column '{}.{}'",
                        fk.ref_table, fk.ref_column
                    ));
                }
            }
        }
    }
}

/// One table visible by name/alias in a FROM/JOIN clause.
struct Scope<'a> {
    tables: Vec<(&'a str, &'a TableSchema)>,
}

impl<'a> Scope<'a> {
    fn column_type(&self, qualifier: Option<&str>, name: &str, problems: &mut Vec<String>) -> Option<ColumnType> {
        match qualifier {
            Some(alias) => match self.tables.iter().find(|(a, _)| *a == alias) {
                None => {
                    problems.push(format!("'{}' is not a declared table alias", alias));
                    None
                }
                Some((_, schema)) => match schema.column_index(name) {
                    Some(idx) => Some(schema.columns[idx].col_type),
                    None => {
                        problems.push(format!("column '{}.{}' does not exist", alias, name));
                        None
                    }
                },
            },
            None => {
                let matches: Vec<_> =
                    self.tables.iter().filter(|(_, schema)| schema.column_index(name).is_some()).collect();
                match matches.len() {
                    0 => {
                        problems.push(format!("column '{}' does not exist", name));
                        None
                    }
                    1 => {
                        let (_, schema) = matches[0];
                        let idx = schema.column_index(name).unwrap();
                        Some(schema.columns[idx].col_type)
                    }
                    _ => {
                        problems.push(format!("column '{}' is ambiguous", name));
                        None
                    }
                }
            }
        }
    }

    /// Best-effort static type of an expression; `None` for NULL literals
    /// and anything whose type couldn't be resolved (already reported).
    fn expr_type(&self, expr: &Expr, problems: &mut Vec<String>) -> Option<ColumnType> {
        match expr {
            Expr::Column { qualifier, name } => self.column_type(qualifier.as_deref(), name, problems),
            Expr::Literal(Value::Int(_)) => Some(ColumnType::Int),
            Expr::Literal(Value::Float(_)) => Some(ColumnType::Float),
            Expr::Literal(Value::Varchar(_)) => Some(ColumnType::Varchar(None)),
            Expr::Literal(Value::Null) => None,
            Expr::Agg { kind, arg } => {
                if let Some(arg) = arg {
                    self.expr_type(arg, problems);
                }
                Some(if *kind == AggKind::Avg { ColumnType::Float } else { ColumnType::Int })
            }
            Expr::BinOp { .. } => None,
        }
    }

    fn check_no_aggregate(&self, expr: &Expr, context: &str, problems: &mut Vec<String>) {
        match expr {
            Expr::Agg { .. } => problems.push(format!("aggregates are not allowed in {}", context)),
            Expr::BinOp { left, right, .. } => {
                self.check_no_aggregate(left, context, problems);
                self.check_no_aggregate(right, context, problems);
            }
            Expr::Column { .. } | Expr::Literal(_) => {}
        }
    }

    /// Validate every column reference and operand-type compatibility
    /// across a predicate's comparisons.
    fn check_predicate(&self, expr: &Expr, problems: &mut Vec<String>) {
        match expr {
            Expr::BinOp { op: BinOpKind::And, left, right } => {
                self.check_predicate(left, problems);
                self.check_predicate(right, problems);
            }
            Expr::BinOp { left, right, .. } => {
                let lt = self.expr_type(left, problems);
                let rt = self.expr_type(right, problems);
                if let (Some(lt), Some(rt)) = (lt, rt) {
                    if !types_comparable(lt, rt) {
                        problems.push(format!("cannot compare {} and {}", lt, rt));
                    }
                }
            }
            _ => {
                self.expr_type(expr, problems);
            }
        }
    }
}

fn types_comparable(a: ColumnType, b: ColumnType) -> bool {
    match (a, b) {
        (ColumnType::Varchar(_), ColumnType::Varchar(_)) => true,
        (ColumnType::Varchar(_), _) | (_, ColumnType::Varchar(_)) => false,
        _ => true, // INT/FLOAT combine freely
    }
}

fn check_select(catalog: &Catalog, s: &SelectStmt, problems: &mut Vec<String>) {
    let from_schema = match catalog.table(&s.from.name) {
        Some(t) => Some(t),
        None => {
            problems.push(format!("table '{}' does not exist", s.from.name));
            None
        }
    };
    let join_schema = match &s.join {
        Some(j) => match catalog.table(&j.table.name) {
            Some(t) => Some(t),
            None => {
                problems.push(format!("table '{}' does not exist", j.table.name));
                None
            }
        },
        None => None,
    };

    let mut tables = Vec::new();
    if let Some(schema) = from_schema {
        tables.push((s.from.alias.as_str(), schema));
    }
    if let (Some(j), Some(schema)) = (&s.join, join_schema) {
        tables.push((j.table.alias.as_str(), schema));
    }
    let scope = Scope { tables };

    if let Some(join) = &s.join {
        scope.check_predicate(&join.on, problems);
    }
    if let Some(filter) = &s.filter {
        scope.check_predicate(filter, problems);
    }

    for item in &s.items {
        scope.expr_type(&item.expr, problems);
    }
    if let Some(join) = &s.join {
        scope.check_no_aggregate(&join.on, "JOIN conditions", problems);
    }
    if let Some(filter) = &s.filter {
        scope.check_no_aggregate(filter, "WHERE clauses", problems);
    }

    let has_aggregate = s.items.iter().any(|item| item.expr.is_aggregate());

    if let Some(group_col) = &s.group_by {
        if !has_aggregate {
            // GROUP BY with no aggregate is legal (distinct-like grouping);
            // still enforce the functional-dependency rule below.
        }
        for item in &s.items {
            if item.expr.is_aggregate() {
                continue;
            }
            let matches_group_col = matches!(
                &item.expr,
                Expr::Column { name, .. } if name == group_col
            );
            if !matches_group_col {
                problems.push(format!(
                    "'{}' must appear in GROUP BY or be aggregated",
                    item.expr.display_name()
                ));
            }
        }
    } else if has_aggregate {
        for item in &s.items {
            if !item.expr.is_aggregate() {
                problems.push(format!(
                    "'{}' must be aggregated when the query has no GROUP BY",
                    item.expr.display_name()
                ));
            }
        }
    }
}

fn check_update(catalog: &Catalog, u: &UpdateStmt, problems: &mut Vec<String>) {
    let schema = match catalog.table(&u.table) {
        Some(t) => t,
        None => {
            problems.push(format!("table '{}' does not exist", u.table));
            return;
        }
    };
    let scope = Scope { tables: vec![(u.table.as_str(), schema)] };

    for assign in &u.assignments {
        match schema.column_index(&assign.column) {
            None => problems.push(format!("column '{}' does not exist", assign.column)),
            Some(idx) => {
                if let Some(value_type) = literal_value_type(&assign.value) {
                    check_assignable(value_type, schema.columns[idx].col_type, &assign.column, problems);
                }
            }
        }
    }

    if let Some(filter) = &u.filter {
        scope.check_predicate(filter, problems);
        scope.check_no_aggregate(filter, "WHERE clauses", problems);
    }
}

fn check_delete(catalog: &Catalog, d: &DeleteStmt, problems: &mut Vec<String>) {
    let schema = match catalog.table(&d.table) {
        Some(t) => t,
        None => {
            problems.push(format!("table '{}' does not exist", d.table));
            return;
        }
    };
    let scope = Scope { tables: vec![(d.table.as_str(), schema)] };
    if let Some(filter) = &d.filter {
        scope.check_predicate(filter, problems);
        scope.check_no_aggregate(filter, "WHERE clauses", problems);
    }
}

fn literal_value_type(expr: &Expr) -> Option<ColumnType> {
    match expr {
        Expr::Literal(Value::Int(_)) => Some(ColumnType::Int),
        Expr::Literal(Value::Float(_)) => Some(ColumnType::Float),
        Expr::Literal(Value::Varchar(s)) => Some(ColumnType::Varchar(Some(s.len() as u32))),
        Expr::Literal(Value::Null) => None,
        _ => None,
    }
}

/// Is a literal of `value_type` assignable to a column declared `col_type`?
/// INT literals widen into FLOAT columns; VARCHAR length is checked against
/// the column's cap (actual enforcement of the value happens at execution
/// time too, since this only sees the parsed literal's length here).
fn check_assignable(value_type: ColumnType, col_type: ColumnType, column: &str, problems: &mut Vec<String>) {
    match (value_type, col_type) {
        (ColumnType::Int, ColumnType::Int) => {}
        (ColumnType::Int, ColumnType::Float) => {}
        (ColumnType::Float, ColumnType::Float) => {}
        (ColumnType::Varchar(len), ColumnType::Varchar(cap)) => {
            if let (Some(len), Some(cap)) = (len, cap) {
                if len > cap {
                    problems.push(format!(
                        "value for '{}' exceeds VARCHAR({}) (length {})",
                        column, cap, len
                    ));
                }
            }
        }
        (vt, ct) => problems.push(format!("cannot assign {} value to {} column '{}'", vt, ct, column)),
    }
}

fn check_insert(catalog: &Catalog, i: &InsertStmt, problems: &mut Vec<String>) {
    let schema = match catalog.table(&i.table) {
        Some(t) => t,
        None => {
            problems.push(format!("table '{}' does not exist", i.table));
            return;
        }
    };

    let target_columns: Vec<&str> = match &i.columns {
        Some(cols) => cols.iter().map(|s| s.as_str()).collect(),
        None => schema.columns.iter().map(|c| c.name.as_str()).collect(),
    };

    for name in &target_columns {
        if schema.column_index(name).is_none() {
            problems.push(format!("column '{}' does not exist", name));
        }
    }

    for row in &i.rows {
        if row.len() != target_columns.len() {
            problems.push(format!(
                "expected {} values but found {}",
                target_columns.len(),
                row.len()
            ));
            continue;
        }
        for (value_expr, col_name) in row.iter().zip(target_columns.iter()) {
            let Some(idx) = schema.column_index(col_name) else { continue };
            let col_type = schema.columns[idx].col_type;
            match literal_value_type(value_expr) {
                None => {} // NULL: always assignable
                Some(vt) => check_assignable(vt, col_type, col_name, problems),
            }
        }
    }

    for fk in &schema.foreign_keys {
        if catalog.table(&fk.ref_table).is_none() {
            problems.push(format!("foreign key target table '{}' no longer exists", fk.ref_table));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ColumnSchema, TableSchema};
    use crate::parser::parse_statements;

    fn catalog_with_students() -> Catalog {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = Catalog::open(dir.path().join("catalog.json")).unwrap();
        cat.create_table(TableSchema {
            name: "students".into(),
            columns: vec![
                ColumnSchema { name: "id".into(), col_type: ColumnType::Int, is_primary_key: true },
                ColumnSchema { name: "name".into(), col_type: ColumnType::Varchar(Some(8)), is_primary_key: false },
                ColumnSchema { name: "age".into(), col_type: ColumnType::Int, is_primary_key: false },
            ],
            foreign_keys: vec![],
        })
        .unwrap();
        cat
    }

    fn one_stmt(src: &str) -> Stmt {
        parse_statements(src).remove(0).unwrap()
    }

    #[test]
    fn rejects_unknown_table() {
        let cat = catalog_with_students();
        let stmt = one_stmt("SELECT * FROM nope;");
        assert!(analyze(&cat, &stmt).is_err());
    }

    #[test]
    fn rejects_varchar_overflow_literal() {
        let cat = catalog_with_students();
        let stmt = one_stmt("INSERT INTO students VALUES (1, 'Engineering', 20);");
        let err = analyze(&cat, &stmt).unwrap_err();
        assert!(err.to_string().contains("VARCHAR"));
    }

    #[test]
    fn accepts_valid_select_with_where() {
        let cat = catalog_with_students();
        let stmt = one_stmt("SELECT name, age FROM students WHERE age > 20;");
        assert!(analyze(&cat, &stmt).is_ok());
    }

    #[test]
    fn rejects_ambiguous_group_by_projection() {
        let cat = catalog_with_students();
        let stmt = one_stmt("SELECT name, COUNT(*) FROM students GROUP BY age;");
        assert!(analyze(&cat, &stmt).is_err());
    }

    #[test]
    fn rejects_type_mismatch_comparison() {
        let cat = catalog_with_students();
        let stmt = one_stmt("SELECT * FROM students WHERE name > 20;");
        assert!(analyze(&cat, &stmt).is_err());
    }
}
