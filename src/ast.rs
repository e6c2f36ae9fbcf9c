//! Parsed statement and expression tree (C7 output, C8 input).
//!
//! Statements and expressions are modeled as tagged variants with
//! exhaustive matching at every consumer, per the design note in §9:
//! this replaces an inheritance hierarchy of node types with a closed
//! set the compiler checks for us.

use crate::value::{ColumnType, Value};

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColumnType,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone)]
pub struct ForeignKeyDef {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

#[derive(Debug, Clone)]
pub struct CreateTableStmt {
    pub table: String,
    pub columns: Vec<ColumnDef>,
    /// Table-level `PRIMARY KEY(col)`, if present (in addition to any
    /// column-level one; the semantic analyzer rejects having both).
    pub table_primary_key: Option<String>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

#[derive(Debug, Clone)]
pub struct InsertStmt {
    pub table: String,
    /// `None` means "all declared columns, in schema order".
    pub columns: Option<Vec<String>>,
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone)]
pub struct TableRef {
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone)]
pub struct JoinClause {
    pub table: TableRef,
    pub on: Expr,
}

#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SelectStmt {
    pub items: Vec<SelectItem>,
    pub is_star: bool,
    pub from: TableRef,
    pub join: Option<JoinClause>,
    pub filter: Option<Expr>,
    pub group_by: Option<String>,
    pub order_by: Option<(String, SortDir)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct UpdateStmt {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub table: String,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    CreateTable(CreateTableStmt),
    Insert(InsertStmt),
    Select(SelectStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Count,
    CountStar,
    Sum,
    Avg,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Column { qualifier: Option<String>, name: String },
    Literal(Value),
    BinOp { op: BinOpKind, left: Box<Expr>, right: Box<Expr> },
    Agg { kind: AggKind, arg: Option<Box<Expr>> },
}

impl Expr {
    /// Best-effort rendering used as the default output column name when
    /// there is no `AS` alias (spec: "expression text").
    pub fn display_name(&self) -> String {
        match self {
            Expr::Column { qualifier, name } => match qualifier {
                Some(q) => format!("{q}.{name}"),
                None => name.clone(),
            },
            Expr::Literal(v) => v.to_string(),
            Expr::BinOp { op, left, right } => {
                let sym = match op {
                    BinOpKind::Eq => "=",
                    BinOpKind::Ne => "!=",
                    BinOpKind::Lt => "<",
                    BinOpKind::Gt => ">",
                    BinOpKind::Le => "<=",
                    BinOpKind::Ge => ">=",
                    BinOpKind::And => "AND",
                };
                format!("{} {} {}", left.display_name(), sym, right.display_name())
            }
            Expr::Agg { kind, arg } => match (kind, arg) {
                (AggKind::CountStar, _) => "COUNT(*)".to_string(),
                (AggKind::Count, Some(a)) => format!("COUNT({})", a.display_name()),
                (AggKind::Sum, Some(a)) => format!("SUM({})", a.display_name()),
                (AggKind::Avg, Some(a)) => format!("AVG({})", a.display_name()),
                _ => "AGG".to_string(),
            },
        }
    }

    /// Split a predicate into its top-level AND-conjuncts (used by both the
    /// semantic analyzer's "compatible operands" walk and the planner's
    /// push-down rewrite).
    pub fn split_conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::BinOp { op: BinOpKind::And, left, right } => {
                let mut v = left.split_conjuncts();
                v.extend(right.split_conjuncts());
                v
            }
            other => vec![other],
        }
    }

    /// Collect every table-alias qualifier referenced by this expression.
    /// Bare (unqualified) column references are tagged with `unqualified`.
    pub fn referenced_aliases(&self, unqualified: &str, out: &mut Vec<String>) {
        match self {
            Expr::Column { qualifier, .. } => {
                let a = qualifier.clone().unwrap_or_else(|| unqualified.to_string());
                if !out.contains(&a) {
                    out.push(a);
                }
            }
            Expr::BinOp { left, right, .. } => {
                left.referenced_aliases(unqualified, out);
                right.referenced_aliases(unqualified, out);
            }
            Expr::Agg { arg: Some(a), .. } => a.referenced_aliases(unqualified, out),
            Expr::Agg { arg: None, .. } | Expr::Literal(_) => {}
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Agg { .. })
    }
}
