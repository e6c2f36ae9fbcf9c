//! Planner + Optimizer (C9): AST to logical plan tree, plus predicate
//! push-down.
//!
//! Plan nodes are owned trees (`Box<Plan>`), a closed-variant style
//! rather than a trait-object hierarchy: the executor can exhaustively
//! match every shape the planner can build.

use crate::ast::*;
use crate::error::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl From<crate::ast::SortDir> for SortDir {
    fn from(d: crate::ast::SortDir) -> Self {
        match d {
            crate::ast::SortDir::Asc => SortDir::Asc,
            crate::ast::SortDir::Desc => SortDir::Desc,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Plan {
    SeqScan { table: String, alias: String, predicate: Option<Expr> },
    Filter { child: Box<Plan>, predicate: Expr },
    NestedLoopJoin { left: Box<Plan>, right: Box<Plan>, predicate: Expr },
    Project { child: Box<Plan>, items: Vec<SelectItem> },
    Aggregate { child: Box<Plan>, group_key: Option<String>, items: Vec<SelectItem> },
    Sort { child: Box<Plan>, key: String, dir: SortDir },
    Insert { table: String, columns: Option<Vec<String>>, rows: Vec<Vec<Expr>> },
    Update { table: String, assignments: Vec<Assignment>, predicate: Option<Expr> },
    Delete { table: String, predicate: Option<Expr> },
}

/// Build the logical plan for one statement. `pushdown` toggles predicate
/// push-down (property 4 requires both settings to produce the same result
/// set); when `false` the optimizer rewrite in `push_down` is simply
/// skipped.
pub fn build_plan(stmt: &Stmt, pushdown: bool) -> Result<Plan> {
    match stmt {
        Stmt::CreateTable(_) => {
            Err(DbError::plan("CREATE TABLE is executed directly, not planned"))
        }
        Stmt::Insert(i) => Ok(Plan::Insert {
            table: i.table.clone(),
            columns: i.columns.clone(),
            rows: i.rows.clone(),
        }),
        Stmt::Update(u) => Ok(Plan::Update {
            table: u.table.clone(),
            assignments: u.assignments.clone(),
            predicate: u.filter.clone(),
        }),
        Stmt::Delete(d) => Ok(Plan::Delete { table: d.table.clone(), predicate: d.filter.clone() }),
        Stmt::Select(s) => build_select_plan(s, pushdown),
    }
}

fn build_select_plan(s: &SelectStmt, pushdown: bool) -> Result<Plan> {
    let left = Plan::SeqScan { table: s.from.name.clone(), alias: s.from.alias.clone(), predicate: None };

    let mut plan = match &s.join {
        None => left,
        Some(join) => {
            let right =
                Plan::SeqScan { table: join.table.name.clone(), alias: join.table.alias.clone(), predicate: None };
            Plan::NestedLoopJoin {
                left: Box::new(left),
                right: Box::new(right),
                predicate: join.on.clone(),
            }
        }
    };

    if let Some(filter) = &s.filter {
        plan = if pushdown { push_down(plan, filter, &s.from.alias) } else {
            Plan::Filter { child: Box::new(plan), predicate: filter.clone() }
        };
    }

    let has_aggregate = s.items.iter().any(|item| item.expr.is_aggregate());
    if has_aggregate || s.group_by.is_some() {
        plan = Plan::Aggregate {
            child: Box::new(plan),
            group_key: s.group_by.clone(),
            items: s.items.clone(),
        };
    }

    if let Some((key, dir)) = &s.order_by {
        plan = Plan::Sort { child: Box::new(plan), key: key.clone(), dir: (*dir).into() };
    }

    // An aggregate's output columns are already named by `items`; a plain
    // (non-aggregate, non-`*`) select still needs an explicit projection.
    if !s.is_star && !has_aggregate {
        plan = Plan::Project { child: Box::new(plan), items: s.items.clone() };
    }

    Ok(plan)
}

/// Split `filter` on top-level AND, absorb single-table conjuncts into the
/// matching `SeqScan`, and keep the rest as a residual `Filter` above the
/// join. Conjunct order is preserved in both the pushed and residual sets
/// (§4.4 "tie-break"), so the result is a pure, deterministic `Plan -> Plan`
/// rewrite.
fn push_down(plan: Plan, filter: &Expr, unqualified_alias: &str) -> Plan {
    let conjuncts = filter.split_conjuncts();
    let mut residual: Vec<Expr> = Vec::new();
    let mut plan = plan;

    for conjunct in conjuncts {
        let mut aliases = Vec::new();
        conjunct.referenced_aliases(unqualified_alias, &mut aliases);
        if aliases.len() == 1 {
            if try_absorb(&mut plan, &aliases[0], conjunct) {
                continue;
            }
        }
        residual.push(conjunct.clone());
    }

    if let Some(combined) = conjoin(residual) {
        plan = Plan::Filter { child: Box::new(plan), predicate: combined };
    }
    plan
}

/// Attempt to absorb `conjunct` into the `SeqScan` with the given alias,
/// wherever it sits in the tree (either side of a join, or the bare scan).
fn try_absorb(plan: &mut Plan, alias: &str, conjunct: &Expr) -> bool {
    match plan {
        Plan::SeqScan { alias: scan_alias, predicate, .. } if scan_alias == alias => {
            *predicate = Some(match predicate.take() {
                Some(existing) => Expr::BinOp {
                    op: BinOpKind::And,
                    left: Box::new(existing),
                    right: Box::new(conjunct.clone()),
                },
                None => conjunct.clone(),
            });
            true
        }
        Plan::NestedLoopJoin { left, right, .. } => {
            try_absorb(left, alias, conjunct) || try_absorb(right, alias, conjunct)
        }
        _ => false,
    }
}

fn conjoin(mut exprs: Vec<Expr>) -> Option<Expr> {
    if exprs.is_empty() {
        return None;
    }
    let mut acc = exprs.remove(0);
    for e in exprs {
        acc = Expr::BinOp { op: BinOpKind::And, left: Box::new(acc), right: Box::new(e) };
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statements;

    fn select(src: &str) -> SelectStmt {
        match parse_statements(src).remove(0).unwrap() {
            Stmt::Select(s) => s,
            _ => panic!("expected SELECT"),
        }
    }

    #[test]
    fn single_table_predicate_is_pushed_into_scan() {
        let s = select("SELECT * FROM students WHERE age > 20;");
        let plan = build_select_plan(&s, true).unwrap();
        match plan {
            Plan::SeqScan { predicate: Some(_), .. } => {}
            other => panic!("expected predicate pushed into scan, got {:?}", other),
        }
    }

    #[test]
    fn join_predicate_conjunct_is_pushed_to_matching_side() {
        let s = select(
            "SELECT s.name, c.cname FROM students s JOIN courses c ON s.id = c.cid WHERE s.age > 20 AND c.cname = 'CS';",
        );
        let plan = build_select_plan(&s, true).unwrap();
        match plan {
            Plan::NestedLoopJoin { left, right, .. } => {
                assert!(matches!(*left, Plan::SeqScan { predicate: Some(_), .. }));
                assert!(matches!(*right, Plan::SeqScan { predicate: Some(_), .. }));
            }
            other => panic!("expected a join at the top, got {:?}", other),
        }
    }

    #[test]
    fn disabling_pushdown_keeps_a_residual_filter() {
        let s = select("SELECT * FROM students WHERE age > 20;");
        let plan = build_select_plan(&s, false).unwrap();
        assert!(matches!(plan, Plan::Filter { .. }));
    }

    #[test]
    fn group_by_produces_aggregate_node() {
        let s = select("SELECT age, COUNT(*) FROM students GROUP BY age;");
        let plan = build_select_plan(&s, true).unwrap();
        assert!(matches!(plan, Plan::Aggregate { .. }));
    }
}
