//! Parser (C7): recursive-descent over an LL(1) grammar, with the
//! structured diagnostic recovery required by §4.2.
//!
//! Naming convention: methods beginning `stmt_` parse a statement,
//! `expr_` parse an expression.

use crate::ast::*;
use crate::error::{DbError, Result, SourceLocation};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::value::{ColumnType, Value};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parse every statement in `src`. Each entry in the returned vector is
/// either the parsed statement or the diagnostic produced while recovering
/// from a malformed one; parsing always continues to the next `;`, so one
/// bad statement never prevents later ones in the same batch from running.
pub fn parse_statements(src: &str) -> Vec<Result<Stmt>> {
    let tokens = match tokenize(src) {
        Ok(t) => t,
        Err(e) => return vec![Err(e)],
    };
    let mut parser = Parser { tokens, pos: 0 };
    let mut out = Vec::new();
    while !parser.at_eof() {
        match parser.stmt_any() {
            Ok(stmt) => out.push(Ok(stmt)),
            Err(e) => {
                out.push(Err(e));
                parser.recover_to_semicolon();
            }
        }
    }
    out
}

impl Parser {
    fn at_eof(&self) -> bool {
        self.tokens[self.pos].kind == TokenKind::Eof
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn loc(&self) -> SourceLocation {
        self.cur().loc
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn is_kw(&self, word: &str) -> bool {
        self.cur().is_kw(word)
    }

    fn eat_kw(&mut self, word: &str) -> bool {
        if self.is_kw(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, word: &str) -> Result<()> {
        if self.eat_kw(word) {
            Ok(())
        } else {
            Err(DbError::parse(
                format!("expected '{}', found '{}'", word, self.cur().lexeme),
                self.loc(),
            ))
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.cur().kind == kind {
            Ok(self.advance())
        } else {
            Err(DbError::parse(
                format!("expected {} but found '{}'", what, self.cur().lexeme),
                self.loc(),
            ))
        }
    }

    fn expect_id(&mut self) -> Result<String> {
        if self.cur().kind == TokenKind::Id {
            Ok(self.advance().lexeme)
        } else {
            Err(DbError::parse(
                format!("expected an identifier, found '{}'", self.cur().lexeme),
                self.loc(),
            ))
        }
    }

    /// §4.2: "statements must end with `;`."
    fn expect_semicolon(&mut self) -> Result<()> {
        if self.cur().kind == TokenKind::Semicolon {
            self.advance();
            Ok(())
        } else if self.at_eof() {
            Err(DbError::parse("statements must end with ';'", self.loc()))
        } else {
            Err(DbError::parse(
                format!("expected ';', found '{}'", self.cur().lexeme),
                self.loc(),
            ))
        }
    }

    fn recover_to_semicolon(&mut self) {
        while !self.at_eof() && self.cur().kind != TokenKind::Semicolon {
            self.advance();
        }
        if self.cur().kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    fn stmt_any(&mut self) -> Result<Stmt> {
        if self.is_kw("CREATE") {
            self.stmt_create_table()
        } else if self.is_kw("INSERT") {
            self.stmt_insert()
        } else if self.is_kw("SELECT") {
            self.stmt_select()
        } else if self.is_kw("UPDATE") {
            self.stmt_update()
        } else if self.is_kw("DELETE") {
            self.stmt_delete()
        } else {
            Err(DbError::parse(
                format!("expected a statement, found '{}'", self.cur().lexeme),
                self.loc(),
            ))
        }
    }

    // ---- CREATE TABLE -----------------------------------------------

    fn stmt_create_table(&mut self) -> Result<Stmt> {
        self.expect_kw("CREATE")?;
        self.expect_kw("TABLE")?;
        let table = self.expect_id()?;
        self.expect_kind(TokenKind::LParen, "'('")?;

        let mut columns = Vec::new();
        let mut table_primary_key = None;
        let mut foreign_keys = Vec::new();

        loop {
            if self.is_kw("PRIMARY") {
                self.advance();
                self.expect_kw("KEY")?;
                self.expect_kind(TokenKind::LParen, "'('")?;
                let col = self.expect_id()?;
                self.expect_kind(TokenKind::RParen, "')'")?;
                table_primary_key = Some(col);
            } else if self.is_kw("FOREIGN") {
                self.advance();
                self.expect_kw("KEY")?;
                self.expect_kind(TokenKind::LParen, "'('")?;
                let column = self.expect_id()?;
                self.expect_kind(TokenKind::RParen, "')'")?;
                self.expect_kw("REFERENCES")?;
                let ref_table = self.expect_id()?;
                self.expect_kind(TokenKind::LParen, "'('")?;
                let ref_column = self.expect_id()?;
                self.expect_kind(TokenKind::RParen, "')'")?;
                foreign_keys.push(ForeignKeyDef { column, ref_table, ref_column });
            } else {
                columns.push(self.column_def()?);
            }

            if self.cur().kind == TokenKind::Comma {
                self.advance();
                continue;
            }
            break;
        }

        self.expect_kind(TokenKind::RParen, "')'")?;
        self.expect_semicolon()?;
        Ok(Stmt::CreateTable(CreateTableStmt { table, columns, table_primary_key, foreign_keys }))
    }

    fn column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_id()?;
        let col_type = self.column_type()?;
        let is_primary_key = if self.is_kw("PRIMARY") {
            self.advance();
            self.expect_kw("KEY")?;
            true
        } else {
            false
        };
        Ok(ColumnDef { name, col_type, is_primary_key })
    }

    fn column_type(&mut self) -> Result<ColumnType> {
        if self.eat_kw("INT") {
            Ok(ColumnType::Int)
        } else if self.eat_kw("FLOAT") {
            Ok(ColumnType::Float)
        } else if self.eat_kw("VARCHAR") {
            if self.cur().kind == TokenKind::LParen {
                self.advance();
                let n = self.int_literal()?;
                self.expect_kind(TokenKind::RParen, "')'")?;
                Ok(ColumnType::Varchar(Some(n as u32)))
            } else {
                Ok(ColumnType::Varchar(None))
            }
        } else {
            Err(DbError::parse(
                format!("expected a type (INT, FLOAT, VARCHAR), found '{}'", self.cur().lexeme),
                self.loc(),
            ))
        }
    }

    fn int_literal(&mut self) -> Result<i64> {
        match self.cur().kind {
            TokenKind::IntLiteral(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(DbError::parse(
                format!("expected an integer, found '{}'", self.cur().lexeme),
                self.loc(),
            )),
        }
    }

    // ---- INSERT -------------------------------------------------------

    fn stmt_insert(&mut self) -> Result<Stmt> {
        self.expect_kw("INSERT")?;
        self.expect_kw("INTO")?;
        let table = self.expect_id()?;
        let columns = if self.cur().kind == TokenKind::LParen {
            self.advance();
            let mut ids = vec![self.expect_id()?];
            while self.cur().kind == TokenKind::Comma {
                self.advance();
                ids.push(self.expect_id()?);
            }
            self.expect_kind(TokenKind::RParen, "')'")?;
            Some(ids)
        } else {
            None
        };
        self.expect_kw("VALUES")?;
        let mut rows = vec![self.value_row()?];
        while self.cur().kind == TokenKind::Comma {
            self.advance();
            rows.push(self.value_row()?);
        }
        self.expect_semicolon()?;
        Ok(Stmt::Insert(InsertStmt { table, columns, rows }))
    }

    fn value_row(&mut self) -> Result<Vec<Expr>> {
        self.expect_kind(TokenKind::LParen, "'('")?;
        let mut values = vec![self.literal_expr()?];
        while self.cur().kind == TokenKind::Comma {
            self.advance();
            values.push(self.literal_expr()?);
        }
        self.expect_kind(TokenKind::RParen, "')'")?;
        Ok(values)
    }

    fn literal_expr(&mut self) -> Result<Expr> {
        let loc = self.loc();
        let v = match self.cur().kind.clone() {
            TokenKind::IntLiteral(n) => {
                self.advance();
                Value::Int(n)
            }
            TokenKind::FloatLiteral(f) => {
                self.advance();
                Value::Float(f)
            }
            TokenKind::StringLiteral(ref s) => {
                let s = s.clone();
                self.advance();
                Value::Varchar(s)
            }
            TokenKind::Id if self.is_kw("NULL") => {
                self.advance();
                Value::Null
            }
            _ => {
                return Err(DbError::parse(
                    format!("expected a literal value, found '{}'", self.cur().lexeme),
                    loc,
                ))
            }
        };
        Ok(Expr::Literal(v))
    }

    // ---- SELECT ---------------------------------------------------------

    fn stmt_select(&mut self) -> Result<Stmt> {
        self.expect_kw("SELECT")?;
        // §4.2 hint: "SELECT" followed directly by "FROM".
        if self.is_kw("FROM") {
            return Err(DbError::parse(
                "missing select list; use `*` or column names",
                self.loc(),
            ));
        }
        let (items, is_star) = self.select_list()?;
        self.expect_kw("FROM")?;
        let from = self.table_ref()?;

        let join = if self.is_kw("JOIN") {
            self.advance();
            let table = self.table_ref()?;
            // §4.2 hint: "JOIN" not followed by "ON".
            if !self.is_kw("ON") {
                return Err(DbError::parse("after JOIN expected ON <condition>", self.loc()));
            }
            self.advance();
            let on = self.cond_expr().map_err(|_| {
                DbError::parse("after ON/WHERE expected a boolean condition", self.loc())
            })?;
            Some(JoinClause { table, on })
        } else {
            None
        };

        let filter = if self.is_kw("WHERE") {
            self.advance();
            Some(self.cond_expr().map_err(|_| {
                DbError::parse("after ON/WHERE expected a boolean condition", self.loc())
            })?)
        } else {
            None
        };

        let group_by = if self.is_kw("GROUP") {
            self.advance();
            self.expect_kw("BY")?;
            if self.cur().kind != TokenKind::Id {
                return Err(DbError::parse(
                    "after ORDER BY/GROUP BY expected a column name",
                    self.loc(),
                ));
            }
            Some(self.expect_id()?)
        } else {
            None
        };

        let order_by = if self.is_kw("ORDER") {
            self.advance();
            self.expect_kw("BY")?;
            if self.cur().kind != TokenKind::Id {
                return Err(DbError::parse(
                    "after ORDER BY/GROUP BY expected a column name",
                    self.loc(),
                ));
            }
            let col = self.expect_id()?;
            let dir = if self.eat_kw("DESC") {
                SortDir::Desc
            } else {
                self.eat_kw("ASC");
                SortDir::Asc
            };
            Some((col, dir))
        } else {
            None
        };

        self.expect_semicolon()?;
        Ok(Stmt::Select(SelectStmt { items, is_star, from, join, filter, group_by, order_by }))
    }

    fn select_list(&mut self) -> Result<(Vec<SelectItem>, bool)> {
        if self.cur().kind == TokenKind::Star {
            self.advance();
            return Ok((Vec::new(), true));
        }
        let mut items = vec![self.select_item()?];
        while self.cur().kind == TokenKind::Comma {
            self.advance();
            items.push(self.select_item()?);
        }
        Ok((items, false))
    }

    fn select_item(&mut self) -> Result<SelectItem> {
        let expr = self.scalar_expr()?;
        let alias = if self.eat_kw("AS") { Some(self.expect_id()?) } else { None };
        Ok(SelectItem { expr, alias })
    }

    fn table_ref(&mut self) -> Result<TableRef> {
        let name = self.expect_id()?;
        let alias = if self.cur().kind == TokenKind::Id && !self.is_reserved_here() {
            self.expect_id()?
        } else {
            name.clone()
        };
        Ok(TableRef { name, alias })
    }

    /// True if the upcoming identifier is actually a keyword that ends a
    /// `table_ref` (so it must not be swallowed as an alias).
    fn is_reserved_here(&self) -> bool {
        const STOP: &[&str] =
            &["JOIN", "ON", "WHERE", "GROUP", "ORDER", "SET", "VALUES", "AS"];
        STOP.iter().any(|kw| self.is_kw(kw))
    }

    /// `cond := pred { 'AND' pred }`
    fn cond_expr(&mut self) -> Result<Expr> {
        let mut left = self.pred_expr()?;
        while self.is_kw("AND") {
            self.advance();
            let right = self.pred_expr()?;
            left = Expr::BinOp { op: BinOpKind::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn pred_expr(&mut self) -> Result<Expr> {
        let left = self.scalar_expr()?;
        let op = self.comparison_op()?;
        let right = self.scalar_expr()?;
        Ok(Expr::BinOp { op, left: Box::new(left), right: Box::new(right) })
    }

    fn comparison_op(&mut self) -> Result<BinOpKind> {
        let loc = self.loc();
        let op = match self.cur().kind {
            TokenKind::Eq => BinOpKind::Eq,
            TokenKind::Ne => BinOpKind::Ne,
            TokenKind::Lt => BinOpKind::Lt,
            TokenKind::Gt => BinOpKind::Gt,
            TokenKind::Le => BinOpKind::Le,
            TokenKind::Ge => BinOpKind::Ge,
            _ => {
                return Err(DbError::parse(
                    format!("expected a comparison operator, found '{}'", self.cur().lexeme),
                    loc,
                ))
            }
        };
        self.advance();
        Ok(op)
    }

    /// A primary expression: qualified/bare column, literal, or aggregate
    /// call. This is the full expression grammar the spec needs: no
    /// arithmetic beyond what aggregates and comparisons require.
    fn scalar_expr(&mut self) -> Result<Expr> {
        let loc = self.loc();
        match self.cur().kind.clone() {
            TokenKind::IntLiteral(_) | TokenKind::FloatLiteral(_) | TokenKind::StringLiteral(_) => {
                self.literal_expr()
            }
            TokenKind::Id if self.is_kw("NULL") => self.literal_expr(),
            TokenKind::Id if self.is_kw("COUNT") => self.agg_call(AggKind::Count, true),
            TokenKind::Id if self.is_kw("SUM") => self.agg_call(AggKind::Sum, false),
            TokenKind::Id if self.is_kw("AVG") => self.agg_call(AggKind::Avg, false),
            TokenKind::Id => self.column_ref(),
            _ => Err(DbError::parse(
                format!("expected an expression, found '{}'", self.cur().lexeme),
                loc,
            )),
        }
    }

    fn agg_call(&mut self, kind: AggKind, allow_star: bool) -> Result<Expr> {
        self.advance(); // consume COUNT/SUM/AVG
        self.expect_kind(TokenKind::LParen, "'('")?;
        if allow_star && self.cur().kind == TokenKind::Star {
            self.advance();
            self.expect_kind(TokenKind::RParen, "')'")?;
            return Ok(Expr::Agg { kind: AggKind::CountStar, arg: None });
        }
        let arg = self.column_ref()?;
        self.expect_kind(TokenKind::RParen, "')'")?;
        Ok(Expr::Agg { kind, arg: Some(Box::new(arg)) })
    }

    fn column_ref(&mut self) -> Result<Expr> {
        let first = self.expect_id()?;
        if self.cur().kind == TokenKind::Dot {
            self.advance();
            let name = self.expect_id()?;
            Ok(Expr::Column { qualifier: Some(first), name })
        } else {
            Ok(Expr::Column { qualifier: None, name: first })
        }
    }

    // ---- UPDATE -----------------------------------------------------

    fn stmt_update(&mut self) -> Result<Stmt> {
        self.expect_kw("UPDATE")?;
        let table = self.expect_id()?;
        self.expect_kw("SET")?;
        let mut assignments = vec![self.assignment()?];
        while self.cur().kind == TokenKind::Comma {
            self.advance();
            assignments.push(self.assignment()?);
        }
        let filter = if self.is_kw("WHERE") {
            self.advance();
            Some(self.cond_expr().map_err(|_| {
                DbError::parse("after ON/WHERE expected a boolean condition", self.loc())
            })?)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok(Stmt::Update(UpdateStmt { table, assignments, filter }))
    }

    fn assignment(&mut self) -> Result<Assignment> {
        let column = self.expect_id()?;
        self.expect_kind(TokenKind::Eq, "'='")?;
        let value = self.scalar_expr()?;
        Ok(Assignment { column, value })
    }

    // ---- DELETE -------------------------------------------------------

    fn stmt_delete(&mut self) -> Result<Stmt> {
        self.expect_kw("DELETE")?;
        self.expect_kw("FROM")?;
        let table = self.expect_id()?;
        let filter = if self.is_kw("WHERE") {
            self.advance();
            Some(self.cond_expr().map_err(|_| {
                DbError::parse("after ON/WHERE expected a boolean condition", self.loc())
            })?)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok(Stmt::Delete(DeleteStmt { table, filter }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Stmt {
        let mut results = parse_statements(src);
        assert_eq!(results.len(), 1, "expected exactly one statement result");
        results.remove(0).unwrap()
    }

    #[test]
    fn parses_create_table_with_primary_key() {
        let stmt = parse_one("CREATE TABLE t(id INT PRIMARY KEY, n VARCHAR(4));");
        match stmt {
            Stmt::CreateTable(c) => {
                assert_eq!(c.table, "t");
                assert_eq!(c.columns.len(), 2);
                assert!(c.columns[0].is_primary_key);
            }
            _ => panic!("expected CreateTable"),
        }
    }

    #[test]
    fn parses_insert_with_multiple_rows() {
        let stmt = parse_one("INSERT INTO t VALUES (1,'ab'), (2,'cd');");
        match stmt {
            Stmt::Insert(i) => assert_eq!(i.rows.len(), 2),
            _ => panic!("expected Insert"),
        }
    }

    #[test]
    fn join_missing_on_emits_hint() {
        let results = parse_statements("SELECT s.id FROM student s JOIN class c;");
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("after JOIN expected ON"));
    }

    #[test]
    fn select_directly_followed_by_from_emits_hint() {
        let results = parse_statements("SELECT FROM t;");
        let err = results[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("missing select list"));
    }

    #[test]
    fn missing_trailing_semicolon_emits_hint() {
        let results = parse_statements("SELECT * FROM t");
        let err = results[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("must end with"));
    }

    #[test]
    fn parser_recovers_after_bad_statement() {
        let results = parse_statements("SELECT FROM t; SELECT * FROM t;");
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn group_by_without_identifier_emits_hint() {
        let results = parse_statements("SELECT age, COUNT(*) FROM t GROUP BY ;");
        let err = results[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("after ORDER BY/GROUP BY"));
    }
}
