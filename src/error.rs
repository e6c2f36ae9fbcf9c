//! Crate-wide error type.
//!
//! Every fallible operation in the front-end, planner and executor returns
//! `Result<T, DbError>`. A `DbError` carries enough context (a message and,
//! where meaningful, a source location) for the shell to print a single
//! human-readable line and move on to the next statement.

use std::fmt;

/// Position of a token or expression in the original SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// A violated data-integrity rule (primary key, VARCHAR length, foreign key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    VarcharLength,
    ForeignKey,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintKind::PrimaryKey => "primary key",
            ConstraintKind::VarcharLength => "varchar length",
            ConstraintKind::ForeignKey => "foreign key",
        };
        write!(f, "{s}")
    }
}

/// Every error kind named in the specification's error-handling design.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("lex error at {loc}: {msg}")]
    Lex { msg: String, loc: SourceLocation },

    #[error("parse error at {loc}: {msg}")]
    Parse { msg: String, loc: SourceLocation },

    #[error("semantic error: {msg}")]
    Semantic { msg: String },

    #[error("plan error: {msg}")]
    Plan { msg: String },

    #[error("type error: {msg}")]
    Type { msg: String },

    #[error("constraint violation ({kind}): {msg}")]
    Constraint { kind: ConstraintKind, msg: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog error: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("buffer pool exhausted: all {capacity} frames are pinned")]
    BufferExhausted { capacity: usize },

    #[error("runtime error: {msg}")]
    Runtime { msg: String },

    /// A DDL page write or catalog save failed partway through, leaving
    /// the catalog and page files potentially out of sync. Unlike an
    /// ordinary I/O error from a read or a DML write, this one is not
    /// scoped to a single statement, so the shell must not continue.
    #[error("fatal error: {msg}")]
    Fatal { msg: String },
}

impl DbError {
    pub fn lex(msg: impl Into<String>, loc: SourceLocation) -> Self {
        DbError::Lex { msg: msg.into(), loc }
    }

    pub fn parse(msg: impl Into<String>, loc: SourceLocation) -> Self {
        DbError::Parse { msg: msg.into(), loc }
    }

    pub fn semantic(msg: impl Into<String>) -> Self {
        DbError::Semantic { msg: msg.into() }
    }

    pub fn plan(msg: impl Into<String>) -> Self {
        DbError::Plan { msg: msg.into() }
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        DbError::Type { msg: msg.into() }
    }

    pub fn constraint(kind: ConstraintKind, msg: impl Into<String>) -> Self {
        DbError::Constraint { kind, msg: msg.into() }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        DbError::Runtime { msg: msg.into() }
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        DbError::Fatal { msg: msg.into() }
    }

    /// True for errors that abort the current statement but leave the
    /// engine in a usable state for the next one (everything except a
    /// failed page write or catalog save during DDL, which the shell
    /// treats as fatal). An ordinary `Io` error from a read or a DML
    /// write is statement-local: it aborts the one statement, not the
    /// session.
    pub fn is_statement_local(&self) -> bool {
        !matches!(self, DbError::Fatal { .. })
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
