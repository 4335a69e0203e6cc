//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for the restricted dialect.

use crate::catalog::ColumnType;

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE DATABASE <name>
    CreateDatabase(String),
    /// USE <name>
    UseDatabase(String),
    /// CLOSE DATABASE / CLOSE
    CloseDatabase,
    /// SHOW TABLES
    ShowTables,
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// CREATE INDEX statement
    CreateIndex(CreateIndexStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Declared columns (the implicit `id` column is added by the
    /// executor)
    pub columns: Vec<ColumnDecl>,
}

/// One declared column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDecl {
    /// Column name
    pub name: String,
    /// Column type
    pub ty: ColumnType,
}

/// CREATE INDEX statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    /// Index name; parsed but unused, file naming derives from table and
    /// column
    pub index_name: String,
    /// Table name
    pub table_name: String,
    /// Indexed column
    pub column: String,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table
    pub table_name: String,
    /// Column names, assigned by name
    pub columns: Vec<String>,
    /// One literal per named column
    pub values: Vec<Literal>,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Projection list
    pub projection: Projection,
    /// Source table
    pub table_name: String,
    /// Optional WHERE clause
    pub where_clause: Option<WhereExpr>,
}

/// Projection list: `*` or named columns
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Wildcard,
    Columns(Vec<String>),
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table
    pub table_name: String,
    /// SET assignments in order
    pub assignments: Vec<(String, Literal)>,
    /// Optional WHERE clause
    pub where_clause: Option<WhereExpr>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table
    pub table_name: String,
    /// Optional WHERE clause; its absence deletes every live row
    pub where_clause: Option<WhereExpr>,
}

/// A literal value as written in the statement
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    /// Quoted or bare string
    Str(String),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// A single predicate: `<column> <op> <literal>`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub literal: Literal,
}

/// Connective between the two predicates of a compound WHERE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// A WHERE expression: one predicate, optionally joined with a second by
/// a single AND/OR (no parentheses, no precedence)
#[derive(Debug, Clone, PartialEq)]
pub struct WhereExpr {
    /// The drive predicate, eligible for an index probe
    pub first: Predicate,
    /// Optional second predicate applied as a post-filter
    pub rest: Option<(Connective, Predicate)>,
}
