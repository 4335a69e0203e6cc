//! Error types for fixdb
//!
//! This module defines all error types used throughout the database engine.

use thiserror::Error;

/// The main error type for fixdb
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Session Errors ==========
    #[error("Session error: no database open")]
    NoDatabaseOpen,

    #[error("Session error: database '{0}' already exists")]
    DatabaseAlreadyExists(String),

    #[error("Session error: database '{0}' not found")]
    DatabaseNotFound(String),

    // ========== Schema Errors ==========
    #[error("Schema error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Schema error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Schema error: column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Schema error: duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("Schema error: invalid type declaration '{0}'")]
    BadTypeDeclaration(String),

    #[error("Schema error: CHAR width must be between 1 and 65535, got {0}")]
    BadCharWidth(i64),

    #[error("Schema error: a table needs between 1 and 64 columns, got {0}")]
    BadColumnCount(usize),

    #[error("Schema error: column name '{0}' exceeds 31 bytes")]
    ColumnNameTooLong(String),

    #[error("Schema error: expected {expected} values, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Index error: no index on {0}.{1}")]
    IndexNotFound(String, String),

    // ========== Type Errors ==========
    #[error("Type error: column '{column}' expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    // ========== Format Errors ==========
    #[error("Format error: bad magic in '{0}'")]
    BadMagic(String),

    #[error("Format error: {0}")]
    CorruptHeader(String),

    // ========== Storage Errors ==========
    #[error("Storage error: page id {0} out of range")]
    PageOutOfRange(i32),

    #[error("Storage error: B-tree minimum degree {0} out of range (2..={1})")]
    BadDegree(i32, i32),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fixdb operations
pub type Result<T> = std::result::Result<T, Error>;
