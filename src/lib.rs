//! fixdb - An embedded fixed-width relational mini-database
//!
//! This library provides the core components for a small single-process
//! SQL database:
//! - SQL parsing for a restricted dialect (lexer, parser, AST)
//! - Fixed-width row storage with a tombstone sidecar
//! - Disk-resident B-tree secondary indexes (int32 / float32 / char32 keys)
//! - Query execution (trivial index-vs-scan planning, compound WHERE)
//! - Database directory lifecycle and index maintenance

pub mod catalog;
pub mod database;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
