//! Storage module - pager, fixed-width row store and B-tree indexes

pub mod btree;
pub mod pager;
pub mod table;
pub mod value;

pub use btree::{BTree, Char32Key, Float32Key, Int32Key, KeyCodec, T_MAX};
pub use pager::Pager;
pub use table::FixedTable;
pub use value::Value;

/// Dense zero-based row index into a table file; append-only, never reused
pub type PageId = i32;
