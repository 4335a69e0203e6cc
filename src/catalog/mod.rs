//! Catalog module - column types and table schemas

mod schema;
mod types;

pub use schema::{
    ColumnMeta, TableSchema, COLUMN_DESC_SIZE, MAX_COLUMNS, MAX_NAME_LEN, TABLE_HEADER_SIZE,
    TABLE_MAGIC,
};
pub use types::{ColumnType, TYPE_TAG_CHAR, TYPE_TAG_FLOAT32, TYPE_TAG_INT32};
