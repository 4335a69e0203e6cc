//! Fixed-width row storage for fixdb
//!
//! A table is a schema header followed by packed fixed-width rows,
//! addressed by page id, plus a one-byte-per-row tombstone sidecar for
//! logical deletion. Rows are append-only; page ids are never reused.

use super::pager::Pager;
use super::value::Value;
use super::PageId;
use crate::catalog::{ColumnMeta, ColumnType, TableSchema};
use crate::error::{Error, Result};
use std::path::Path;

/// A table: schema, row file and tombstone sidecar
#[derive(Debug)]
pub struct FixedTable {
    schema: TableSchema,
    pager: Pager,
    del: Pager,
    path: String,
}

impl FixedTable {
    /// Create a new table file (truncating any existing one) and an empty
    /// tombstone sidecar
    pub fn create(path: impl AsRef<Path>, schema: TableSchema) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let mut pager = Pager::create(&path)?;
        pager.write(0, &schema.encode())?;
        let del = Pager::create(del_path(&path))?;
        Ok(Self {
            schema,
            pager,
            del,
            path: path_str,
        })
    }

    /// Open an existing table, verifying the header magic and loading the
    /// column descriptors
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let mut pager = Pager::open(&path)?;

        let mut header = [0u8; crate::catalog::TABLE_HEADER_SIZE];
        pager.read(0, &mut header)?;
        let ncols = i32::from_le_bytes(header[40..44].try_into().unwrap());
        if ncols < 1 || ncols as usize > crate::catalog::MAX_COLUMNS {
            return Err(Error::CorruptHeader(format!(
                "bad column count {} in '{}'",
                ncols, path_str
            )));
        }

        let full_len = crate::catalog::TABLE_HEADER_SIZE
            + crate::catalog::COLUMN_DESC_SIZE * ncols as usize;
        let mut buf = vec![0u8; full_len];
        pager.read(0, &mut buf)?;
        let schema = TableSchema::decode(&buf, &path_str)?;

        // the sidecar may be missing for tables created elsewhere
        let del = Pager::open_or_create(del_path(&path))?;

        Ok(Self {
            schema,
            pager,
            del,
            path: path_str,
        })
    }

    /// Table schema
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.schema.table_name
    }

    /// Physical row count (includes tombstoned rows), derived from the
    /// file length
    pub fn count(&self) -> Result<PageId> {
        let len = self.pager.size()?;
        let data = self.schema.data_offset();
        if len <= data {
            return Ok(0);
        }
        Ok(((len - data) / self.schema.row_size as u64) as PageId)
    }

    /// Append a row at the current count and return its page id
    pub fn append_row(&mut self, row: &[Value]) -> Result<PageId> {
        let buf = self.pack_row(row)?;
        let pid = self.count()?;
        self.pager.write(self.row_offset(pid), &buf)?;
        self.ensure_del_size(pid as u64 + 1)?;
        self.set_del(pid, 0)?;
        Ok(pid)
    }

    /// Overwrite an existing row in place
    ///
    /// The tombstone byte is forced back to zero.
    pub fn write_row(&mut self, page_id: PageId, row: &[Value]) -> Result<()> {
        if page_id < 0 || page_id >= self.count()? {
            return Err(Error::PageOutOfRange(page_id));
        }
        let buf = self.pack_row(row)?;
        self.pager.write(self.row_offset(page_id), &buf)?;
        self.ensure_del_size(page_id as u64 + 1)?;
        self.set_del(page_id, 0)?;
        Ok(())
    }

    /// Read a row by page id; None when the page id is out of range or
    /// the row is tombstoned
    pub fn read_row(&mut self, page_id: PageId) -> Result<Option<Vec<Value>>> {
        if page_id < 0 || page_id >= self.count()? {
            return Ok(None);
        }
        if self.is_deleted(page_id)? {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.schema.row_size];
        self.pager.read(self.row_offset(page_id), &mut buf)?;
        Ok(Some(self.unpack_row(&buf)))
    }

    /// Flip the tombstone byte for a row
    pub fn mark_deleted(&mut self, page_id: PageId) -> Result<()> {
        self.ensure_del_size(page_id as u64 + 1)?;
        self.set_del(page_id, 1)
    }

    /// Check the tombstone byte for a row
    pub fn is_deleted(&mut self, page_id: PageId) -> Result<bool> {
        self.ensure_del_size(page_id as u64 + 1)?;
        let mut b = [0u8; 1];
        self.del.read(page_id as u64, &mut b)?;
        Ok(b[0] != 0)
    }

    // ========== Field helpers ==========
    //
    // These read a single field without materializing the full row; they
    // power index building and maintenance.

    /// Read an INT32 field by column name
    pub fn read_int(&mut self, page_id: PageId, column: &str) -> Result<i32> {
        let col = self.typed_column(column, &ColumnType::Int32)?;
        let bytes = self.read_field(page_id, &col)?;
        Ok(i32::from_le_bytes(bytes[..4].try_into().unwrap()))
    }

    /// Read a FLOAT32 field by column name
    pub fn read_float(&mut self, page_id: PageId, column: &str) -> Result<f32> {
        let col = self.typed_column(column, &ColumnType::Float32)?;
        let bytes = self.read_field(page_id, &col)?;
        Ok(f32::from_le_bytes(bytes[..4].try_into().unwrap()))
    }

    /// Read a CHAR field by column name, stripping trailing NULs
    pub fn read_char(&mut self, page_id: PageId, column: &str) -> Result<String> {
        let col = self
            .schema
            .column(column)
            .cloned()
            .ok_or_else(|| Error::ColumnNotFound(column.to_string(), self.name().to_string()))?;
        if !matches!(col.ty, ColumnType::Char(_)) {
            return Err(Error::TypeMismatch {
                column: column.to_string(),
                expected: "CHAR".to_string(),
                found: col.ty.to_string(),
            });
        }
        let bytes = self.read_field(page_id, &col)?;
        Ok(unpack_char(&bytes))
    }

    // ========== Internals ==========

    fn row_offset(&self, page_id: PageId) -> u64 {
        self.schema.data_offset() + page_id as u64 * self.schema.row_size as u64
    }

    fn typed_column(&self, name: &str, expected: &ColumnType) -> Result<ColumnMeta> {
        let col = self
            .schema
            .column(name)
            .cloned()
            .ok_or_else(|| Error::ColumnNotFound(name.to_string(), self.name().to_string()))?;
        if col.ty != *expected {
            return Err(Error::TypeMismatch {
                column: name.to_string(),
                expected: expected.to_string(),
                found: col.ty.to_string(),
            });
        }
        Ok(col)
    }

    fn read_field(&mut self, page_id: PageId, col: &ColumnMeta) -> Result<Vec<u8>> {
        if page_id < 0 || page_id >= self.count()? {
            return Err(Error::PageOutOfRange(page_id));
        }
        let mut buf = vec![0u8; col.width];
        self.pager
            .read(self.row_offset(page_id) + col.offset as u64, &mut buf)?;
        Ok(buf)
    }

    /// Pack a row into its `row_size`-byte on-disk form, validating arity
    /// and value tags
    fn pack_row(&self, row: &[Value]) -> Result<Vec<u8>> {
        if row.len() != self.schema.column_count() {
            return Err(Error::ArityMismatch {
                expected: self.schema.column_count(),
                found: row.len(),
            });
        }
        let mut buf = vec![0u8; self.schema.row_size];
        for (col, value) in self.schema.columns.iter().zip(row) {
            if !value.matches(&col.ty) {
                return Err(Error::TypeMismatch {
                    column: col.name.clone(),
                    expected: col.ty.to_string(),
                    found: value.type_name().to_string(),
                });
            }
            let dst = &mut buf[col.offset..col.offset + col.width];
            match value {
                Value::Int(i) => dst.copy_from_slice(&i.to_le_bytes()),
                Value::Float(f) => dst.copy_from_slice(&f.to_le_bytes()),
                Value::Str(s) => {
                    // overlong strings keep the final byte as a NUL terminator
                    let n = s.len().min(col.width - 1);
                    dst[..n].copy_from_slice(&s.as_bytes()[..n]);
                }
            }
        }
        Ok(buf)
    }

    fn unpack_row(&self, buf: &[u8]) -> Vec<Value> {
        self.schema
            .columns
            .iter()
            .map(|col| {
                let src = &buf[col.offset..col.offset + col.width];
                match col.ty {
                    ColumnType::Int32 => {
                        Value::Int(i32::from_le_bytes(src[..4].try_into().unwrap()))
                    }
                    ColumnType::Float32 => {
                        Value::Float(f32::from_le_bytes(src[..4].try_into().unwrap()))
                    }
                    ColumnType::Char(_) => Value::Str(unpack_char(src)),
                }
            })
            .collect()
    }

    fn ensure_del_size(&mut self, needed: u64) -> Result<()> {
        let have = self.del.size()?;
        if have < needed {
            let zeros = vec![0u8; (needed - have) as usize];
            self.del.write(have, &zeros)?;
        }
        Ok(())
    }

    fn set_del(&mut self, page_id: PageId, flag: u8) -> Result<()> {
        self.del.write(page_id as u64, &[flag])
    }
}

/// Sidecar path for a table file: `<path>.del`
fn del_path(path: impl AsRef<Path>) -> std::path::PathBuf {
    let mut p = path.as_ref().as_os_str().to_owned();
    p.push(".del");
    std::path::PathBuf::from(p)
}

/// Decode a CHAR field, stopping at the first NUL
fn unpack_char(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
