//! Database directory lifecycle and index maintenance
//!
//! A database is a directory: one subdirectory per table holding the row
//! file, its tombstone sidecar and any B-tree index files. This module
//! owns the open-table registry and keeps every loaded index consistent
//! with each mutation.
//!
//! Per-index failures during bulk maintenance are reported and swallowed
//! so that a damaged index never blocks table mutations; the table write
//! is authoritative.

use crate::catalog::{ColumnType, TableSchema};
use crate::error::{Error, Result};
use crate::storage::{
    BTree, Char32Key, FixedTable, Float32Key, Int32Key, KeyCodec, PageId, Value,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default minimum degree for newly created indexes
pub const DEFAULT_MIN_DEGREE: i32 = 8;

/// An open table and its loaded indexes, partitioned by key kind
#[derive(Debug)]
pub struct TableEntry {
    /// The open row store
    pub table: FixedTable,
    int_indexes: HashMap<String, BTree<Int32Key>>,
    float_indexes: HashMap<String, BTree<Float32Key>>,
    char_indexes: HashMap<String, BTree<Char32Key>>,
}

impl TableEntry {
    fn new(table: FixedTable) -> Self {
        Self {
            table,
            int_indexes: HashMap::new(),
            float_indexes: HashMap::new(),
            char_indexes: HashMap::new(),
        }
    }

    /// True when a loaded index of any kind covers the column
    pub fn has_index(&self, column: &str) -> bool {
        self.int_indexes.contains_key(column)
            || self.float_indexes.contains_key(column)
            || self.char_indexes.contains_key(column)
    }

    /// Loaded int32 index for a column
    pub fn int_index(&mut self, column: &str) -> Option<&mut BTree<Int32Key>> {
        self.int_indexes.get_mut(column)
    }

    /// Loaded float32 index for a column
    pub fn float_index(&mut self, column: &str) -> Option<&mut BTree<Float32Key>> {
        self.float_indexes.get_mut(column)
    }

    /// Loaded char32 index for a column
    pub fn char_index(&mut self, column: &str) -> Option<&mut BTree<Char32Key>> {
        self.char_indexes.get_mut(column)
    }
}

/// An open database: root directory plus the per-table registry
#[derive(Debug)]
pub struct Database {
    root: PathBuf,
    tables: HashMap<String, TableEntry>,
}

impl Database {
    /// Create a new database directory; refuses when the path already
    /// exists
    pub fn create(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(Error::DatabaseAlreadyExists(path.display().to_string()));
        }
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    /// Open an existing database directory with an empty registry
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::DatabaseNotFound(path.display().to_string()));
        }
        Ok(Self {
            root: path.to_path_buf(),
            tables: HashMap::new(),
        })
    }

    /// Root directory of this database
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the tables on disk: subdirectories containing a
    /// `<name>.tbl` file, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().join(format!("{}.tbl", name)).is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a table inside the database and register its handle
    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        let name = schema.table_name.clone();
        let dir = self.root.join(&name);
        std::fs::create_dir_all(&dir)?;
        let table = FixedTable::create(dir.join(format!("{}.tbl", name)), schema)?;
        self.tables.insert(name, TableEntry::new(table));
        Ok(())
    }

    /// Get the registry entry for a table, opening it from disk on first
    /// reference
    pub fn table_entry(&mut self, name: &str) -> Result<&mut TableEntry> {
        if !self.tables.contains_key(name) {
            let path = self.root.join(name).join(format!("{}.tbl", name));
            if !path.is_file() {
                return Err(Error::TableNotFound(name.to_string()));
            }
            let table = FixedTable::open(path)?;
            self.tables.insert(name.to_string(), TableEntry::new(table));
        }
        Ok(self.tables.get_mut(name).unwrap())
    }

    /// Schema of a table (opened implicitly when needed)
    pub fn schema(&mut self, table: &str) -> Result<TableSchema> {
        Ok(self.table_entry(table)?.table.schema().clone())
    }

    /// Build an index over `(table, column)` from a full scan of the live
    /// rows, then register the handle
    pub fn create_index(&mut self, table: &str, column: &str, t: i32) -> Result<()> {
        let dir = self.root.join(table);
        let entry = self.table_entry(table)?;
        let schema = entry.table.schema().clone();
        let col = schema
            .column(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string(), table.to_string()))?;
        let id_col = schema.column_index("id");
        let n = entry.table.count()?;
        let base = format!("{}_{}", table, column);

        match col.ty {
            ColumnType::Int32 => {
                let path = dir.join(format!("{}.{}", base, Int32Key::EXTENSION));
                let mut idx = BTree::<Int32Key>::create(path, t)?;
                for pid in 0..n {
                    if row_is_live(&mut entry.table, pid, id_col)? {
                        let v = entry.table.read_int(pid, column)?;
                        idx.insert(&v, pid)?;
                    }
                }
                entry.int_indexes.insert(column.to_string(), idx);
            }
            ColumnType::Float32 => {
                let path = dir.join(format!("{}.{}", base, Float32Key::EXTENSION));
                let mut idx = BTree::<Float32Key>::create(path, t)?;
                for pid in 0..n {
                    if row_is_live(&mut entry.table, pid, id_col)? {
                        let v = entry.table.read_float(pid, column)?;
                        idx.insert(&v, pid)?;
                    }
                }
                entry.float_indexes.insert(column.to_string(), idx);
            }
            ColumnType::Char(_) => {
                let path = dir.join(format!("{}.{}", base, Char32Key::EXTENSION));
                let mut idx = BTree::<Char32Key>::create(path, t)?;
                for pid in 0..n {
                    if row_is_live(&mut entry.table, pid, id_col)? {
                        let v = entry.table.read_char(pid, column)?;
                        idx.insert(&v, pid)?;
                    }
                }
                entry.char_indexes.insert(column.to_string(), idx);
            }
        }
        Ok(())
    }

    /// Discover and open index files for a table that are not yet
    /// registered
    ///
    /// A file that fails to open is skipped so that one damaged index
    /// never breaks the session.
    pub fn ensure_indices_loaded(&mut self, table: &str) -> Result<()> {
        self.table_entry(table)?;
        let dir = self.root.join(table);
        if !dir.is_dir() {
            return Ok(());
        }

        let prefix = format!("{}_", table);
        let mut found: Vec<(String, String, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|e| e.to_str()),
            ) else {
                continue;
            };
            if !matches!(ext, "bti" | "btf" | "bts") {
                continue;
            }
            let Some(column) = stem.strip_prefix(&prefix) else {
                continue;
            };
            found.push((column.to_string(), ext.to_string(), path.clone()));
        }

        let entry = self.tables.get_mut(table).unwrap();
        for (column, ext, path) in found {
            match ext.as_str() {
                "bti" if !entry.int_indexes.contains_key(&column) => {
                    match BTree::<Int32Key>::open(&path) {
                        Ok(idx) => {
                            entry.int_indexes.insert(column, idx);
                        }
                        Err(e) => warn!("skipping index file {}: {}", path.display(), e),
                    }
                }
                "btf" if !entry.float_indexes.contains_key(&column) => {
                    match BTree::<Float32Key>::open(&path) {
                        Ok(idx) => {
                            entry.float_indexes.insert(column, idx);
                        }
                        Err(e) => warn!("skipping index file {}: {}", path.display(), e),
                    }
                }
                "bts" if !entry.char_indexes.contains_key(&column) => {
                    match BTree::<Char32Key>::open(&path) {
                        Ok(idx) => {
                            entry.char_indexes.insert(column, idx);
                        }
                        Err(e) => warn!("skipping index file {}: {}", path.display(), e),
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Append a row and insert it into every loaded index on the table
    ///
    /// This is the only public insert path. Per-index failures are
    /// reported and swallowed.
    pub fn insert_row(&mut self, table: &str, row: &[Value]) -> Result<PageId> {
        self.ensure_indices_loaded(table)?;
        let entry = self.tables.get_mut(table).unwrap();
        let pid = entry.table.append_row(row)?;

        let TableEntry {
            table: tbl,
            int_indexes,
            float_indexes,
            char_indexes,
        } = entry;

        for (column, idx) in int_indexes.iter_mut() {
            let result = tbl
                .read_int(pid, column)
                .and_then(|v| idx.insert(&v, pid));
            if let Err(e) = result {
                warn!("index maintenance failed on {}.{}: {}", table, column, e);
            }
        }
        for (column, idx) in float_indexes.iter_mut() {
            let result = tbl
                .read_float(pid, column)
                .and_then(|v| idx.insert(&v, pid));
            if let Err(e) = result {
                warn!("index maintenance failed on {}.{}: {}", table, column, e);
            }
        }
        for (column, idx) in char_indexes.iter_mut() {
            let result = tbl
                .read_char(pid, column)
                .and_then(|v| idx.insert(&v, pid));
            if let Err(e) = result {
                warn!("index maintenance failed on {}.{}: {}", table, column, e);
            }
        }
        Ok(pid)
    }

    /// Logically delete a row: drop its `(value, page id)` pairs from
    /// every loaded index, set `id = -1` when an `id` column exists,
    /// overwrite the row and set the tombstone byte
    ///
    /// Returns false when the row is already absent or deleted.
    pub fn delete_by_page_id(&mut self, table: &str, page_id: PageId) -> Result<bool> {
        self.ensure_indices_loaded(table)?;
        let entry = self.tables.get_mut(table).unwrap();
        let schema = entry.table.schema().clone();

        let Some(mut row) = entry.table.read_row(page_id)? else {
            return Ok(false);
        };
        let id_col = schema.column_index("id");
        if let Some(i) = id_col {
            if row[i] == Value::Int(-1) {
                return Ok(false);
            }
        }

        let TableEntry {
            table: tbl,
            int_indexes,
            float_indexes,
            char_indexes,
        } = entry;

        for (column, idx) in int_indexes.iter_mut() {
            if let Some(Value::Int(v)) = schema.column_index(column).map(|i| &row[i]) {
                if let Err(e) = idx.remove_exact(v, page_id) {
                    warn!("index maintenance failed on {}.{}: {}", table, column, e);
                }
            }
        }
        for (column, idx) in float_indexes.iter_mut() {
            if let Some(Value::Float(v)) = schema.column_index(column).map(|i| &row[i]) {
                if let Err(e) = idx.remove_exact(v, page_id) {
                    warn!("index maintenance failed on {}.{}: {}", table, column, e);
                }
            }
        }
        for (column, idx) in char_indexes.iter_mut() {
            if let Some(Value::Str(v)) = schema.column_index(column).map(|i| &row[i]) {
                if let Err(e) = idx.remove_exact(v, page_id) {
                    warn!("index maintenance failed on {}.{}: {}", table, column, e);
                }
            }
        }

        if let Some(i) = id_col {
            row[i] = Value::Int(-1);
        }
        tbl.write_row(page_id, &row)?;
        tbl.mark_deleted(page_id)?;
        Ok(true)
    }

    /// Apply a set list to each listed row, with type checks and implicit
    /// coercions, moving index entries for every changed indexed column
    ///
    /// Returns the number of rows written.
    pub fn update_rows_by_page_ids(
        &mut self,
        table: &str,
        page_ids: &[PageId],
        set_list: &[(String, Value)],
    ) -> Result<usize> {
        self.ensure_indices_loaded(table)?;
        let entry = self.tables.get_mut(table).unwrap();
        let schema = entry.table.schema().clone();
        let id_col = schema.column_index("id");

        // resolve and type-check the set list up front
        let mut plan: Vec<(usize, Value)> = Vec::with_capacity(set_list.len());
        for (column, value) in set_list {
            let ci = schema
                .column_index(column)
                .ok_or_else(|| Error::ColumnNotFound(column.clone(), table.to_string()))?;
            let coerced = value.coerce_to(&schema.columns[ci].ty).ok_or_else(|| {
                Error::TypeMismatch {
                    column: column.clone(),
                    expected: schema.columns[ci].ty.to_string(),
                    found: value.type_name().to_string(),
                }
            })?;
            plan.push((ci, coerced));
        }

        let mut updated = 0;
        for &pid in page_ids {
            let Some(before) = entry.table.read_row(pid)? else {
                continue;
            };
            if let Some(i) = id_col {
                if before[i] == Value::Int(-1) {
                    continue;
                }
            }

            let mut after = before.clone();
            for (ci, value) in &plan {
                after[*ci] = value.clone();
            }
            entry.table.write_row(pid, &after)?;

            let TableEntry {
                int_indexes,
                float_indexes,
                char_indexes,
                ..
            } = &mut *entry;
            for (ci, _) in &plan {
                if before[*ci] == after[*ci] {
                    continue;
                }
                let column = &schema.columns[*ci].name;
                let moved = match (&before[*ci], &after[*ci]) {
                    (Value::Int(old), Value::Int(new)) => {
                        int_indexes.get_mut(column).map(|idx| {
                            idx.remove_exact(old, pid).and_then(|_| idx.insert(new, pid))
                        })
                    }
                    (Value::Float(old), Value::Float(new)) => {
                        float_indexes.get_mut(column).map(|idx| {
                            idx.remove_exact(old, pid).and_then(|_| idx.insert(new, pid))
                        })
                    }
                    (Value::Str(old), Value::Str(new)) => {
                        char_indexes.get_mut(column).map(|idx| {
                            idx.remove_exact(old, pid).and_then(|_| idx.insert(new, pid))
                        })
                    }
                    _ => None,
                };
                if let Some(Err(e)) = moved {
                    warn!("index maintenance failed on {}.{}: {}", table, column, e);
                }
            }
            updated += 1;
        }
        Ok(updated)
    }
}

/// A row is live when it is not tombstoned and, when an `id` column
/// exists, its id is not -1
fn row_is_live(table: &mut FixedTable, pid: PageId, id_col: Option<usize>) -> Result<bool> {
    let Some(row) = table.read_row(pid)? else {
        return Ok(false);
    };
    if let Some(i) = id_col {
        if row[i] == Value::Int(-1) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sales_schema() -> TableSchema {
        TableSchema::new(
            "sales",
            &[
                ("id".to_string(), ColumnType::Int32),
                ("name".to_string(), ColumnType::Char(8)),
                ("qty".to_string(), ColumnType::Int32),
                ("price".to_string(), ColumnType::Float32),
            ],
        )
        .unwrap()
    }

    fn row(id: i32, name: &str, qty: i32, price: f32) -> Vec<Value> {
        vec![
            Value::Int(id),
            Value::Str(name.into()),
            Value::Int(qty),
            Value::Float(price),
        ]
    }

    #[test]
    fn test_create_open_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");

        Database::create(&path).unwrap();
        assert!(matches!(
            Database::create(&path),
            Err(Error::DatabaseAlreadyExists(_))
        ));

        let db = Database::open(&path).unwrap();
        drop(db);
        assert!(matches!(
            Database::open(dir.path().join("missing")),
            Err(Error::DatabaseNotFound(_))
        ));
    }

    #[test]
    fn test_create_table_and_implicit_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();

        {
            let mut db = Database::open(&path).unwrap();
            db.create_table(sales_schema()).unwrap();
            db.insert_row("sales", &row(1, "a", 10, 1.5)).unwrap();
        }

        // a fresh session finds the table on disk
        let mut db = Database::open(&path).unwrap();
        assert_eq!(db.list_tables().unwrap(), vec!["sales".to_string()]);
        let entry = db.table_entry("sales").unwrap();
        assert_eq!(entry.table.count().unwrap(), 1);

        assert!(matches!(
            db.table_entry("nope"),
            Err(Error::TableNotFound(_))
        ));
    }

    #[test]
    fn test_create_index_scans_live_rows_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        let mut db = Database::open(&path).unwrap();
        db.create_table(sales_schema()).unwrap();

        for i in 0..5 {
            db.insert_row("sales", &row(i + 1, "x", i * 10, 0.0)).unwrap();
        }
        db.delete_by_page_id("sales", 2).unwrap();

        db.create_index("sales", "qty", DEFAULT_MIN_DEGREE).unwrap();
        let entry = db.table_entry("sales").unwrap();
        let idx = entry.int_index("qty").unwrap();
        assert_eq!(idx.search(&10).unwrap(), Some(1));
        // the deleted row's entry was never built
        assert_eq!(idx.search(&20).unwrap(), None);
    }

    #[test]
    fn test_insert_maintains_loaded_indexes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        let mut db = Database::open(&path).unwrap();
        db.create_table(sales_schema()).unwrap();
        db.create_index("sales", "qty", DEFAULT_MIN_DEGREE).unwrap();
        db.create_index("sales", "name", DEFAULT_MIN_DEGREE).unwrap();

        let pid = db.insert_row("sales", &row(1, "abc", 42, 2.0)).unwrap();

        let entry = db.table_entry("sales").unwrap();
        assert_eq!(entry.int_index("qty").unwrap().search(&42).unwrap(), Some(pid));
        assert_eq!(
            entry
                .char_index("name")
                .unwrap()
                .search(&"abc".to_string())
                .unwrap(),
            Some(pid)
        );
    }

    #[test]
    fn test_delete_keeps_both_tombstone_signals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        let mut db = Database::open(&path).unwrap();
        db.create_table(sales_schema()).unwrap();
        db.create_index("sales", "qty", DEFAULT_MIN_DEGREE).unwrap();

        db.insert_row("sales", &row(1, "a", 10, 0.0)).unwrap();
        db.insert_row("sales", &row(2, "b", 20, 0.0)).unwrap();

        assert!(db.delete_by_page_id("sales", 0).unwrap());
        // double delete is a no-op
        assert!(!db.delete_by_page_id("sales", 0).unwrap());
        assert!(!db.delete_by_page_id("sales", 99).unwrap());

        let entry = db.table_entry("sales").unwrap();
        assert!(entry.table.is_deleted(0).unwrap());
        assert_eq!(entry.table.read_row(0).unwrap(), None);
        assert_eq!(entry.table.read_int(0, "id").unwrap(), -1);
        assert_eq!(entry.int_index("qty").unwrap().search(&10).unwrap(), None);
        assert_eq!(entry.int_index("qty").unwrap().search(&20).unwrap(), Some(1));
    }

    #[test]
    fn test_delete_with_duplicate_keys_removes_the_right_pair() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        let mut db = Database::open(&path).unwrap();
        db.create_table(sales_schema()).unwrap();
        db.create_index("sales", "qty", DEFAULT_MIN_DEGREE).unwrap();

        // three rows share qty = 50
        for i in 0..3 {
            db.insert_row("sales", &row(i + 1, "x", 50, 0.0)).unwrap();
        }
        assert!(db.delete_by_page_id("sales", 1).unwrap());

        let entry = db.table_entry("sales").unwrap();
        let mut hits = entry.int_index("qty").unwrap().range_values(&50, &50).unwrap();
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 2]);
    }

    #[test]
    fn test_update_moves_index_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        let mut db = Database::open(&path).unwrap();
        db.create_table(sales_schema()).unwrap();
        db.create_index("sales", "qty", DEFAULT_MIN_DEGREE).unwrap();

        db.insert_row("sales", &row(1, "a", 10, 1.0)).unwrap();
        db.insert_row("sales", &row(2, "b", 20, 2.0)).unwrap();

        let n = db
            .update_rows_by_page_ids("sales", &[1], &[("qty".to_string(), Value::Int(25))])
            .unwrap();
        assert_eq!(n, 1);

        let entry = db.table_entry("sales").unwrap();
        assert_eq!(entry.int_index("qty").unwrap().search(&20).unwrap(), None);
        assert_eq!(entry.int_index("qty").unwrap().search(&25).unwrap(), Some(1));
        let fetched = entry.table.read_row(1).unwrap().unwrap();
        assert_eq!(fetched[2], Value::Int(25));
    }

    #[test]
    fn test_update_coercions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        let mut db = Database::open(&path).unwrap();
        db.create_table(sales_schema()).unwrap();
        db.insert_row("sales", &row(1, "a", 10, 1.0)).unwrap();

        // FLOAT literal into INT column, INT literal into FLOAT and CHAR
        db.update_rows_by_page_ids(
            "sales",
            &[0],
            &[
                ("qty".to_string(), Value::Float(7.6)),
                ("price".to_string(), Value::Int(3)),
                ("name".to_string(), Value::Int(12)),
            ],
        )
        .unwrap();

        let entry = db.table_entry("sales").unwrap();
        let fetched = entry.table.read_row(0).unwrap().unwrap();
        assert_eq!(fetched[2], Value::Int(8));
        assert_eq!(fetched[3], Value::Float(3.0));
        assert_eq!(fetched[1], Value::Str("12".into()));

        // no coercion from CHAR to INT
        let err = db.update_rows_by_page_ids(
            "sales",
            &[0],
            &[("qty".to_string(), Value::Str("x".into()))],
        );
        assert!(matches!(err, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_lazy_index_discovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        {
            let mut db = Database::open(&path).unwrap();
            db.create_table(sales_schema()).unwrap();
            db.insert_row("sales", &row(1, "a", 10, 0.5)).unwrap();
            db.create_index("sales", "qty", DEFAULT_MIN_DEGREE).unwrap();
            db.create_index("sales", "price", DEFAULT_MIN_DEGREE).unwrap();
        }

        let mut db = Database::open(&path).unwrap();
        db.ensure_indices_loaded("sales").unwrap();
        let entry = db.table_entry("sales").unwrap();
        assert!(entry.has_index("qty"));
        assert!(entry.has_index("price"));
        assert!(!entry.has_index("name"));
        assert_eq!(entry.int_index("qty").unwrap().search(&10).unwrap(), Some(0));
    }

    #[test]
    fn test_damaged_index_file_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db1");
        Database::create(&path).unwrap();
        let mut db = Database::open(&path).unwrap();
        db.create_table(sales_schema()).unwrap();

        // a garbage file with an index extension must not break the session
        std::fs::write(path.join("sales").join("sales_qty.bti"), b"junk").unwrap();
        db.ensure_indices_loaded("sales").unwrap();
        assert!(!db.table_entry("sales").unwrap().has_index("qty"));
    }
}
