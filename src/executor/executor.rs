//! Query executor for fixdb
//!
//! The executor owns the session: at most one open database, a statement
//! entry point and the tabular rendering of results. Library errors are
//! caught at statement boundary and surfaced as one-line diagnostics on
//! the output sink.

use super::planner;
use crate::catalog::{ColumnType, TableSchema};
use crate::database::{Database, DEFAULT_MIN_DEGREE};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::sql::Parser;
use crate::storage::{PageId, Value};
use serde::Serialize;
use std::cmp::Ordering;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Result of one executed statement
#[derive(Debug, Serialize)]
pub enum QueryResult {
    /// Tabular output: header plus data rows
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// Rows logically deleted
    Deleted(usize),
    /// Rows rewritten
    Updated(usize),
    /// A one-line confirmation
    Message(String),
}

impl QueryResult {
    /// Render the result the way the REPL prints it: columns joined with
    /// ` | `, one line per row, and a trailing row counter
    pub fn render(&self) -> String {
        match self {
            QueryResult::Rows { columns, rows } => {
                let mut out = columns.join(" | ");
                out.push('\n');
                for row in rows {
                    let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                    out.push_str(&line.join(" | "));
                    out.push('\n');
                }
                out.push_str(&format!("(filas: {})\n", rows.len()));
                out
            }
            QueryResult::Deleted(n) => format!("(filas borradas: {})\n", n),
            QueryResult::Updated(n) => format!("(filas actualizadas: {})\n", n),
            QueryResult::Message(m) => format!("{}\n", m),
        }
    }
}

/// The SQL session: one optional open database plus an output sink
pub struct Executor {
    db: Option<Database>,
    base_dir: PathBuf,
    out: Box<dyn io::Write>,
}

impl Executor {
    /// New executor printing to stdout, resolving database names against
    /// the current directory
    pub fn new() -> Self {
        Self::with_sink(Box::new(io::stdout()))
    }

    /// New executor printing to the given sink
    pub fn with_sink(out: Box<dyn io::Write>) -> Self {
        Self {
            db: None,
            base_dir: PathBuf::from("."),
            out,
        }
    }

    /// Resolve database names against `dir` instead of the current
    /// directory
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Execute one statement, printing its tabular output or a one-line
    /// `Error: ...` diagnostic; the session stays usable either way
    pub fn execute(&mut self, sql: &str) {
        if sql.trim().is_empty() {
            return;
        }
        match self.run_statement(sql) {
            Ok(result) => {
                let _ = self.out.write_all(result.render().as_bytes());
            }
            Err(e) => {
                let _ = writeln!(self.out, "Error: {}", e);
            }
        }
        let _ = self.out.flush();
    }

    /// Parse and run one statement, returning its result
    pub fn run_statement(&mut self, sql: &str) -> Result<QueryResult> {
        let stmt = Parser::new(sql)?.parse()?;
        match stmt {
            Statement::CreateDatabase(name) => {
                Database::create(self.base_dir.join(&name))?;
                Ok(QueryResult::Message(format!("Database created: {}", name)))
            }
            Statement::UseDatabase(name) => {
                let db = Database::open(self.base_dir.join(&name))?;
                self.db = Some(db);
                Ok(QueryResult::Message(format!("Using database: {}", name)))
            }
            Statement::CloseDatabase => {
                if self.db.take().is_none() {
                    return Err(Error::NoDatabaseOpen);
                }
                Ok(QueryResult::Message("Database closed".to_string()))
            }
            Statement::ShowTables => exec_show_tables(self.open_db()?),
            Statement::CreateTable(s) => exec_create_table(self.open_db()?, s),
            Statement::CreateIndex(s) => exec_create_index(self.open_db()?, s),
            Statement::Insert(s) => exec_insert(self.open_db()?, s),
            Statement::Select(s) => exec_select(self.open_db()?, s),
            Statement::Update(s) => exec_update(self.open_db()?, s),
            Statement::Delete(s) => exec_delete(self.open_db()?, s),
        }
    }

    fn open_db(&mut self) -> Result<&mut Database> {
        self.db.as_mut().ok_or(Error::NoDatabaseOpen)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Statement handlers ==========

fn exec_show_tables(db: &mut Database) -> Result<QueryResult> {
    let rows = db
        .list_tables()?
        .into_iter()
        .map(|name| vec![Value::Str(name)])
        .collect();
    Ok(QueryResult::Rows {
        columns: vec!["table".to_string()],
        rows,
    })
}

fn exec_create_table(db: &mut Database, stmt: CreateTableStatement) -> Result<QueryResult> {
    // an id INT column is prepended automatically
    let mut columns = vec![("id".to_string(), ColumnType::Int32)];
    columns.extend(stmt.columns.iter().map(|c| (c.name.clone(), c.ty)));
    let schema = TableSchema::new(&stmt.table_name, &columns)?;
    db.create_table(schema)?;
    Ok(QueryResult::Message(format!(
        "Table created: {}",
        stmt.table_name
    )))
}

fn exec_create_index(db: &mut Database, stmt: CreateIndexStatement) -> Result<QueryResult> {
    // the declared index name is ignored: files are named by table and
    // column
    db.create_index(&stmt.table_name, &stmt.column, DEFAULT_MIN_DEGREE)?;
    Ok(QueryResult::Message(format!(
        "Index created on {}.{}",
        stmt.table_name, stmt.column
    )))
}

fn exec_insert(db: &mut Database, stmt: InsertStatement) -> Result<QueryResult> {
    let schema = db.schema(&stmt.table_name)?;

    // unnamed columns get type defaults
    let mut row: Vec<Value> = schema
        .columns
        .iter()
        .map(|c| Value::default_for(&c.ty))
        .collect();

    let id_col = schema.column_index("id");
    let mut id_provided = false;
    for (name, literal) in stmt.columns.iter().zip(&stmt.values) {
        let ci = schema
            .column_index(name)
            .ok_or_else(|| Error::ColumnNotFound(name.clone(), stmt.table_name.clone()))?;
        row[ci] = planner::bind_literal(literal, &schema.columns[ci].ty, name)?;
        if id_col == Some(ci) {
            id_provided = true;
        }
    }

    // autoincrement from the physical count; ids of deleted rows can be
    // reissued
    if let Some(ci) = id_col {
        if !id_provided {
            let count = db.table_entry(&stmt.table_name)?.table.count()?;
            row[ci] = Value::Int(count + 1);
        }
    }

    let pid = db.insert_row(&stmt.table_name, &row)?;
    Ok(QueryResult::Message(format!(
        "Inserted page id {} into {}",
        pid, stmt.table_name
    )))
}

fn exec_select(db: &mut Database, stmt: SelectStatement) -> Result<QueryResult> {
    let schema = db.schema(&stmt.table_name)?;

    let proj: Vec<usize> = match &stmt.projection {
        Projection::Wildcard => {
            ensure_default_id_index(db, &stmt.table_name, &schema);
            (0..schema.column_count()).collect()
        }
        Projection::Columns(names) => names
            .iter()
            .map(|n| {
                schema
                    .column_index(n)
                    .ok_or_else(|| Error::ColumnNotFound(n.clone(), stmt.table_name.clone()))
            })
            .collect::<Result<_>>()?,
    };

    let pids = matching_page_ids(db, &stmt.table_name, &schema, stmt.where_clause.as_ref())?;

    let mut rows = Vec::with_capacity(pids.len());
    for pid in pids {
        let entry = db.table_entry(&stmt.table_name)?;
        let Some(row) = entry.table.read_row(pid)? else {
            continue;
        };
        rows.push(proj.iter().map(|&i| row[i].clone()).collect());
    }

    Ok(QueryResult::Rows {
        columns: proj
            .iter()
            .map(|&i| schema.columns[i].name.clone())
            .collect(),
        rows,
    })
}

fn exec_update(db: &mut Database, stmt: UpdateStatement) -> Result<QueryResult> {
    let schema = db.schema(&stmt.table_name)?;
    let pids = matching_page_ids(db, &stmt.table_name, &schema, stmt.where_clause.as_ref())?;

    let set_list: Vec<(String, Value)> = stmt
        .assignments
        .iter()
        .map(|(name, lit)| (name.clone(), literal_value(lit)))
        .collect();

    let n = db.update_rows_by_page_ids(&stmt.table_name, &pids, &set_list)?;
    Ok(QueryResult::Updated(n))
}

fn exec_delete(db: &mut Database, stmt: DeleteStatement) -> Result<QueryResult> {
    let schema = db.schema(&stmt.table_name)?;
    let pids = matching_page_ids(db, &stmt.table_name, &schema, stmt.where_clause.as_ref())?;

    let mut deleted = 0;
    for pid in pids {
        if db.delete_by_page_id(&stmt.table_name, pid)? {
            deleted += 1;
        }
    }
    Ok(QueryResult::Deleted(deleted))
}

// ========== Shared machinery ==========

/// Page ids of the rows matching a WHERE clause (all live rows when it is
/// absent): index probe or scan for candidates, then a full re-check of
/// every candidate row
fn matching_page_ids(
    db: &mut Database,
    table: &str,
    schema: &TableSchema,
    where_clause: Option<&WhereExpr>,
) -> Result<Vec<PageId>> {
    let count = db.table_entry(table)?.table.count()?;

    let candidates: Vec<PageId> = match where_clause {
        None => (0..count).collect(),
        Some(w) => match planner::candidate_page_ids(db, table, schema, &w.first)? {
            Some(mut pids) => {
                pids.sort_unstable();
                pids.dedup();
                pids
            }
            None => (0..count).collect(),
        },
    };

    let id_col = schema.column_index("id");
    let mut matched = Vec::new();
    for pid in candidates {
        let entry = db.table_entry(table)?;
        let Some(row) = entry.table.read_row(pid)? else {
            continue;
        };
        if let Some(i) = id_col {
            if row[i] == Value::Int(-1) {
                continue;
            }
        }
        let keep = match where_clause {
            None => true,
            Some(w) => eval_where(w, table, schema, &row)?,
        };
        if keep {
            matched.push(pid);
        }
    }
    Ok(matched)
}

fn eval_where(w: &WhereExpr, table: &str, schema: &TableSchema, row: &[Value]) -> Result<bool> {
    let first = eval_predicate(&w.first, table, schema, row)?;
    match &w.rest {
        None => Ok(first),
        Some((Connective::And, p2)) => Ok(first && eval_predicate(p2, table, schema, row)?),
        Some((Connective::Or, p2)) => Ok(first || eval_predicate(p2, table, schema, row)?),
    }
}

fn eval_predicate(
    pred: &Predicate,
    table: &str,
    schema: &TableSchema,
    row: &[Value],
) -> Result<bool> {
    let ci = schema
        .column_index(&pred.column)
        .ok_or_else(|| Error::ColumnNotFound(pred.column.clone(), table.to_string()))?;
    let rhs = planner::bind_literal(&pred.literal, &schema.columns[ci].ty, &pred.column)?;
    let ord = row[ci].compare(&rhs).ok_or_else(|| Error::TypeMismatch {
        column: pred.column.clone(),
        expected: schema.columns[ci].ty.to_string(),
        found: rhs.type_name().to_string(),
    })?;

    Ok(match pred.op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Neq => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Lte => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Gte => ord != Ordering::Less,
    })
}

/// A parsed literal as a value with its natural tag; column coercion
/// happens downstream
fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Integer(n) => Value::Int(*n as i32),
        Literal::Float(f) => Value::Float(*f as f32),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

/// Auto-create the default index on `id` the first time a table is
/// wildcard-selected, then make sure on-disk indexes are loaded
///
/// Failures are reported and swallowed: the side effect must never break
/// a SELECT.
fn ensure_default_id_index(db: &mut Database, table: &str, schema: &TableSchema) {
    let Some(col) = schema.column("id") else {
        return;
    };
    if col.ty != ColumnType::Int32 {
        return;
    }
    let path = db.root().join(table).join(format!("{}_id.bti", table));
    if !path.exists() {
        debug!("creating default id index on {}", table);
        if let Err(e) = db.create_index(table, "id", DEFAULT_MIN_DEGREE) {
            warn!("failed to create default id index on {}: {}", table, e);
        }
    }
    if let Err(e) = db.ensure_indices_loaded(table) {
        warn!("failed to load indexes for {}: {}", table, e);
    }
}
