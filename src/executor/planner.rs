//! Trivial query planning
//!
//! The first predicate of a WHERE clause is the drive predicate: when its
//! column has an index, the planner turns the comparison into a point or
//! range probe and returns candidate page ids; otherwise the caller falls
//! back to scanning `[0, count)`. Every candidate is re-checked against
//! the full expression afterwards.

use crate::catalog::{ColumnType, TableSchema};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::sql::ast::{CompareOp, Literal, Predicate};
use crate::storage::btree::{byte_predecessor, byte_successor, BTree};
use crate::storage::{Char32Key, KeyCodec, PageId, Value};

/// Upper bound for CHAR range probes; keys above `"\x7F"` are outside the
/// probe's reach
const CHAR_HI: &str = "\x7F";

/// Bind a parsed literal to a column's type
///
/// Numeric literals land as the column's numeric kind and numerics render
/// to CHAR as decimal strings; a string literal never binds to a numeric
/// column.
pub(crate) fn bind_literal(lit: &Literal, ty: &ColumnType, column: &str) -> Result<Value> {
    let value = match (lit, ty) {
        (Literal::Integer(n), ColumnType::Int32) => Value::Int(*n as i32),
        (Literal::Float(f), ColumnType::Int32) => Value::Int(f.round() as i32),
        (Literal::Integer(n), ColumnType::Float32) => Value::Float(*n as f32),
        (Literal::Float(f), ColumnType::Float32) => Value::Float(*f as f32),
        (Literal::Str(s), ColumnType::Char(_)) => Value::Str(s.clone()),
        (Literal::Integer(n), ColumnType::Char(_)) => Value::Str(n.to_string()),
        (Literal::Float(f), ColumnType::Char(_)) => Value::Str(f.to_string()),
        (Literal::Str(_), _) => {
            return Err(Error::TypeMismatch {
                column: column.to_string(),
                expected: ty.to_string(),
                found: "CHAR".to_string(),
            })
        }
    };
    Ok(value)
}

/// Candidate page ids from an index probe of the drive predicate, or None
/// when its column carries no index
pub(crate) fn candidate_page_ids(
    db: &mut Database,
    table: &str,
    schema: &TableSchema,
    pred: &Predicate,
) -> Result<Option<Vec<PageId>>> {
    let col = schema
        .column(&pred.column)
        .ok_or_else(|| Error::ColumnNotFound(pred.column.clone(), table.to_string()))?;
    let ty = col.ty;

    db.ensure_indices_loaded(table)?;
    let entry = db.table_entry(table)?;
    if !entry.has_index(&pred.column) {
        return Ok(None);
    }
    let key = bind_literal(&pred.literal, &ty, &pred.column)?;

    let pids = match ty {
        ColumnType::Int32 => {
            let idx = entry
                .int_index(&pred.column)
                .ok_or_else(|| Error::IndexNotFound(table.to_string(), pred.column.clone()))?;
            let k = key.as_int().unwrap();
            match pred.op {
                CompareOp::Eq => idx.search(&k)?.into_iter().collect(),
                CompareOp::Gte => idx.range_values(&k, &i32::MAX)?,
                CompareOp::Lte => idx.range_values(&i32::MIN, &k)?,
                CompareOp::Gt => {
                    if k == i32::MAX {
                        Vec::new()
                    } else {
                        idx.range_values(&(k + 1), &i32::MAX)?
                    }
                }
                CompareOp::Lt => {
                    if k == i32::MIN {
                        Vec::new()
                    } else {
                        idx.range_values(&i32::MIN, &(k - 1))?
                    }
                }
                CompareOp::Neq => {
                    let mut out = if k == i32::MIN {
                        Vec::new()
                    } else {
                        idx.range_values(&i32::MIN, &(k - 1))?
                    };
                    if k != i32::MAX {
                        out.extend(idx.range_values(&(k + 1), &i32::MAX)?);
                    }
                    out
                }
            }
        }
        ColumnType::Float32 => {
            let idx = entry
                .float_index(&pred.column)
                .ok_or_else(|| Error::IndexNotFound(table.to_string(), pred.column.clone()))?;
            let k = key.as_float().unwrap();
            match pred.op {
                CompareOp::Eq => idx.search(&k)?.into_iter().collect(),
                CompareOp::Gte => idx.range_values(&k, &f32::INFINITY)?,
                CompareOp::Lte => idx.range_values(&f32::NEG_INFINITY, &k)?,
                CompareOp::Gt => idx.range_values(&k.next_up(), &f32::INFINITY)?,
                CompareOp::Lt => idx.range_values(&f32::NEG_INFINITY, &k.next_down())?,
                CompareOp::Neq => {
                    let mut out = idx.range_values(&f32::NEG_INFINITY, &k.next_down())?;
                    out.extend(idx.range_values(&k.next_up(), &f32::INFINITY)?);
                    out
                }
            }
        }
        ColumnType::Char(_) => {
            let idx = entry
                .char_index(&pred.column)
                .ok_or_else(|| Error::IndexNotFound(table.to_string(), pred.column.clone()))?;
            let s = key.as_str().unwrap().to_string();
            match pred.op {
                CompareOp::Eq => idx.search(&s)?.into_iter().collect(),
                CompareOp::Gte => idx.range_values(&s, &CHAR_HI.to_string())?,
                CompareOp::Lte => idx.range_values(&String::new(), &s)?,
                CompareOp::Gt => char_range_above(idx, &s)?,
                CompareOp::Lt => char_range_below(idx, &s)?,
                CompareOp::Neq => {
                    let mut out = char_range_below(idx, &s)?;
                    out.extend(char_range_above(idx, &s)?);
                    out
                }
            }
        }
    };
    Ok(Some(pids))
}

/// Strict range above a CHAR key: probe from the byte-level successor of
/// the encoded key so equal keys stay out
fn char_range_above(idx: &mut BTree<Char32Key>, s: &str) -> Result<Vec<PageId>> {
    let mut lo = [0u8; 32];
    Char32Key::encode(&s.to_string(), &mut lo);
    if !byte_successor(&mut lo) {
        return Ok(Vec::new());
    }
    let mut hi = [0u8; 32];
    Char32Key::encode(&CHAR_HI.to_string(), &mut hi);
    idx.range_values_encoded(&lo, &hi)
}

/// Strict range below a CHAR key via the byte-level predecessor of the
/// encoded key
fn char_range_below(idx: &mut BTree<Char32Key>, s: &str) -> Result<Vec<PageId>> {
    let mut hi = [0u8; 32];
    Char32Key::encode(&s.to_string(), &mut hi);
    if !byte_predecessor(&mut hi) {
        return Ok(Vec::new());
    }
    let lo = [0u8; 32];
    idx.range_values_encoded(&lo, &hi)
}
