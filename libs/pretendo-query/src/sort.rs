//! Stable, multi-key sort with the spec's null-ordering policy: nulls/missing
//! sort first in `asc`, last in `desc`.

use serde_json::Value;
use std::cmp::Ordering;

use crate::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

impl SortKey {
    pub fn new(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            field: field.into(),
            dir,
        }
    }
}

fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Stable multi-key sort in place. Nulls/missing sort first ascending, last
/// descending, regardless of how many keys are given.
pub fn apply_sort(records: &mut [Record], keys: &[SortKey]) {
    records.sort_by(|a, b| {
        for key in keys {
            let av = a.get(&key.field);
            let bv = b.get(&key.field);
            let ord = match (av, bv) {
                (None, None) | (Some(Value::Null), Some(Value::Null)) => Ordering::Equal,
                (None, Some(Value::Null)) | (Some(Value::Null), None) => Ordering::Equal,
                (None, Some(_)) | (Some(Value::Null), Some(_)) => {
                    if key.dir == SortDir::Asc {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    }
                }
                (Some(_), None) | (Some(_), Some(Value::Null)) => {
                    if key.dir == SortDir::Asc {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                }
                (Some(av), Some(bv)) => {
                    let base = value_cmp(av, bv);
                    if key.dir == SortDir::Desc {
                        base.reverse()
                    } else {
                        base
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
