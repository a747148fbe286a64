//! Filter operators (§4.1 of the spec): `eq, ne, gt, gte, lt, lte, in, nin,
//! contains, startsWith, endsWith`, all case-sensitive by default with an
//! optional per-clause case-insensitive flag.

use serde_json::Value;

use crate::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
    StartsWith,
    EndsWith,
}

impl FilterOp {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            "nin" => FilterOp::Nin,
            "contains" => FilterOp::Contains,
            "startsWith" => FilterOp::StartsWith,
            "endsWith" => FilterOp::EndsWith,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum FilterValue {
    Scalar(Value),
    List(Vec<Value>),
}

#[derive(Debug, Clone)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
    pub case_insensitive: bool,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
            case_insensitive: false,
        }
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }
}

fn lower(v: &Value) -> Value {
    match v {
        Value::String(s) => Value::String(s.to_lowercase()),
        Value::Array(arr) => Value::Array(arr.iter().map(lower).collect()),
        other => other.clone(),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64()
}

fn cmp_numeric(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    let (a, b) = (as_f64(lhs)?, as_f64(rhs)?);
    a.partial_cmp(&b)
}

fn is_absent(v: Option<&Value>) -> bool {
    matches!(v, None | Some(Value::Null))
}

/// Evaluates a single clause against a record's field value.
pub fn matches(record: &Record, clause: &FilterClause) -> bool {
    let raw_field_value = record.get(&clause.field);

    let field_value = if clause.case_insensitive {
        raw_field_value.map(lower)
    } else {
        raw_field_value.cloned()
    };

    let compare_value = |v: &Value| -> Value {
        if clause.case_insensitive {
            lower(v)
        } else {
            v.clone()
        }
    };

    match clause.op {
        FilterOp::Eq => match (&field_value, &clause.value) {
            (None, _) | (Some(Value::Null), _) => false,
            (Some(fv), FilterValue::Scalar(target)) => *fv == compare_value(target),
            (Some(_), FilterValue::List(_)) => false,
        },
        FilterOp::Ne => match (&field_value, &clause.value) {
            (None, _) | (Some(Value::Null), _) => true,
            (Some(fv), FilterValue::Scalar(target)) => *fv != compare_value(target),
            (Some(_), FilterValue::List(_)) => true,
        },
        FilterOp::In => match (&field_value, &clause.value) {
            (None, _) | (Some(Value::Null), _) => false,
            (Some(fv), FilterValue::List(list)) => {
                list.iter().any(|item| *fv == compare_value(item))
            }
            (Some(fv), FilterValue::Scalar(target)) => *fv == compare_value(target),
        },
        FilterOp::Nin => match (&field_value, &clause.value) {
            (None, _) | (Some(Value::Null), _) => true,
            (Some(fv), FilterValue::List(list)) => {
                !list.iter().any(|item| *fv == compare_value(item))
            }
            (Some(fv), FilterValue::Scalar(target)) => *fv != compare_value(target),
        },
        FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
            let target = match &clause.value {
                FilterValue::Scalar(v) => v,
                FilterValue::List(_) => return false,
            };
            let fv = match &field_value {
                Some(v) => v,
                None => return false,
            };
            let Some(ord) = cmp_numeric(fv, target) else {
                return false;
            };
            match clause.op {
                FilterOp::Gt => ord.is_gt(),
                FilterOp::Gte => ord.is_ge(),
                FilterOp::Lt => ord.is_lt(),
                FilterOp::Lte => ord.is_le(),
                _ => unreachable!(),
            }
        }
        FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith => {
            if is_absent(raw_field_value) {
                return false;
            }
            let (Some(Value::String(fv)), FilterValue::Scalar(Value::String(target))) =
                (&field_value, &clause.value)
            else {
                return false;
            };
            let target = if clause.case_insensitive {
                target.to_lowercase()
            } else {
                target.clone()
            };
            match clause.op {
                FilterOp::Contains => fv.contains(&target),
                FilterOp::StartsWith => fv.starts_with(&target),
                FilterOp::EndsWith => fv.ends_with(&target),
                _ => unreachable!(),
            }
        }
    }
}

/// Applies all clauses with AND semantics, returning references to matching records.
pub fn apply_filters<'a>(records: &'a [Record], clauses: &[FilterClause]) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| clauses.iter().all(|c| matches(r, c)))
        .collect()
}
