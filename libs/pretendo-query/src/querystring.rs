//! Decodes the bracketed filter query-string syntax (§6/§4.1) into typed
//! query options: `page`, `perPage`, `sortBy`, `fields`, `expand`, and
//! per-field filters in either flat (`field=value`, implying `eq`) or
//! bracketed (`field[op]=value`) form. Grounded on the teacher's
//! `modkit::api::odata::extract_odata_query`, adapted from OData's
//! `$filter`/`$orderby` mini-language to this spec's simpler bracket syntax.

use serde_json::Value;
use std::fmt;

use crate::filter::{FilterClause, FilterOp, FilterValue};
use crate::paginate::PaginationParams;
use crate::sort::{SortDir, SortKey};

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub pagination: PaginationParams,
    pub sort: Vec<SortKey>,
    pub fields: Vec<String>,
    pub expand: Vec<String>,
    pub filters: Vec<FilterClause>,
}

#[derive(Debug, Clone)]
pub struct QueryParseError(pub String);

impl fmt::Display for QueryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid query string: {}", self.0)
    }
}

impl std::error::Error for QueryParseError {}

const RESERVED_KEYS: &[&str] = &["page", "perPage", "sortBy", "fields", "expand"];

fn parse_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    if raw == "true" {
        return Value::Bool(true);
    }
    if raw == "false" {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

fn parse_list(raw: &str) -> Vec<Value> {
    raw.split(',').map(parse_scalar).collect()
}

/// Splits `field[op]` into `(field, Some(op))`, or `field` into `(field, None)`.
fn split_bracket(key: &str) -> (&str, Option<&str>) {
    if let Some(open) = key.find('[') {
        if let Some(close) = key.rfind(']') {
            if close > open {
                return (&key[..open], Some(&key[open + 1..close]));
            }
        }
    }
    (key, None)
}

/// Strips a leading `i:` case-insensitivity marker from a field name.
fn split_case_insensitive(field: &str) -> (&str, bool) {
    match field.strip_prefix("i:") {
        Some(rest) => (rest, true),
        None => (field, false),
    }
}

pub fn parse_list_query(
    raw_query: &str,
    default_page_size: u64,
    max_page_size: u64,
) -> Result<ListQuery, QueryParseError> {
    let mut page: i64 = 1;
    let mut per_page: i64 = default_page_size as i64;
    let mut sort = Vec::new();
    let mut fields = Vec::new();
    let mut expand = Vec::new();
    let mut filters = Vec::new();

    for (key, value) in form_urlencoded::parse(raw_query.trim_start_matches('?').as_bytes()) {
        let key = key.as_ref();
        let value = value.as_ref();
        if value.is_empty() && key != "fields" && key != "expand" {
            continue;
        }

        match key {
            "page" => {
                page = value
                    .parse()
                    .map_err(|_| QueryParseError(format!("invalid page: {value}")))?;
            }
            "perPage" => {
                per_page = value
                    .parse()
                    .map_err(|_| QueryParseError(format!("invalid perPage: {value}")))?;
            }
            "sortBy" => {
                for part in value.split(',').filter(|p| !p.is_empty()) {
                    let (field, dir) = match part.rsplit_once('.') {
                        Some((f, "asc")) => (f, SortDir::Asc),
                        Some((f, "desc")) => (f, SortDir::Desc),
                        _ => (part, SortDir::Asc),
                    };
                    sort.push(SortKey::new(field, dir));
                }
            }
            "fields" => {
                fields = value
                    .split(',')
                    .filter(|p| !p.is_empty())
                    .map(|s| s.to_string())
                    .collect();
            }
            "expand" => {
                expand = value
                    .split(',')
                    .filter(|p| !p.is_empty())
                    .map(|s| s.to_string())
                    .collect();
            }
            raw_key if !RESERVED_KEYS.contains(&raw_key) => {
                let (key_no_ci, case_insensitive) = split_case_insensitive(raw_key);
                let (field, op_str) = split_bracket(key_no_ci);
                let op = match op_str {
                    Some(op_str) => FilterOp::parse(op_str)
                        .ok_or_else(|| QueryParseError(format!("unknown operator: {op_str}")))?,
                    None => FilterOp::Eq,
                };
                let filter_value = match op {
                    FilterOp::In | FilterOp::Nin => FilterValue::List(parse_list(value)),
                    _ => FilterValue::Scalar(parse_scalar(value)),
                };
                filters.push(
                    FilterClause::new(field, op, filter_value).case_insensitive(case_insensitive),
                );
            }
            _ => {}
        }
    }

    Ok(ListQuery {
        pagination: PaginationParams::clamp(page, per_page, default_page_size, max_page_size),
        sort,
        fields,
        expand,
        filters,
    })
}
