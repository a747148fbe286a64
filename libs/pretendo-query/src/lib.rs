//! Pure transforms over record sequences: filter, sort, paginate, project.
//!
//! Grounded on the teacher's `odata-core` crate (a small, dependency-light AST +
//! page type living next to the rest of the query stack) and on
//! `modkit::api::odata`'s query-string extraction, adapted here from a
//! SQL-compiling OData dialect to direct in-memory predicate evaluation over
//! JSON-shaped [`Record`]s, since the store this crate serves is an in-memory
//! collection rather than a SQL table.

pub mod filter;
pub mod paginate;
pub mod querystring;
pub mod select;
pub mod sort;

use serde_json::Value;

/// A record is an ordered JSON object. Order is preserved (via serde_json's
/// `preserve_order` feature) so responses echo field order as configured.
pub type Record = serde_json::Map<String, Value>;

pub use filter::{FilterClause, FilterOp, FilterValue};
pub use paginate::{paginate, PaginationMeta, PaginationParams};
pub use querystring::{parse_list_query, ListQuery, QueryParseError};
pub use select::project_fields;
pub use sort::{apply_sort, SortDir, SortKey};
