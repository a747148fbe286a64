//! The record store: one `RwLock<Vec<Record>>` per collection behind a
//! `DashMap`, so unrelated collections never contend on the same lock
//! (Design Notes §9 / Concurrency §5).

use dashmap::DashMap;
use parking_lot::RwLock;
use pretendo_errors::{AppError, AppResult};
use pretendo_query::{
    filter::{apply_filters, FilterClause},
    paginate::{paginate, PaginationMeta, PaginationParams},
    select::project_fields,
    sort::{apply_sort, SortKey},
    Record,
};
use serde_json::Value;

use crate::idkey::matches_id;

pub struct Store {
    collections: DashMap<String, RwLock<Vec<Record>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub records: Vec<Record>,
    pub meta: PaginationMeta,
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }

    /// Creates the collection (empty) if it doesn't exist yet.
    pub fn ensure_collection(&self, resource: &str) {
        self.collections
            .entry(resource.to_string())
            .or_insert_with(|| RwLock::new(Vec::new()));
    }

    /// Replaces a collection's contents wholesale (used for seeding and reset).
    pub fn seed(&self, resource: &str, records: Vec<Record>) {
        self.collections
            .entry(resource.to_string())
            .or_insert_with(|| RwLock::new(Vec::new()))
            .write()
            .clone_from(&records);
    }

    pub fn reset(&self, resource: &str) {
        if let Some(coll) = self.collections.get(resource) {
            coll.write().clear();
        }
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.iter().map(|e| e.key().clone()).collect()
    }

    /// Returns every record in the collection (deep copies), unfiltered.
    pub fn all(&self, resource: &str) -> Vec<Record> {
        match self.collections.get(resource) {
            Some(coll) => coll.read().clone(),
            None => Vec::new(),
        }
    }

    pub fn query(
        &self,
        resource: &str,
        filters: &[FilterClause],
        sort: &[SortKey],
        pagination: PaginationParams,
        fields: &[String],
        primary_key: &str,
    ) -> ListResult {
        let all = self.all(resource);
        let filtered: Vec<Record> = apply_filters(&all, filters).into_iter().cloned().collect();
        let mut filtered = filtered;
        apply_sort(&mut filtered, sort);
        let (page_records, meta) = paginate(filtered, pagination);
        let records = if fields.is_empty() {
            page_records
        } else {
            page_records
                .iter()
                .map(|r| project_fields(r, fields, primary_key))
                .collect()
        };
        ListResult { records, meta }
    }

    pub fn get_by_id(&self, resource: &str, primary_key: &str, id: &str) -> Option<Record> {
        let coll = self.collections.get(resource)?;
        let guard = coll.read();
        guard
            .iter()
            .find(|r| r.get(primary_key).is_some_and(|v| matches_id(v, id)))
            .cloned()
    }

    pub fn find_one(
        &self,
        resource: &str,
        filters: &[FilterClause],
    ) -> Option<Record> {
        let all = self.all(resource);
        apply_filters(&all, filters).into_iter().next().cloned()
    }

    /// Finds records whose `field` loosely equals `value` (used by the
    /// relationship expander and `hasMany`/`hasOne` lookups).
    pub fn find_by_field(&self, resource: &str, field: &str, value: &Value) -> Vec<Record> {
        use crate::idkey::loose_eq;
        self.all(resource)
            .into_iter()
            .filter(|r| r.get(field).is_some_and(|v| loose_eq(v, value)))
            .collect()
    }

    pub fn insert(&self, resource: &str, record: Record) {
        self.collections
            .entry(resource.to_string())
            .or_insert_with(|| RwLock::new(Vec::new()))
            .write()
            .push(record);
    }

    /// Returns the next integer primary key: one greater than the maximum
    /// existing integer value of `primary_key`, or 1 if none exist or none
    /// parse as integers (Invariant 1).
    pub fn next_integer_id(&self, resource: &str, primary_key: &str) -> i64 {
        let max = self
            .all(resource)
            .iter()
            .filter_map(|r| r.get(primary_key).and_then(Value::as_i64))
            .max();
        max.map(|m| m + 1).unwrap_or(1)
    }

    /// Replaces the record matching `id`, keeping the old value whenever
    /// `preserve` returns `Some` for a field absent from `replacement`.
    pub fn replace(
        &self,
        resource: &str,
        primary_key: &str,
        id: &str,
        mut replacement: Record,
        preserve_fields: &[&str],
    ) -> AppResult<Record> {
        let coll = self
            .collections
            .get(resource)
            .ok_or_else(|| AppError::not_found(format!("resource {resource} not found")))?;
        let mut guard = coll.write();
        let idx = guard
            .iter()
            .position(|r| r.get(primary_key).is_some_and(|v| matches_id(v, id)))
            .ok_or_else(|| AppError::not_found(format!("{resource} {id} not found")))?;

        let existing = guard[idx].clone();
        for field in preserve_fields {
            if !replacement.contains_key(*field) {
                if let Some(v) = existing.get(*field) {
                    replacement.insert((*field).to_string(), v.clone());
                }
            }
        }
        guard[idx] = replacement.clone();
        Ok(replacement)
    }

    pub fn patch(
        &self,
        resource: &str,
        primary_key: &str,
        id: &str,
        patch: &Record,
    ) -> AppResult<Record> {
        let coll = self
            .collections
            .get(resource)
            .ok_or_else(|| AppError::not_found(format!("resource {resource} not found")))?;
        let mut guard = coll.write();
        let idx = guard
            .iter()
            .position(|r| r.get(primary_key).is_some_and(|v| matches_id(v, id)))
            .ok_or_else(|| AppError::not_found(format!("{resource} {id} not found")))?;

        for (k, v) in patch {
            guard[idx].insert(k.clone(), v.clone());
        }
        Ok(guard[idx].clone())
    }

    pub fn delete(&self, resource: &str, primary_key: &str, id: &str) -> AppResult<Record> {
        let coll = self
            .collections
            .get(resource)
            .ok_or_else(|| AppError::not_found(format!("resource {resource} not found")))?;
        let mut guard = coll.write();
        let idx = guard
            .iter()
            .position(|r| r.get(primary_key).is_some_and(|v| matches_id(v, id)))
            .ok_or_else(|| AppError::not_found(format!("{resource} {id} not found")))?;
        Ok(guard.remove(idx))
    }

    /// Removes every record in `resource` whose `foreign_key` loosely equals
    /// `owner_id` (single-level cascade delete, Invariant 5).
    pub fn cascade_delete(&self, resource: &str, foreign_key: &str, owner_id: &Value) -> usize {
        use crate::idkey::loose_eq;
        let Some(coll) = self.collections.get(resource) else {
            return 0;
        };
        let mut guard = coll.write();
        let before = guard.len();
        guard.retain(|r| !r.get(foreign_key).is_some_and(|v| loose_eq(v, owner_id)));
        before - guard.len()
    }

    pub fn is_unique(
        &self,
        resource: &str,
        field: &str,
        value: &Value,
        primary_key: &str,
        exclude_id: Option<&str>,
    ) -> bool {
        use crate::idkey::loose_eq;
        !self.all(resource).iter().any(|r| {
            let same_value = r.get(field).is_some_and(|v| loose_eq(v, value));
            if !same_value {
                return false;
            }
            match exclude_id {
                Some(id) => !r.get(primary_key).is_some_and(|v| matches_id(v, id)),
                None => true,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretendo_query::filter::{FilterClause, FilterOp, FilterValue};
    use serde_json::json;

    fn rec(id: i64, name: &str) -> Record {
        let mut m = Record::new();
        m.insert("id".into(), json!(id));
        m.insert("name".into(), json!(name));
        m
    }

    #[test]
    fn next_integer_id_picks_max_plus_one() {
        let store = Store::new();
        store.seed("widgets", vec![rec(1, "a"), rec(5, "b")]);
        assert_eq!(store.next_integer_id("widgets", "id"), 6);
    }

    #[test]
    fn next_integer_id_starts_at_one_for_empty_collection() {
        let store = Store::new();
        store.ensure_collection("widgets");
        assert_eq!(store.next_integer_id("widgets", "id"), 1);
    }

    #[test]
    fn get_by_id_matches_numeric_primary_key_against_string_param() {
        let store = Store::new();
        store.seed("widgets", vec![rec(7, "gadget")]);
        let found = store.get_by_id("widgets", "id", "7").unwrap();
        assert_eq!(found.get("name").unwrap(), "gadget");
    }

    #[test]
    fn replace_preserves_fields_absent_from_body() {
        let store = Store::new();
        let mut r = rec(1, "a");
        r.insert("ownerId".into(), json!(99));
        store.seed("widgets", vec![r]);

        let mut replacement = Record::new();
        replacement.insert("name".into(), json!("b"));
        let result = store
            .replace("widgets", "id", "1", replacement, &["id", "ownerId"])
            .unwrap();
        assert_eq!(result.get("id").unwrap(), 1);
        assert_eq!(result.get("ownerId").unwrap(), 99);
        assert_eq!(result.get("name").unwrap(), "b");
    }

    #[test]
    fn cascade_delete_removes_dependent_records_only() {
        let store = Store::new();
        let mut c1 = Record::new();
        c1.insert("id".into(), json!(1));
        c1.insert("postId".into(), json!(5));
        let mut c2 = Record::new();
        c2.insert("id".into(), json!(2));
        c2.insert("postId".into(), json!(6));
        store.seed("comments", vec![c1, c2]);

        let removed = store.cascade_delete("comments", "postId", &json!(5));
        assert_eq!(removed, 1);
        assert_eq!(store.all("comments").len(), 1);
    }

    #[test]
    fn is_unique_excludes_record_being_updated() {
        let store = Store::new();
        store.seed("users", vec![rec(1, "alice")]);
        assert!(!store.is_unique("users", "name", &json!("alice"), "id", None));
        assert!(store.is_unique("users", "name", &json!("alice"), "id", Some("1")));
    }

    #[test]
    fn query_applies_filter_sort_and_pagination() {
        let store = Store::new();
        store.seed(
            "widgets",
            vec![rec(1, "b"), rec(2, "a"), rec(3, "c")],
        );
        let sort = vec![SortKey::new("name", pretendo_query::sort::SortDir::Asc)];
        let result = store.query(
            "widgets",
            &[],
            &sort,
            PaginationParams::clamp(1, 2, 10, 100),
            &[],
            "id",
        );
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].get("name").unwrap(), "a");
        assert_eq!(result.meta.total_items, 3);
    }

    #[test]
    fn query_filters_before_paginating() {
        let store = Store::new();
        store.seed("widgets", vec![rec(1, "a"), rec(2, "b")]);
        let clause = FilterClause::new("name", FilterOp::Eq, FilterValue::Scalar(json!("b")));
        let result = store.query(
            "widgets",
            &[clause],
            &[],
            PaginationParams::clamp(1, 10, 10, 100),
            &[],
            "id",
        );
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.meta.total_items, 1);
    }
}
