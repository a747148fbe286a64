//! Dotted-path, depth-bounded relationship expansion
//! (`author`, `author.profile`, `comments.user`).

use std::collections::HashMap;

use pretendo_config::{RelationshipConfig, RelationshipType};
use pretendo_errors::{AppError, AppResult};
use pretendo_query::Record;
use serde_json::Value;

/// Read access the expander needs into other collections. Implemented by
/// `pretendo-db::Database` so this crate stays free of the persistence layer.
pub trait RelatedLookup {
    fn get_by_id(&self, resource: &str, id: &Value) -> Option<Record>;
    fn find_by_field(&self, resource: &str, field: &str, value: &Value) -> Vec<Record>;
}

pub struct ExpansionSchema<'a> {
    pub relationships_by_resource: &'a HashMap<String, Vec<RelationshipConfig>>,
    pub primary_keys: &'a HashMap<String, String>,
}

const DEFAULT_MAX_DEPTH: usize = 3;

/// Expands every dotted path in `paths` on `record`, which belongs to
/// `resource`. Unknown relationship names in a path are ignored (the segment
/// is simply not expanded), matching a permissive `expand=` query parameter.
pub fn expand(
    resource: &str,
    record: &Record,
    paths: &[String],
    schema: &ExpansionSchema,
    lookup: &dyn RelatedLookup,
) -> AppResult<Record> {
    let mut result = record.clone();
    for path in paths {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.len() > DEFAULT_MAX_DEPTH {
            return Err(AppError::expansion_depth(format!(
                "expand path '{path}' exceeds the maximum depth of {DEFAULT_MAX_DEPTH}"
            )));
        }
        expand_segments(resource, &mut result, &segments, schema, lookup)?;
    }
    Ok(result)
}

fn expand_segments(
    resource: &str,
    record: &mut Record,
    segments: &[&str],
    schema: &ExpansionSchema,
    lookup: &dyn RelatedLookup,
) -> AppResult<()> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };

    let Some(rel) = schema
        .relationships_by_resource
        .get(resource)
        .and_then(|rels| rels.iter().find(|r| r.name == *head))
    else {
        return Ok(());
    };

    let own_primary_key = schema
        .primary_keys
        .get(resource)
        .map(String::as_str)
        .unwrap_or("id");

    match rel.rel_type {
        RelationshipType::BelongsTo => {
            let Some(fk_value) = record.get(&rel.foreign_key).cloned() else {
                return Ok(());
            };
            let mut related = lookup.get_by_id(&rel.resource, &fk_value);
            if let Some(ref mut nested) = related {
                if !rest.is_empty() {
                    expand_segments(&rel.resource, nested, rest, schema, lookup)?;
                }
            }
            record.insert(
                head.to_string(),
                related.map(|r| Value::Object(r)).unwrap_or(Value::Null),
            );
        }
        RelationshipType::HasOne => {
            let Some(own_id) = record.get(own_primary_key).cloned() else {
                return Ok(());
            };
            let mut matches = lookup.find_by_field(&rel.resource, &rel.foreign_key, &own_id);
            let mut nested = matches.drain(..).next();
            if let Some(ref mut n) = nested {
                if !rest.is_empty() {
                    expand_segments(&rel.resource, n, rest, schema, lookup)?;
                }
            }
            record.insert(
                head.to_string(),
                nested.map(Value::Object).unwrap_or(Value::Null),
            );
        }
        RelationshipType::HasMany => {
            let Some(own_id) = record.get(own_primary_key).cloned() else {
                return Ok(());
            };
            let mut matches = lookup.find_by_field(&rel.resource, &rel.foreign_key, &own_id);
            if !rest.is_empty() {
                for m in matches.iter_mut() {
                    expand_segments(&rel.resource, m, rest, schema, lookup)?;
                }
            }
            record.insert(
                head.to_string(),
                Value::Array(matches.into_iter().map(Value::Object).collect()),
            );
        }
        RelationshipType::ManyToMany => {
            let Some(own_id) = record.get(own_primary_key).cloned() else {
                return Ok(());
            };
            let Some(through) = &rel.through else {
                return Ok(());
            };
            let Some(target_key) = &rel.target_key else {
                return Ok(());
            };
            let joins = lookup.find_by_field(through, &rel.foreign_key, &own_id);
            let mut related = Vec::new();
            for join in joins {
                if let Some(target_id) = join.get(target_key) {
                    if let Some(mut target) = lookup.get_by_id(&rel.resource, target_id) {
                        if !rest.is_empty() {
                            expand_segments(&rel.resource, &mut target, rest, schema, lookup)?;
                        }
                        related.push(target);
                    }
                }
            }
            record.insert(
                head.to_string(),
                Value::Array(related.into_iter().map(Value::Object).collect()),
            );
        }
    }

    Ok(())
}
