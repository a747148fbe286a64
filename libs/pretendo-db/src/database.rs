//! Wires the store, the persistence adapter, and the relationship expander
//! into a single facade the server and the script sandbox both call through.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pretendo_config::{Action, PretendoConfig, RelationshipConfig};
use pretendo_errors::{AppError, AppResult};
use pretendo_persistence::{adapter::Snapshot, Adapter};
use pretendo_query::{
    filter::{apply_filters, FilterClause},
    paginate::{paginate, PaginationMeta},
    querystring::ListQuery,
    select::project_fields,
    sort::apply_sort,
    Record,
};
use pretendo_store::{
    expander::{self, ExpansionSchema, RelatedLookup},
    special_fields::{self, SpecialFieldContext},
    store::{ListResult, Store},
    validator::{self, Mode},
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::handle::ResourceHandle;

pub struct Database {
    config: Arc<PretendoConfig>,
    store: Store,
    adapter: Arc<dyn Adapter>,
    relationships_by_resource: HashMap<String, Vec<RelationshipConfig>>,
    primary_keys: HashMap<String, String>,
}

impl Database {
    /// Loads persisted state (falling back to configured seed data when
    /// nothing has been saved yet) and builds the relationship/primary-key
    /// index used by the expander and by id lookups.
    pub async fn init(config: Arc<PretendoConfig>, adapter: Arc<dyn Adapter>) -> AppResult<Self> {
        adapter.initialize().await?;
        let snapshot = adapter.load().await?;

        let store = Store::new();
        let mut relationships_by_resource = HashMap::new();
        let mut primary_keys = HashMap::new();

        for resource in &config.resources {
            store.ensure_collection(&resource.name);
            primary_keys.insert(resource.name.clone(), resource.primary_key.clone());
            relationships_by_resource.insert(resource.name.clone(), resource.relationships.clone());

            if let Some(rows) = snapshot.get(&resource.name) {
                store.seed(&resource.name, rows.clone());
            } else {
                store.seed(&resource.name, config.seed_for(&resource.name));
            }
        }

        Ok(Self {
            config,
            store,
            adapter,
            relationships_by_resource,
            primary_keys,
        })
    }

    pub fn resource(&self, name: &str) -> Option<ResourceHandle<'_>> {
        self.config.resource(name)?;
        Some(ResourceHandle::new(self, name.to_string()))
    }

    pub fn resource_exists(&self, name: &str) -> bool {
        self.config.resource(name).is_some()
    }

    pub fn primary_key_of(&self, resource: &str) -> &str {
        self.primary_keys
            .get(resource)
            .map(String::as_str)
            .unwrap_or("id")
    }

    pub fn access_for(&self, resource: &str, action: Action) -> Vec<String> {
        self.config
            .resource(resource)
            .and_then(|r| r.access.get(&action))
            .cloned()
            .unwrap_or_default()
    }

    pub fn owned_by_field(&self, resource: &str) -> Option<&str> {
        self.config
            .resource(resource)
            .and_then(|r| r.owned_by.as_deref())
    }

    pub fn config(&self) -> &PretendoConfig {
        &self.config
    }

    fn schema(&self) -> ExpansionSchema<'_> {
        ExpansionSchema {
            relationships_by_resource: &self.relationships_by_resource,
            primary_keys: &self.primary_keys,
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.store
            .collection_names()
            .into_iter()
            .map(|name| {
                let rows = self.store.all(&name);
                (name, rows)
            })
            .collect()
    }

    async fn persist(&self) -> AppResult<()> {
        self.adapter.save(&self.snapshot()).await
    }

    /// Spawns the autosave timer if the adapter is file-backed and autosave
    /// is enabled in configuration. The caller keeps the returned handle's
    /// cancellation token and cancels it at shutdown.
    pub fn spawn_autosave(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let db = Arc::clone(self);
        pretendo_persistence::autosave::spawn(self.adapter.clone(), interval, cancel, move || db.snapshot());
    }

    fn expand_if_requested(&self, resource: &str, record: Record, expand_paths: &[String]) -> AppResult<Record> {
        if expand_paths.is_empty() {
            return Ok(record);
        }
        expander::expand(resource, &record, expand_paths, &self.schema(), self)
    }

    pub fn list(&self, resource: &str, query: &ListQuery) -> AppResult<(Vec<Record>, PaginationMeta)> {
        let pk = self.primary_key_of(resource);
        let ListResult { records, meta } = self.store.query(
            resource,
            &query.filters,
            &query.sort,
            query.pagination,
            &query.fields,
            pk,
        );
        let records = records
            .into_iter()
            .map(|r| self.expand_if_requested(resource, r, &query.expand))
            .collect::<AppResult<Vec<_>>>()?;
        Ok((records, meta))
    }

    pub fn find_by_id(&self, resource: &str, id: &str, expand_paths: &[String]) -> AppResult<Record> {
        let pk = self.primary_key_of(resource);
        let record = self
            .store
            .get_by_id(resource, pk, id)
            .ok_or_else(|| AppError::not_found(format!("{resource} {id} not found")))?;
        self.expand_if_requested(resource, record, expand_paths)
    }

    pub fn find_one(&self, resource: &str, filters: &[FilterClause]) -> AppResult<Record> {
        self.store
            .find_one(resource, filters)
            .ok_or_else(|| AppError::not_found(format!("no matching {resource} record")))
    }

    pub async fn create(&self, resource: &str, mut body: Record, ctx: &SpecialFieldContext) -> AppResult<Record> {
        let schema = self
            .config
            .resource(resource)
            .ok_or_else(|| AppError::not_found(format!("resource {resource} not configured")))?;
        let pk = &schema.primary_key;

        special_fields::apply(&self.store, resource, &schema.fields, &mut body, ctx, Mode::Create);

        if !body.contains_key(pk) || body.get(pk).is_some_and(Value::is_null) {
            let next = self.store.next_integer_id(resource, pk);
            body.insert(pk.clone(), Value::from(next));
        } else {
            let id_str = match body.get(pk).unwrap() {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if self.store.get_by_id(resource, pk, &id_str).is_some() {
                return Err(AppError::conflict(format!("{resource} with {pk} {id_str} already exists")));
            }
        }

        validator::validate(&self.store, resource, pk, &schema.fields, &body, Mode::Create, None)?;

        self.store.insert(resource, body.clone());
        self.persist().await?;
        Ok(body)
    }

    pub async fn replace(
        &self,
        resource: &str,
        id: &str,
        mut body: Record,
        ctx: &SpecialFieldContext,
    ) -> AppResult<Record> {
        let schema = self
            .config
            .resource(resource)
            .ok_or_else(|| AppError::not_found(format!("resource {resource} not configured")))?;
        let pk = &schema.primary_key;

        special_fields::apply(&self.store, resource, &schema.fields, &mut body, ctx, Mode::Update);
        validator::validate(&self.store, resource, pk, &schema.fields, &body, Mode::Update, Some(id))?;

        let mut preserve: Vec<&str> = vec![pk.as_str()];
        if let Some(owned_by) = &schema.owned_by {
            preserve.push(owned_by.as_str());
        }
        let result = self.store.replace(resource, pk, id, body, &preserve)?;
        self.persist().await?;
        Ok(result)
    }

    pub async fn patch(
        &self,
        resource: &str,
        id: &str,
        mut body: Record,
        ctx: &SpecialFieldContext,
    ) -> AppResult<Record> {
        let schema = self
            .config
            .resource(resource)
            .ok_or_else(|| AppError::not_found(format!("resource {resource} not configured")))?;
        let pk = &schema.primary_key;

        special_fields::apply(&self.store, resource, &schema.fields, &mut body, ctx, Mode::Update);

        let touched_fields: Vec<_> = schema
            .fields
            .iter()
            .filter(|f| body.contains_key(&f.name))
            .cloned()
            .collect();
        validator::validate(&self.store, resource, pk, &touched_fields, &body, Mode::Update, Some(id))?;

        let result = self.store.patch(resource, pk, id, &body)?;
        self.persist().await?;
        Ok(result)
    }

    pub async fn delete(&self, resource: &str, id: &str) -> AppResult<Record> {
        let pk = self.primary_key_of(resource).to_string();
        let removed = self.store.delete(resource, &pk, id)?;
        let owner_id = removed.get(&pk).cloned().unwrap_or(Value::Null);

        if let Some(relationships) = self.relationships_by_resource.get(resource) {
            use pretendo_config::RelationshipType::*;
            for rel in relationships {
                if matches!(rel.rel_type, HasMany | HasOne) {
                    self.store.cascade_delete(&rel.resource, &rel.foreign_key, &owner_id);
                }
            }
        }

        self.persist().await?;
        Ok(removed)
    }

    /// Per spec §4.1 `find-related`: fetches the records related to `id`
    /// through `relation_name`, then applies `query`'s filters/sort/pagination
    /// (and field projection) exactly as `list` would for a top-level query.
    /// Applies only to list-shaped (`hasMany`/`manyToMany`) relations; a
    /// `belongsTo`/`hasOne` relation yields a single record or null, to which
    /// those options don't apply.
    pub fn find_related(&self, resource: &str, id: &str, relation_name: &str, query: &ListQuery) -> AppResult<Value> {
        let record = self.find_by_id(resource, id, &[])?;
        let expanded = expander::expand(resource, &record, &[relation_name.to_string()], &self.schema(), self)?;
        let related = expanded.get(relation_name).cloned().unwrap_or(Value::Null);

        let Value::Array(items) = related else {
            return Ok(related);
        };

        let target_resource = self
            .relationships_by_resource
            .get(resource)
            .and_then(|rels| rels.iter().find(|r| r.name == relation_name))
            .map(|r| r.resource.clone());
        let target_pk = target_resource
            .as_deref()
            .map(|r| self.primary_key_of(r).to_string())
            .unwrap_or_else(|| "id".to_string());

        let mut records: Vec<Record> = items
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();

        records = apply_filters(&records, &query.filters).into_iter().cloned().collect();
        apply_sort(&mut records, &query.sort);
        let (page_records, _meta) = paginate(records, query.pagination);
        let page_records = if query.fields.is_empty() {
            page_records
        } else {
            page_records
                .iter()
                .map(|r| project_fields(r, &query.fields, &target_pk))
                .collect()
        };

        Ok(Value::Array(page_records.into_iter().map(Value::Object).collect()))
    }

    pub async fn reset_all(&self) -> AppResult<()> {
        for resource in &self.config.resources {
            self.store.seed(&resource.name, self.config.seed_for(&resource.name));
        }
        self.adapter.reset().await?;
        self.persist().await
    }

    pub async fn backup(&self) -> AppResult<String> {
        self.adapter.backup(&self.snapshot()).await
    }

    pub async fn restore(&self, backup_id: &str) -> AppResult<()> {
        let snapshot = self.adapter.restore(backup_id).await?;
        for (resource, rows) in snapshot {
            self.store.seed(&resource, rows);
        }
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<pretendo_persistence::adapter::AdapterStats> {
        self.adapter.stats(&self.snapshot()).await
    }
}

impl RelatedLookup for Database {
    fn get_by_id(&self, resource: &str, id: &Value) -> Option<Record> {
        let pk = self.primary_key_of(resource);
        let id_str = match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.store.get_by_id(resource, pk, &id_str)
    }

    fn find_by_field(&self, resource: &str, field: &str, value: &Value) -> Vec<Record> {
        self.store.find_by_field(resource, field, value)
    }
}
