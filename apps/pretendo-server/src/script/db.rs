//! The reduced database façade exposed to custom-route scripts (§4.11):
//! `getResourceById`, `getResources`, `createResource`, `updateResource`,
//! `deleteResource`, `getRelatedResources`.

use std::sync::Arc;

use pretendo_db::Database;
use pretendo_errors::AppResult;
use pretendo_query::{
    paginate::PaginationParams,
    querystring::ListQuery,
    Record,
};
use pretendo_store::special_fields::SpecialFieldContext;
use serde_json::Value;

/// Synchronous façade over [`Database`]. Rhai scripts run on a blocking
/// thread (see [`crate::script::sandbox::RhaiSandbox`]), so every call here
/// bridges back into the async database through the current Tokio handle.
pub trait ScriptDb: Send + Sync {
    fn get_resource_by_id(&self, resource: &str, id: &str) -> Option<Record>;
    fn get_resources(&self, resource: &str) -> Vec<Record>;
    fn create_resource(&self, resource: &str, body: Record) -> AppResult<Record>;
    fn update_resource(&self, resource: &str, id: &str, body: Record) -> AppResult<Record>;
    fn delete_resource(&self, resource: &str, id: &str) -> AppResult<Record>;
    fn get_related_resources(&self, resource: &str, id: &str, relation: &str) -> AppResult<Value>;
}

pub struct DatabaseScriptDb {
    db: Arc<Database>,
    ctx: SpecialFieldContext,
}

impl DatabaseScriptDb {
    pub fn new(db: Arc<Database>, ctx: SpecialFieldContext) -> Self {
        Self { db, ctx }
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    }
}

impl ScriptDb for DatabaseScriptDb {
    fn get_resource_by_id(&self, resource: &str, id: &str) -> Option<Record> {
        self.db.find_by_id(resource, id, &[]).ok()
    }

    fn get_resources(&self, resource: &str) -> Vec<Record> {
        let query = ListQuery {
            pagination: PaginationParams { page: 1, per_page: i64::MAX },
            sort: Vec::new(),
            fields: Vec::new(),
            expand: Vec::new(),
            filters: Vec::new(),
        };
        self.db
            .list(resource, &query)
            .map(|(records, _meta)| records)
            .unwrap_or_default()
    }

    fn create_resource(&self, resource: &str, body: Record) -> AppResult<Record> {
        Self::block_on(self.db.create(resource, body, &self.ctx))
    }

    fn update_resource(&self, resource: &str, id: &str, body: Record) -> AppResult<Record> {
        Self::block_on(self.db.patch(resource, id, body, &self.ctx))
    }

    fn delete_resource(&self, resource: &str, id: &str) -> AppResult<Record> {
        Self::block_on(self.db.delete(resource, id))
    }

    fn get_related_resources(&self, resource: &str, id: &str, relation: &str) -> AppResult<Value> {
        let query = ListQuery {
            pagination: PaginationParams { page: 1, per_page: i64::MAX },
            sort: Vec::new(),
            fields: Vec::new(),
            expand: Vec::new(),
            filters: Vec::new(),
        };
        self.db.find_related(resource, id, relation, &query)
    }
}
