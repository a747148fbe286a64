//! A thin, resource-scoped view over [`Database`] so callers (route handlers,
//! the script sandbox) don't have to repeat the resource name on every call.

use pretendo_errors::AppResult;
use pretendo_query::{filter::FilterClause, paginate::PaginationMeta, querystring::ListQuery, Record};
use pretendo_store::special_fields::SpecialFieldContext;
use serde_json::Value;

use crate::database::Database;

pub struct ResourceHandle<'a> {
    db: &'a Database,
    resource: String,
}

impl<'a> ResourceHandle<'a> {
    pub(crate) fn new(db: &'a Database, resource: String) -> Self {
        Self { db, resource }
    }

    pub fn name(&self) -> &str {
        &self.resource
    }

    pub fn find_all(&self, query: &ListQuery) -> AppResult<(Vec<Record>, PaginationMeta)> {
        self.db.list(&self.resource, query)
    }

    pub fn find_by_id(&self, id: &str, expand: &[String]) -> AppResult<Record> {
        self.db.find_by_id(&self.resource, id, expand)
    }

    pub fn find_one(&self, filters: &[FilterClause]) -> AppResult<Record> {
        self.db.find_one(&self.resource, filters)
    }

    pub async fn create(&self, body: Record, ctx: &SpecialFieldContext) -> AppResult<Record> {
        self.db.create(&self.resource, body, ctx).await
    }

    pub async fn replace(&self, id: &str, body: Record, ctx: &SpecialFieldContext) -> AppResult<Record> {
        self.db.replace(&self.resource, id, body, ctx).await
    }

    pub async fn patch(&self, id: &str, body: Record, ctx: &SpecialFieldContext) -> AppResult<Record> {
        self.db.patch(&self.resource, id, body, ctx).await
    }

    pub async fn delete(&self, id: &str) -> AppResult<Record> {
        self.db.delete(&self.resource, id).await
    }

    pub fn find_related(&self, id: &str, relation_name: &str, query: &ListQuery) -> AppResult<Value> {
        self.db.find_related(&self.resource, id, relation_name, query)
    }
}
