//! Default sandbox for the "script" custom-route subtype (§4.11): `rhai`, a
//! pure-Rust embeddable scripting language with no ambient OS/network/
//! filesystem access, chosen over in-process `eval` per Design Notes §9's
//! explicit call for a sandbox.
//!
//! Each request gets a fresh [`rhai::Scope`] and a fresh `Engine` run, so
//! globals set by one request are never observable by another.

use std::collections::HashMap;
use std::sync::Arc;

use pretendo_errors::AppError;
use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;

use super::db::ScriptDb;

#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub method: String,
    pub path: String,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ScriptResponse {
    pub status: u16,
    pub body: Value,
}

/// Override hook named in the specification: hosts needing process- or
/// WASM-level isolation implement this trait themselves instead of using
/// [`RhaiSandbox`].
pub trait ScriptSandbox: Send + Sync {
    fn execute(&self, script: &str, request: ScriptRequest, db: Arc<dyn ScriptDb>) -> Result<ScriptResponse, AppError>;
}

pub struct RhaiSandbox;

impl Default for RhaiSandbox {
    fn default() -> Self {
        Self
    }
}

fn to_dynamic(value: &Value) -> Dynamic {
    rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT)
}

fn from_dynamic(value: Dynamic) -> Value {
    rhai::serde::from_dynamic(&value).unwrap_or(Value::Null)
}

impl ScriptSandbox for RhaiSandbox {
    fn execute(&self, script: &str, request: ScriptRequest, db: Arc<dyn ScriptDb>) -> Result<ScriptResponse, AppError> {
        let mut engine = Engine::new();
        engine.set_max_operations(500_000);
        engine.set_max_expr_depth(64);

        let response_body = Arc::new(parking_lot::Mutex::new(Value::Object(serde_json::Map::new())));
        let response_status = Arc::new(parking_lot::Mutex::new(200i64));

        {
            let body = response_body.clone();
            engine.register_fn("response_set", move |key: &str, value: Dynamic| {
                if let Value::Object(map) = &mut *body.lock() {
                    map.insert(key.to_string(), from_dynamic(value));
                }
            });
        }
        {
            let status = response_status.clone();
            engine.register_fn("response_status", move |code: i64| {
                *status.lock() = code;
            });
        }
        engine.register_fn("console_log", |msg: &str| {
            tracing::info!(target: "pretendo::script", "{msg}");
        });

        {
            let db = db.clone();
            engine.register_fn("db_get_resource_by_id", move |resource: &str, id: &str| -> Dynamic {
                match db.get_resource_by_id(resource, id) {
                    Some(record) => to_dynamic(&Value::Object(record)),
                    None => Dynamic::UNIT,
                }
            });
        }
        {
            let db = db.clone();
            engine.register_fn("db_get_resources", move |resource: &str| -> Dynamic {
                let records: Vec<Value> = db.get_resources(resource).into_iter().map(Value::Object).collect();
                to_dynamic(&Value::Array(records))
            });
        }
        {
            let db = db.clone();
            engine.register_fn("db_create_resource", move |resource: &str, body: Dynamic| -> Dynamic {
                let record = from_dynamic(body);
                let map = record.as_object().cloned().unwrap_or_default();
                match db.create_resource(resource, map) {
                    Ok(created) => to_dynamic(&Value::Object(created)),
                    Err(_) => Dynamic::UNIT,
                }
            });
        }
        {
            let db = db.clone();
            engine.register_fn(
                "db_update_resource",
                move |resource: &str, id: &str, body: Dynamic| -> Dynamic {
                    let record = from_dynamic(body);
                    let map = record.as_object().cloned().unwrap_or_default();
                    match db.update_resource(resource, id, map) {
                        Ok(updated) => to_dynamic(&Value::Object(updated)),
                        Err(_) => Dynamic::UNIT,
                    }
                },
            );
        }
        {
            let db = db.clone();
            engine.register_fn("db_delete_resource", move |resource: &str, id: &str| -> bool {
                db.delete_resource(resource, id).is_ok()
            });
        }
        {
            let db = db.clone();
            engine.register_fn(
                "db_get_related_resources",
                move |resource: &str, id: &str, relation: &str| -> Dynamic {
                    match db.get_related_resources(resource, id, relation) {
                        Ok(value) => to_dynamic(&value),
                        Err(_) => Dynamic::UNIT,
                    }
                },
            );
        }

        let mut scope = Scope::new();
        scope.push("request_method", request.method.clone());
        scope.push("request_path", request.path.clone());
        scope.push("request_params", to_dynamic(&serde_json::to_value(&request.params).unwrap_or(Value::Null)));
        scope.push("request_query", to_dynamic(&serde_json::to_value(&request.query).unwrap_or(Value::Null)));
        scope.push("request_body", to_dynamic(&request.body));

        engine
            .run_with_scope(&mut scope, script)
            .map_err(|e| AppError::bad_request(format!("script execution failed: {e}")))?;

        let status = (*response_status.lock()).clamp(100, 599) as u16;
        let body = response_body.lock().clone();
        Ok(ScriptResponse { status, body })
    }
}
