//! Builds an OpenAPI 3.0 document from a [`PretendoConfig`] at request time.
//!
//! Resources here are runtime configuration, not compile-time types, so this
//! crate assembles the document directly as a `serde_json::Value` conforming
//! to the OpenAPI 3.0 schema rather than going through `utoipa`'s derive or
//! type-state builder surface (both assume the operations they describe are
//! known when the binary is compiled). See `DESIGN.md` for the rationale.

use pretendo_config::{FieldType, PretendoConfig, ResourceConfig};
use serde_json::{json, Map, Value};

pub fn build_document(config: &PretendoConfig, server_url: &str) -> Value {
    let mut paths = Map::new();
    let mut schemas = Map::new();

    for resource in &config.resources {
        schemas.insert(schema_name(&resource.name), resource_schema(resource));
        add_collection_paths(&mut paths, resource);
        add_item_paths(&mut paths, resource);
        for rel in &resource.relationships {
            add_relation_path(&mut paths, resource, &rel.name);
        }
    }

    for route in &config.routes {
        add_custom_route_path(&mut paths, route);
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Pretendo Mock API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "A declaratively configured mock REST API server.",
        },
        "servers": [{ "url": server_url }],
        "paths": Value::Object(paths),
        "components": {
            "schemas": Value::Object(schemas),
            "securitySchemes": {
                "bearerAuth": {
                    "type": "http",
                    "scheme": "bearer",
                }
            }
        },
    })
}

pub fn to_yaml(document: &Value) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(document)
}

fn schema_name(resource: &str) -> String {
    let mut chars = resource.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => resource.to_string(),
    }
}

fn field_type_schema(field_type: FieldType) -> Value {
    match field_type {
        FieldType::String => json!({ "type": "string" }),
        FieldType::Number => json!({ "type": "number" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::Object => json!({ "type": "object" }),
        FieldType::Array => json!({ "type": "array", "items": {} }),
        FieldType::Date => json!({ "type": "string", "format": "date-time" }),
        FieldType::Uuid => json!({ "type": "string", "format": "uuid" }),
    }
}

fn resource_schema(resource: &ResourceConfig) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in &resource.fields {
        properties.insert(field.name.clone(), field_type_schema(field.field_type));
        if field.required {
            required.push(Value::from(field.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": Value::Array(required),
    })
}

fn ref_schema(resource: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", schema_name(resource)) })
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" },
    })
}

fn success_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } },
    })
}

fn problem_response(description: &str) -> Value {
    json!({ "description": description })
}

fn add_collection_paths(paths: &mut Map<String, Value>, resource: &ResourceConfig) {
    let path = format!("/{}", resource.name);
    let list_schema = json!({ "type": "array", "items": ref_schema(&resource.name) });

    paths.insert(
        path,
        json!({
            "get": {
                "summary": format!("List {}", resource.name),
                "tags": [resource.name],
                "responses": { "200": success_response("A page of records", list_schema) },
            },
            "post": {
                "summary": format!("Create a {}", resource.name.trim_end_matches('s')),
                "tags": [resource.name],
                "requestBody": {
                    "content": { "application/json": { "schema": ref_schema(&resource.name) } },
                },
                "responses": {
                    "201": success_response("The created record", ref_schema(&resource.name)),
                    "400": problem_response("Validation failed"),
                },
            },
        }),
    );
}

fn add_item_paths(paths: &mut Map<String, Value>, resource: &ResourceConfig) {
    let path = format!("/{}/{{id}}", resource.name);
    paths.insert(
        path,
        json!({
            "get": {
                "summary": format!("Get a {} by id", resource.name.trim_end_matches('s')),
                "tags": [resource.name],
                "parameters": [id_parameter()],
                "responses": {
                    "200": success_response("The record", ref_schema(&resource.name)),
                    "404": problem_response("Not found"),
                },
            },
            "put": {
                "summary": format!("Replace a {}", resource.name.trim_end_matches('s')),
                "tags": [resource.name],
                "parameters": [id_parameter()],
                "requestBody": {
                    "content": { "application/json": { "schema": ref_schema(&resource.name) } },
                },
                "responses": {
                    "200": success_response("The replaced record", ref_schema(&resource.name)),
                    "404": problem_response("Not found"),
                },
            },
            "patch": {
                "summary": format!("Partially update a {}", resource.name.trim_end_matches('s')),
                "tags": [resource.name],
                "parameters": [id_parameter()],
                "responses": {
                    "200": success_response("The updated record", ref_schema(&resource.name)),
                    "404": problem_response("Not found"),
                },
            },
            "delete": {
                "summary": format!("Delete a {}", resource.name.trim_end_matches('s')),
                "tags": [resource.name],
                "parameters": [id_parameter()],
                "responses": {
                    "204": { "description": "Deleted" },
                    "404": problem_response("Not found"),
                },
            },
        }),
    );
}

fn add_relation_path(paths: &mut Map<String, Value>, resource: &ResourceConfig, relation_name: &str) {
    let path = format!("/{}/{{id}}/{}", resource.name, relation_name);
    paths.insert(
        path,
        json!({
            "get": {
                "summary": format!("Get {} related to a {}", relation_name, resource.name.trim_end_matches('s')),
                "tags": [resource.name],
                "parameters": [id_parameter()],
                "responses": {
                    "200": success_response("The related record(s)", json!({})),
                    "404": problem_response("Not found"),
                },
            },
        }),
    );
}

fn add_custom_route_path(paths: &mut Map<String, Value>, route: &pretendo_config::CustomRoute) {
    let method = route.method.to_lowercase();
    let entry = paths
        .entry(route.path.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(methods) = entry {
        methods.insert(
            method,
            json!({
                "summary": format!("Custom route {} {}", route.method, route.path),
                "tags": ["custom"],
                "responses": { "200": success_response("Custom route response", json!({})) },
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretendo_config::{FieldConfig, RelationshipConfig, RelationshipType};

    fn sample_config() -> PretendoConfig {
        PretendoConfig {
            resources: vec![ResourceConfig {
                name: "posts".into(),
                primary_key: "id".into(),
                fields: vec![FieldConfig {
                    name: "title".into(),
                    field_type: FieldType::String,
                    required: true,
                    unique: false,
                    min: None,
                    max: None,
                    min_length: None,
                    max_length: None,
                    pattern: None,
                    enum_values: vec![],
                    default_value: None,
                }],
                relationships: vec![RelationshipConfig {
                    name: "comments".into(),
                    rel_type: RelationshipType::HasMany,
                    resource: "comments".into(),
                    foreign_key: "postId".into(),
                    target_key: None,
                    through: None,
                }],
                access: Default::default(),
                owned_by: None,
                seed: vec![],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn document_has_collection_and_item_paths() {
        let doc = build_document(&sample_config(), "http://localhost:3000");
        let paths = doc.get("paths").unwrap().as_object().unwrap();
        assert!(paths.contains_key("/posts"));
        assert!(paths.contains_key("/posts/{id}"));
        assert!(paths.contains_key("/posts/{id}/comments"));
    }

    #[test]
    fn schema_includes_required_fields() {
        let doc = build_document(&sample_config(), "http://localhost:3000");
        let schema = doc
            .get("components")
            .unwrap()
            .get("schemas")
            .unwrap()
            .get("Posts")
            .unwrap();
        assert_eq!(schema.get("required").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn document_serializes_to_yaml() {
        let doc = build_document(&sample_config(), "http://localhost:3000");
        let yaml = to_yaml(&doc).unwrap();
        assert!(yaml.contains("openapi"));
    }
}
