//! Resolves `defaultValue` special tokens (`$now`, `$uuid`, `$userId`,
//! `$increment`, `$hash`) and the password-name hashing heuristic.

use chrono::Utc;
use pretendo_config::{FieldConfig, SPECIAL_HASH, SPECIAL_INCREMENT, SPECIAL_NOW, SPECIAL_USER_ID, SPECIAL_UUID};
use pretendo_query::Record;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::Store;
use crate::validator::Mode;

/// Context supplied by the caller for tokens that need request-scoped data.
#[derive(Debug, Clone, Default)]
pub struct SpecialFieldContext {
    pub user_id: Option<Value>,
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn looks_like_password_field(name: &str) -> bool {
    name.to_ascii_lowercase().contains("password")
}

fn looks_already_hashed(s: &str) -> bool {
    (40..=128).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Applies special-field defaults and the password heuristic in place,
/// mutating `record`. `store` is consulted only for `$increment`.
///
/// In [`Mode::Update`] only a field literally named `updatedAt` with a
/// `$now` default is refreshed; `$uuid`, `$userId`, `$increment`, and literal
/// defaults are create-only. The `$hash` token and the password-name
/// heuristic run in both modes.
pub fn apply(
    store: &Store,
    resource: &str,
    fields: &[FieldConfig],
    record: &mut Record,
    ctx: &SpecialFieldContext,
    mode: Mode,
) {
    for field in fields {
        if let Some(default) = &field.default_value {
            let needs_default = record
                .get(&field.name)
                .map(Value::is_null)
                .unwrap_or(true);
            let is_create = matches!(mode, Mode::Create);

            match default.as_str() {
                Some(SPECIAL_NOW) if is_create && needs_default => {
                    record.insert(field.name.clone(), Value::from(Utc::now().to_rfc3339()));
                }
                Some(SPECIAL_NOW) if !is_create && field.name == "updatedAt" => {
                    record.insert(field.name.clone(), Value::from(Utc::now().to_rfc3339()));
                }
                Some(SPECIAL_UUID) if is_create && needs_default => {
                    record.insert(field.name.clone(), Value::from(Uuid::new_v4().to_string()));
                }
                Some(SPECIAL_USER_ID) if is_create && needs_default => {
                    if let Some(uid) = &ctx.user_id {
                        record.insert(field.name.clone(), uid.clone());
                    }
                }
                Some(SPECIAL_INCREMENT) if is_create && needs_default => {
                    let next = store.next_integer_id(resource, &field.name);
                    record.insert(field.name.clone(), Value::from(next));
                }
                Some(SPECIAL_HASH) => {
                    if let Some(v) = record.get(&field.name).cloned() {
                        if let Some(s) = v.as_str() {
                            if !looks_already_hashed(s) {
                                record.insert(field.name.clone(), Value::from(sha256_hex(s)));
                            }
                        }
                    }
                }
                None if is_create && needs_default => {
                    record.insert(field.name.clone(), default.clone());
                }
                _ => {}
            }
        }

        if looks_like_password_field(&field.name) {
            if let Some(Value::String(s)) = record.get(&field.name) {
                if !looks_already_hashed(s) {
                    let hashed = sha256_hex(s);
                    record.insert(field.name.clone(), Value::from(hashed));
                }
            }
        }
    }
}

/// Hashes a plaintext candidate the same way stored passwords are hashed, for
/// comparison during authentication.
pub fn hash_for_comparison(plaintext: &str) -> String {
    sha256_hex(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretendo_config::FieldType;
    use serde_json::json;

    fn field(name: &str, default: Option<Value>) -> FieldConfig {
        FieldConfig {
            name: name.to_string(),
            field_type: FieldType::String,
            required: false,
            unique: false,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            pattern: None,
            enum_values: vec![],
            default_value: default,
        }
    }

    #[test]
    fn now_token_fills_missing_field() {
        let store = Store::new();
        let fields = vec![field("createdAt", Some(Value::from(SPECIAL_NOW)))];
        let mut record = Record::new();
        apply(&store, "widgets", &fields, &mut record, &SpecialFieldContext::default(), Mode::Create);
        assert!(record.get("createdAt").unwrap().as_str().unwrap().contains('T'));
    }

    #[test]
    fn increment_token_uses_max_plus_one() {
        let store = Store::new();
        store.seed(
            "widgets",
            vec![{
                let mut r = Record::new();
                r.insert("seq".into(), json!(4));
                r
            }],
        );
        let fields = vec![field("seq", Some(Value::from(SPECIAL_INCREMENT)))];
        let mut record = Record::new();
        apply(&store, "widgets", &fields, &mut record, &SpecialFieldContext::default(), Mode::Create);
        assert_eq!(record.get("seq").unwrap(), 5);
    }

    #[test]
    fn password_fields_are_hashed_regardless_of_default_value() {
        let store = Store::new();
        let fields = vec![field("password", None)];
        let mut record = Record::new();
        record.insert("password".into(), json!("hunter2"));
        apply(&store, "users", &fields, &mut record, &SpecialFieldContext::default(), Mode::Create);
        let stored = record.get("password").unwrap().as_str().unwrap();
        assert_ne!(stored, "hunter2");
        assert_eq!(stored.len(), 64);
        assert_eq!(stored, hash_for_comparison("hunter2"));
    }

    #[test]
    fn already_hashed_password_is_left_alone() {
        let store = Store::new();
        let fields = vec![field("password", None)];
        let hashed = hash_for_comparison("hunter2");
        let mut record = Record::new();
        record.insert("password".into(), Value::from(hashed.clone()));
        apply(&store, "users", &fields, &mut record, &SpecialFieldContext::default(), Mode::Create);
        assert_eq!(record.get("password").unwrap().as_str().unwrap(), hashed);
    }

    #[test]
    fn already_hashed_password_of_non_sha256_length_is_left_alone() {
        let store = Store::new();
        let fields = vec![field("password", None)];
        let sha1_shaped = "a".repeat(40);
        let mut record = Record::new();
        record.insert("password".into(), Value::from(sha1_shaped.clone()));
        apply(&store, "users", &fields, &mut record, &SpecialFieldContext::default(), Mode::Create);
        assert_eq!(record.get("password").unwrap().as_str().unwrap(), sha1_shaped);
    }

    #[test]
    fn literal_default_value_is_used_verbatim() {
        let store = Store::new();
        let fields = vec![field("role", Some(json!("member")))];
        let mut record = Record::new();
        apply(&store, "users", &fields, &mut record, &SpecialFieldContext::default(), Mode::Create);
        assert_eq!(record.get("role").unwrap(), "member");
    }

    #[test]
    fn update_mode_skips_uuid_and_literal_defaults() {
        let store = Store::new();
        let fields = vec![
            field("token", Some(Value::from(SPECIAL_UUID))),
            field("role", Some(json!("member"))),
        ];
        let mut record = Record::new();
        apply(&store, "users", &fields, &mut record, &SpecialFieldContext::default(), Mode::Update);
        assert!(record.get("token").is_none());
        assert!(record.get("role").is_none());
    }

    #[test]
    fn update_mode_refreshes_updated_at() {
        let store = Store::new();
        let fields = vec![field("updatedAt", Some(Value::from(SPECIAL_NOW)))];
        let mut record = Record::new();
        record.insert("updatedAt".into(), json!("stale"));
        apply(&store, "users", &fields, &mut record, &SpecialFieldContext::default(), Mode::Update);
        assert_ne!(record.get("updatedAt").unwrap(), "stale");
    }

    #[test]
    fn update_mode_still_hashes_passwords() {
        let store = Store::new();
        let fields = vec![field("password", None)];
        let mut record = Record::new();
        record.insert("password".into(), json!("newpass"));
        apply(&store, "users", &fields, &mut record, &SpecialFieldContext::default(), Mode::Update);
        let stored = record.get("password").unwrap().as_str().unwrap();
        assert_eq!(stored, hash_for_comparison("newpass"));
    }
}
