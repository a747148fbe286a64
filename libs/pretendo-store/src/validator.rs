//! Field-rule validation: `required` (create only), `minLength`/`maxLength`,
//! `min`/`max`, `pattern`, `enum`, and `unique` (create and update).

use pretendo_config::FieldConfig;
use pretendo_errors::{AppError, ValidationIssue};
use regex::Regex;
use serde_json::Value;

use crate::store::Store;

pub enum Mode {
    Create,
    Update,
}

/// Anchors a pattern unless the operator already supplied anchors
/// (Design Notes §9, "Pattern anchoring").
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if pattern.starts_with('^') || pattern.ends_with('$') {
        Regex::new(pattern)
    } else {
        Regex::new(&format!("^{pattern}$"))
    }
}

/// Validates `record` against `fields`, returning every violation found
/// (not just the first) so the caller can report a complete `ValidationIssue`
/// list (Invariant 3).
pub fn validate(
    store: &Store,
    resource: &str,
    primary_key: &str,
    fields: &[FieldConfig],
    record: &serde_json::Map<String, Value>,
    mode: Mode,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let mut issues = Vec::new();

    for field in fields {
        let value = record.get(&field.name);

        if matches!(mode, Mode::Create) && field.required && value.map_or(true, Value::is_null) {
            issues.push(ValidationIssue::new(&field.name, "required", "field is required"));
            continue;
        }

        let Some(value) = value.filter(|v| !v.is_null()) else {
            continue;
        };

        if let Some(min_len) = field.min_length {
            if let Some(s) = value.as_str() {
                if s.chars().count() < min_len {
                    issues.push(ValidationIssue::new(
                        &field.name,
                        "minLength",
                        format!("must be at least {min_len} characters"),
                    ));
                }
            }
        }
        if let Some(max_len) = field.max_length {
            if let Some(s) = value.as_str() {
                if s.chars().count() > max_len {
                    issues.push(ValidationIssue::new(
                        &field.name,
                        "maxLength",
                        format!("must be at most {max_len} characters"),
                    ));
                }
            }
        }
        if let Some(min) = field.min {
            if let Some(n) = value.as_f64() {
                if n < min {
                    issues.push(ValidationIssue::new(&field.name, "min", format!("must be >= {min}")));
                }
            }
        }
        if let Some(max) = field.max {
            if let Some(n) = value.as_f64() {
                if n > max {
                    issues.push(ValidationIssue::new(&field.name, "max", format!("must be <= {max}")));
                }
            }
        }
        if let Some(pattern) = &field.pattern {
            if let Some(s) = value.as_str() {
                match compile_pattern(pattern) {
                    Ok(re) if !re.is_match(s) => {
                        issues.push(ValidationIssue::new(&field.name, "pattern", "does not match required pattern"));
                    }
                    Err(_) => {
                        issues.push(ValidationIssue::new(&field.name, "pattern", "field has an invalid pattern rule"));
                    }
                    _ => {}
                }
            }
        }
        if !field.enum_values.is_empty() && !field.enum_values.contains(value) {
            issues.push(ValidationIssue::new(&field.name, "enum", "value is not one of the allowed options"));
        }
        if field.unique && !store.is_unique(resource, &field.name, value, primary_key, exclude_id) {
            issues.push(ValidationIssue::new(&field.name, "unique", "value must be unique"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretendo_config::FieldType;
    use serde_json::json;

    fn field(name: &str) -> FieldConfig {
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
            default_value: None,
        }
    }

    #[test]
    fn required_only_enforced_on_create() {
        let store = Store::new();
        let mut f = field("name");
        f.required = true;
        let record = serde_json::Map::new();

        assert!(validate(&store, "users", "id", &[f.clone()], &record, Mode::Create, None).is_err());
        assert!(validate(&store, "users", "id", &[f], &record, Mode::Update, None).is_ok());
    }

    #[test]
    fn pattern_is_anchored_by_default() {
        let store = Store::new();
        let mut f = field("code");
        f.pattern = Some("[A-Z]{3}".to_string());
        let mut record = serde_json::Map::new();
        record.insert("code".into(), json!("ABCD"));

        let err = validate(&store, "widgets", "id", &[f], &record, Mode::Create, None).unwrap_err();
        assert_eq!(err.issues[0].rule, "pattern");
    }

    #[test]
    fn explicit_anchors_are_respected_verbatim() {
        let store = Store::new();
        let mut f = field("code");
        f.pattern = Some("^[A-Z]{3}.*".to_string());
        let mut record = serde_json::Map::new();
        record.insert("code".into(), json!("ABCD"));

        assert!(validate(&store, "widgets", "id", &[f], &record, Mode::Create, None).is_ok());
    }

    #[test]
    fn unique_excludes_record_being_updated() {
        let store = Store::new();
        let mut existing = serde_json::Map::new();
        existing.insert("id".into(), json!(1));
        existing.insert("email".into(), json!("a@example.com"));
        store.seed("users", vec![existing]);

        let mut f = field("email");
        f.unique = true;
        let mut record = serde_json::Map::new();
        record.insert("email".into(), json!("a@example.com"));

        assert!(validate(&store, "users", "id", &[f.clone()], &record, Mode::Update, Some("1")).is_ok());
        assert!(validate(&store, "users", "id", &[f], &record, Mode::Create, None).is_err());
    }

    #[test]
    fn enum_rejects_values_outside_the_list() {
        let store = Store::new();
        let mut f = field("status");
        f.enum_values = vec![json!("active"), json!("inactive")];
        let mut record = serde_json::Map::new();
        record.insert("status".into(), json!("deleted"));

        let err = validate(&store, "users", "id", &[f], &record, Mode::Create, None).unwrap_err();
        assert_eq!(err.issues[0].rule, "enum");
    }
}
