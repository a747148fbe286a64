//! Field projection (`fields=a,b,c`). Per Design Notes §9, projection strips
//! only top-level keys; nested/expanded objects are left untouched.

use crate::Record;

pub fn project_fields(record: &Record, fields: &[String], primary_key: &str) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    let mut out = Record::new();
    // Always keep the primary key so callers can still address the record.
    if let Some(pk) = record.get(primary_key) {
        out.insert(primary_key.to_string(), pk.clone());
    }
    for field in fields {
        if let Some(v) = record.get(field) {
            out.insert(field.clone(), v.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_keeps_primary_key_and_requested_fields() {
        let mut r = Record::new();
        r.insert("id".into(), json!(1));
        r.insert("name".into(), json!("Alice"));
        r.insert("email".into(), json!("a@example.com"));

        let projected = project_fields(&r, &["name".to_string()], "id");
        assert_eq!(projected.len(), 2);
        assert_eq!(projected.get("name"), Some(&json!("Alice")));
        assert!(projected.get("email").is_none());
    }

    #[test]
    fn empty_fields_list_returns_full_record() {
        let mut r = Record::new();
        r.insert("id".into(), json!(1));
        let projected = project_fields(&r, &[], "id");
        assert_eq!(projected, r);
    }

    #[test]
    fn nested_objects_are_not_stripped_when_selected() {
        let mut r = Record::new();
        r.insert("id".into(), json!(1));
        r.insert("author".into(), json!({"id": 2, "name": "Bob", "secret": "x"}));
        let projected = project_fields(&r, &["author".to_string()], "id");
        // Top-level only: the nested object is passed through unmodified.
        assert_eq!(projected.get("author").unwrap()["secret"], json!("x"));
    }
}
