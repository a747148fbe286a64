//! Issues, verifies, and revokes bearer tokens, and authenticates a username
//! and password against whatever candidate user records the caller supplies.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use pretendo_errors::{AppError, AppResult};
use pretendo_query::Record;
use pretendo_store::special_fields::hash_for_comparison;
use rand::RngCore;
use serde_json::Value;

use crate::subject::{Subject, TokenRecord};

pub struct AuthFields {
    pub username_field: String,
    pub password_field: String,
    pub role_field: Option<String>,
    pub id_field: String,
}

impl Default for AuthFields {
    fn default() -> Self {
        Self {
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            role_field: Some("role".to_string()),
            id_field: "id".to_string(),
        }
    }
}

pub struct AuthService {
    tokens: DashMap<String, TokenRecord>,
    ttl: Duration,
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl AuthService {
    pub fn new(ttl: StdDuration) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(3600)),
        }
    }

    /// Matches `username`/`password` against `candidates`, issuing a fresh
    /// token on success.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        candidates: &[Record],
        fields: &AuthFields,
    ) -> AppResult<(String, Subject)> {
        let user = candidates
            .iter()
            .find(|r| {
                r.get(&fields.username_field)
                    .and_then(Value::as_str)
                    .is_some_and(|u| u == username)
            })
            .ok_or_else(|| AppError::unauthorized("invalid username or password"))?;

        let stored_hash = user
            .get(&fields.password_field)
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::unauthorized("invalid username or password"))?;

        if stored_hash != hash_for_comparison(password) {
            return Err(AppError::unauthorized("invalid username or password"));
        }

        let subject = Subject {
            id: user.get(&fields.id_field).cloned(),
            username: username.to_string(),
            role: fields
                .role_field
                .as_deref()
                .and_then(|f| user.get(f))
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        let token = self.issue(subject.clone());
        Ok((token, subject))
    }

    pub fn issue(&self, subject: Subject) -> String {
        let token = random_token();
        self.tokens.insert(
            token.clone(),
            TokenRecord {
                subject,
                expires_at: Utc::now() + self.ttl,
            },
        );
        token
    }

    /// Looks up `token`. An expired token is never accepted and is removed
    /// as a side effect (Invariant 6).
    pub fn verify(&self, token: &str) -> Option<Subject> {
        let now = Utc::now();
        let Some(record) = self.tokens.get(token) else {
            return None;
        };
        if record.is_expired(now) {
            drop(record);
            self.tokens.remove(token);
            return None;
        }
        Some(record.subject.clone())
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn active_token_count(&self) -> usize {
        self.tokens.len()
    }
}
