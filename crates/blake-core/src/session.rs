//! Users and bearer-token sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:         Uuid,
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

/// A user together with the argon2 PHC string of their password. Never
/// serialised.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}

/// A stored session. Only the SHA-256 digest of the bearer token is kept.
#[derive(Debug, Clone)]
pub struct SessionRecord {
  pub token_hash: String,
  pub user_id:    Uuid,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

/// Lowercase and trim an email address; reject anything without an `@`
/// between two non-empty parts.
pub fn normalize_email(raw: &str) -> crate::Result<String> {
  let email = raw.trim().to_lowercase();
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
    _ => Err(crate::Error::validation("a valid email is required")),
  }
}
