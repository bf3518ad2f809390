//! Accounts, bearer sessions and the [`CurrentUser`] extractor.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/signup` | Body: `{"email","password"}`; returns 201 + session |
//! | `POST` | `/auth/login`  | Same body; returns a fresh session |
//! | `POST` | `/auth/logout` | Ends the presented session |
//! | `GET`  | `/auth/me`     | The session's user |

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use axum::{
  extract::{FromRequestParts, State},
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use blake_core::{
  session::{SessionRecord, User, normalize_email},
  store::VisionStore,
};
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::{AppState, envelope::Envelope, error::ApiError, extract::AppJson};

const TOKEN_BYTES: usize = 32;
const MIN_PASSWORD_CHARS: usize = 8;

// ─── Tokens ───────────────────────────────────────────────────────────────────

/// A fresh random bearer token.
fn new_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Sessions are looked up by the SHA-256 digest of their token.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ────────────────────────────────────────────────────────────────

/// The authenticated caller. Present in a handler means the request carried
/// a live session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub id:         Uuid,
  pub token_hash: String,
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: VisionStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let token_hash = hash_token(token);

    let id = state
      .store
      .session_user(token_hash.clone(), Utc::now())
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;
    Ok(Self { id, token_hash })
  }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub user:       User,
}

async fn open_session<S>(state: &AppState<S>, user: User) -> Result<SessionView, ApiError>
where
  S: VisionStore + 'static,
{
  let token = new_token();
  let now = Utc::now();
  let expires_at = now + state.session_ttl;
  state
    .store
    .create_session(SessionRecord {
      token_hash: hash_token(&token),
      user_id: user.id,
      created_at: now,
      expires_at,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(SessionView { token, expires_at, user })
}

/// `POST /auth/signup`
pub async fn signup<S>(
  State(state): State<AppState<S>>,
  AppJson(body): AppJson<CredentialsBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let email = normalize_email(&body.email)?;
  if body.password.chars().count() < MIN_PASSWORD_CHARS {
    return Err(ApiError::bad_request(format!(
      "password must be at least {MIN_PASSWORD_CHARS} characters"
    )));
  }

  let existing = state
    .store
    .find_credentials(email.clone())
    .await
    .map_err(ApiError::store)?;
  if existing.is_some() {
    return Err(ApiError::bad_request("email already registered"));
  }

  let salt = SaltString::generate(&mut OsRng);
  let password_hash = Argon2::default()
    .hash_password(body.password.as_bytes(), &salt)
    .map_err(|e| ApiError::internal("password hashing", e))?
    .to_string();

  let user = state
    .store
    .create_user(email, password_hash)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(user = %user.id, "account created");

  Envelope::created("session", open_session(&state, user).await?)
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  AppJson(body): AppJson<CredentialsBody>,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let email = normalize_email(&body.email).map_err(|_| ApiError::Unauthorized)?;
  let credentials = state
    .store
    .find_credentials(email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  let parsed = PasswordHash::new(&credentials.password_hash)
    .map_err(|e| ApiError::internal("stored password hash", e))?;
  Argon2::default()
    .verify_password(body.password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthorized)?;

  Envelope::ok("session", open_session(&state, credentials.user).await?)
}

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  state
    .store
    .delete_session(user.token_hash)
    .await
    .map_err(ApiError::store)?;
  Ok(Envelope::deleted())
}

/// `GET /auth/me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Envelope, ApiError>
where
  S: VisionStore + 'static,
{
  let me = state
    .store
    .get_user(user.id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;
  Envelope::ok("user", me)
}
