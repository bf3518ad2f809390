//! Wiring for the `blake-vision` binary: configuration and application
//! assembly.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use blake_api::AppState;
use blake_core::extraction::LanguageModel;
use blake_ingest::{
  media::FsObjectStore,
  openai::{OpenAiClient, OpenAiConfig},
};
use blake_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::services::ServeDir;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Top-level server configuration.
///
/// Read from a TOML file, then overridden by `BLAKE_*` environment variables
/// (`BLAKE_PORT`, `BLAKE_AI__API_KEY`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_database_path")]
  pub database_path:     PathBuf,
  #[serde(default = "default_media_dir")]
  pub media_dir:         PathBuf,
  /// Base of the URLs handed out for uploaded images. Files are served from
  /// `/media` on this server.
  #[serde(default = "default_public_base_url")]
  pub public_base_url:   String,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
  #[serde(default)]
  pub ai:                AiConfig,
}

/// Language-model settings. Without `api_key` the AI routes answer 500.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
  pub api_key:         Option<String>,
  #[serde(default = "default_ai_base_url")]
  pub base_url:        String,
  #[serde(default = "default_model")]
  pub model:           String,
  #[serde(default = "default_embedding_model")]
  pub embedding_model: String,
}

impl Default for AiConfig {
  fn default() -> Self {
    Self {
      api_key:         None,
      base_url:        default_ai_base_url(),
      model:           default_model(),
      embedding_model: default_embedding_model(),
    }
  }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_database_path() -> PathBuf { PathBuf::from("blake-vision.db") }
fn default_media_dir() -> PathBuf { PathBuf::from("media") }
fn default_public_base_url() -> String { "http://localhost:8080/media".into() }
fn default_session_ttl_hours() -> i64 { 720 }
fn default_ai_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_model() -> String { "gpt-4o-mini".into() }
fn default_embedding_model() -> String { "text-embedding-3-small".into() }

impl ServerConfig {
  /// Layer the optional file at `path` under the `BLAKE_` environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BLAKE").separator("__"))
      .build()
      .context("failed to read configuration")?;
    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Assembly ─────────────────────────────────────────────────────────────────

/// Open the store, media directory and optional language model, and return
/// the full application router with `/media` mounted.
pub async fn build_app(config: &ServerConfig) -> anyhow::Result<Router> {
  let database_path = expand_tilde(&config.database_path);
  let store = SqliteStore::open(&database_path)
    .await
    .with_context(|| format!("failed to open store at {database_path:?}"))?;

  let media_dir = expand_tilde(&config.media_dir);
  tokio::fs::create_dir_all(&media_dir)
    .await
    .with_context(|| format!("failed to create media dir {media_dir:?}"))?;
  let media = FsObjectStore::new(&media_dir, config.public_base_url.clone());

  let ai: Option<Arc<dyn LanguageModel>> = match &config.ai.api_key {
    Some(api_key) if !api_key.trim().is_empty() => {
      let client = OpenAiClient::new(OpenAiConfig {
        api_key:         api_key.clone(),
        base_url:        config.ai.base_url.clone(),
        model:           config.ai.model.clone(),
        embedding_model: config.ai.embedding_model.clone(),
      })
      .context("failed to build language model client")?;
      tracing::info!(model = %config.ai.model, "language model enabled");
      Some(Arc::new(client))
    }
    _ => {
      tracing::warn!("no ai.api_key configured; extraction and search are disabled");
      None
    }
  };

  let state = AppState {
    store: Arc::new(store),
    media: Arc::new(media),
    ai,
    session_ttl: chrono::Duration::hours(config.session_ttl_hours),
  };
  Ok(blake_api::router(state).nest_service("/media", ServeDir::new(media_dir)))
}
