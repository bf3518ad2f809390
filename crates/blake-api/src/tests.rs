//! Router-level tests against an in-memory SQLite store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use blake_core::{
  extraction::{CategoryHint, ExtractedEntity, ExtractionResult, LanguageModel},
  media::{ObjectStore, StoredObject},
};
use blake_store_sqlite::SqliteStore;
use bytes::Bytes;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Stubs ────────────────────────────────────────────────────────────────────

struct MemoryMedia;

#[async_trait]
impl ObjectStore for MemoryMedia {
  async fn put(
    &self,
    key: &str,
    bytes: Bytes,
    content_type: &str,
  ) -> Result<StoredObject, BoxError> {
    Ok(StoredObject {
      key:          key.to_owned(),
      url:          format!("http://media.test/{key}"),
      content_type: content_type.to_owned(),
      size:         bytes.len(),
    })
  }
}

/// Names the first word of the text as a character; embeds by vowel count.
struct FakeModel;

#[async_trait]
impl LanguageModel for FakeModel {
  async fn extract_entities(
    &self,
    text: &str,
    categories: &[CategoryHint],
  ) -> Result<ExtractionResult, BoxError> {
    assert!(categories.iter().any(|c| c.slug == "personagem"));
    Ok(ExtractionResult {
      entities:  vec![ExtractedEntity {
        name:     text.split_whitespace().next().unwrap_or("?").to_owned(),
        category: "personagem".into(),
        summary:  None,
        content:  None,
        tags:     vec![],
      }],
      relations: vec![],
    })
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, BoxError> {
    let vowels = text.chars().filter(|c| "aeiouAEIOU".contains(*c)).count();
    Ok(vec![1.0, vowels as f32])
  }
}

// ─── Harness ──────────────────────────────────────────────────────────────────

async fn make_state(ai: bool) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState {
    store:       Arc::new(store),
    media:       Arc::new(MemoryMedia),
    ai:          ai.then(|| Arc::new(FakeModel) as Arc<dyn LanguageModel>),
    session_ttl: chrono::Duration::hours(1),
  }
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  read(router(state.clone()).oneshot(req).await.unwrap()).await
}

async fn read(resp: axum::response::Response) -> (StatusCode, Value) {
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

const BOUNDARY: &str = "blake-test-boundary";

/// A multipart body with one `file` part and any number of text parts.
fn multipart(
  filename: &str,
  content_type: &str,
  file: &[u8],
  fields: &[(&str, &str)],
) -> Vec<u8> {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
      )
      .as_bytes(),
    );
  }
  body.extend_from_slice(
    format!(
      "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .as_bytes(),
  );
  body.extend_from_slice(file);
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
  body
}

async fn send_multipart(
  state: &AppState<SqliteStore>,
  uri: &str,
  token: &str,
  body: Vec<u8>,
) -> (StatusCode, Value) {
  let req = Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::AUTHORIZATION, format!("Bearer {token}"))
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
    .body(Body::from(body))
    .unwrap();
  read(router(state.clone()).oneshot(req).await.unwrap()).await
}

async fn signup(state: &AppState<SqliteStore>, email: &str) -> String {
  let (status, body) = send(
    state,
    "POST",
    "/auth/signup",
    None,
    Some(json!({ "email": email, "password": "correct horse" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["session"]["token"].as_str().unwrap().to_owned()
}

async fn create_universe(state: &AppState<SqliteStore>, token: &str, name: &str) -> String {
  let (status, body) =
    send(state, "POST", "/universes", Some(token), Some(json!({ "name": name }))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["universe"]["id"].as_str().unwrap().to_owned()
}

async fn create_world(
  state: &AppState<SqliteStore>,
  token: &str,
  universe_id: &str,
  name: &str,
) -> Value {
  let (status, body) = send(
    state,
    "POST",
    "/worlds",
    Some(token),
    Some(json!({ "universe_id": universe_id, "name": name, "has_episodes": true })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["world"].clone()
}

async fn create_ficha(state: &AppState<SqliteStore>, token: &str, body: Value) -> Value {
  let (status, resp) = send(state, "POST", "/fichas", Some(token), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{resp}");
  resp["ficha"].clone()
}

// ─── Health and auth ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_needs_no_session() {
  let state = make_state(false).await;
  let (status, body) = send(&state, "GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn entity_routes_require_a_session() {
  let state = make_state(false).await;
  let (status, body) = send(&state, "GET", "/universes", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body, json!({ "error": "unauthorized" }));

  let (status, _) = send(&state, "GET", "/universes", Some("not-a-token"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_login_logout() {
  let state = make_state(false).await;
  signup(&state, "Ana@Example.com").await;

  let (status, _) = send(
    &state,
    "POST",
    "/auth/signup",
    None,
    Some(json!({ "email": "ana@example.com", "password": "another one" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "ana@example.com", "password": "wrong password" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = send(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "ana@example.com", "password": "correct horse" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let token = body["session"]["token"].as_str().unwrap().to_owned();

  let (status, body) = send(&state, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["email"], "ana@example.com");

  let (status, body) = send(&state, "POST", "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "deleted": true }));

  let (status, _) = send(&state, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let (status, body) =
    send(&state, "POST", "/universes", Some(&token), Some(json!({ "nome": "x" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

// ─── Universes and worlds ─────────────────────────────────────────────────────

#[tokio::test]
async fn universe_gets_a_root_world_with_generated_prefix() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Terra Média").await;

  let (status, body) =
    send(&state, "GET", &format!("/worlds?universe_id={universe_id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let worlds = body["worlds"].as_array().unwrap();
  assert_eq!(worlds.len(), 1);
  assert_eq!(worlds[0]["name"], "Global");
  assert_eq!(worlds[0]["is_root"], true);
  assert_eq!(worlds[0]["prefix"], "TM");

  let root_id = worlds[0]["id"].as_str().unwrap();
  let (status, _) = send(&state, "DELETE", &format!("/worlds/{root_id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_names_are_rejected() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let (status, body) =
    send(&state, "POST", "/universes", Some(&token), Some(json!({ "name": "   " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "name is required");
}

#[tokio::test]
async fn world_prefix_collisions_lengthen_across_universes() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let first = create_universe(&state, &token, "Star Wars").await;
  let second = create_universe(&state, &token, "Outra Galáxia").await;

  let a = create_world(&state, &token, &first, "Tatooine").await;
  let b = create_world(&state, &token, &second, "Tatooine").await;
  let c = create_world(&state, &token, &second, "Tatooine").await;
  assert_eq!(a["prefix"], "TAT");
  assert_eq!(b["prefix"], "TATO");
  assert_eq!(c["prefix"], "TAT2");

  let (status, body) = send(
    &state,
    "POST",
    "/worlds",
    Some(&token),
    Some(json!({ "universe_id": first, "name": "Hoth", "prefix": "tat" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "prefix already in use");
}

#[tokio::test]
async fn generated_prefixes_can_be_sent_back_unchanged() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Star Wars").await;

  let x = create_world(&state, &token, &universe_id, "X").await;
  let droid = create_world(&state, &token, &universe_id, "R2-D2").await;
  assert_eq!(x["prefix"], "X");
  assert_eq!(droid["prefix"], "R2-");

  for (world, name, prefix) in [(&x, "X", "X"), (&droid, "R2-D2", "r2-")] {
    let id = world["id"].as_str().unwrap();
    let (status, body) = send(
      &state,
      "PUT",
      &format!("/worlds/{id}"),
      Some(&token),
      Some(json!({ "name": name, "prefix": prefix })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["world"]["prefix"], world["prefix"]);
  }

  // A new malformed prefix is still refused.
  let id = x["id"].as_str().unwrap();
  let (status, _) = send(
    &state,
    "PUT",
    &format!("/worlds/{id}"),
    Some(&token),
    Some(json!({ "name": "X", "prefix": "Y" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, body) = send(
    &state,
    "POST",
    "/categories",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "label": "Q" })),
  )
  .await;
  assert_eq!(body["category"]["prefix"], "Q");
  let id = body["category"]["id"].as_str().unwrap();
  let (status, body) = send(
    &state,
    "PUT",
    &format!("/categories/{id}"),
    Some(&token),
    Some(json!({ "label": "Q", "prefix": " q " })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["category"]["prefix"], "Q");
}

#[tokio::test]
async fn other_users_cannot_see_a_universe() {
  let state = make_state(false).await;
  let ana = signup(&state, "ana@example.com").await;
  let bia = signup(&state, "bia@example.com").await;
  let universe_id = create_universe(&state, &ana, "Duna").await;

  let (status, body) =
    send(&state, "GET", &format!("/universes/{universe_id}"), Some(&bia), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "universe not found");

  let (_, body) = send(&state, "GET", "/universes", Some(&bia), None).await;
  assert_eq!(body["universes"], json!([]));
}

#[tokio::test]
async fn reorder_assigns_positions() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;
  let x = create_world(&state, &token, &universe_id, "Xandar").await;
  let y = create_world(&state, &token, &universe_id, "Yavin").await;

  let (_, body) =
    send(&state, "GET", &format!("/worlds?universe_id={universe_id}"), Some(&token), None).await;
  let root = body["worlds"][0]["id"].clone();

  let (status, body) = send(
    &state,
    "PATCH",
    "/worlds/reorder",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "world_ids": [y["id"], root, x["id"]] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let names: Vec<&str> = body["worlds"]
    .as_array()
    .unwrap()
    .iter()
    .map(|w| w["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, ["Yavin", "Global", "Xandar"]);

  let (status, _) = send(
    &state,
    "PATCH",
    "/worlds/reorder",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "world_ids": [y["id"]] })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Categories ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn base_categories_are_listed_first_and_read_only() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;

  let (status, body) = send(
    &state,
    "POST",
    "/categories",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "label": "Nave Espacial" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["category"]["slug"], "nave-espacial");
  assert_eq!(body["category"]["prefix"], "NE");

  let (_, body) = send(
    &state,
    "GET",
    &format!("/categories?universe_id={universe_id}"),
    Some(&token),
    None,
  )
  .await;
  let categories = body["categories"].as_array().unwrap();
  assert_eq!(categories[0]["slug"], "personagem");
  assert_eq!(categories.last().unwrap()["slug"], "nave-espacial");

  let base_id = categories[0]["id"].as_str().unwrap();
  let (status, body) = send(
    &state,
    "PUT",
    &format!("/categories/{base_id}"),
    Some(&token),
    Some(json!({ "label": "Gente" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "base categories cannot be modified");

  let (status, _) =
    send(&state, "DELETE", &format!("/categories/{base_id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn category_prefix_avoids_base_prefixes() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;

  let (status, body) = send(
    &state,
    "POST",
    "/categories",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "label": "Personalidade" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["category"]["prefix"], "PERS");
}

// ─── Fichas ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ficha_codes_count_per_stem() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Terra Média").await;
  let world = create_world(&state, &token, &universe_id, "Saga").await;

  let first = create_ficha(
    &state,
    &token,
    json!({
      "universe_id": universe_id,
      "world_id": world["id"],
      "category": "personagem",
      "title": "Aragorn",
      "tags": [" Rei ", "rei", "ranger"],
    }),
  )
  .await;
  assert_eq!(first["code"], "SAG-PER-001");
  assert_eq!(first["tags"], json!(["rei", "ranger"]));
  assert_eq!(first["has_embedding"], false);

  let second = create_ficha(
    &state,
    &token,
    json!({
      "universe_id": universe_id,
      "world_id": world["id"],
      "category": "personagem",
      "title": "Legolas",
    }),
  )
  .await;
  assert_eq!(second["code"], "SAG-PER-002");

  let global = create_ficha(
    &state,
    &token,
    json!({ "universe_id": universe_id, "category": "regra", "title": "O Um Anel" }),
  )
  .await;
  assert_eq!(global["code"], "TM-REG-001");
  assert_eq!(global["world_id"], Value::Null);

  let (status, body) = send(
    &state,
    "POST",
    "/fichas",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "category": "local", "title": "Valfenda" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "world_id is required for local");

  let (_, body) =
    send(&state, "GET", &format!("/fichas?universe_id={universe_id}&q=gol"), Some(&token), None)
      .await;
  let titles: Vec<&str> = body["fichas"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["title"].as_str().unwrap())
    .collect();
  assert_eq!(titles, ["Legolas"]);
}

#[tokio::test]
async fn one_sinopse_per_episode() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;
  let world = create_world(&state, &token, &universe_id, "Kepler").await;

  let (status, body) = send(
    &state,
    "POST",
    "/episodes",
    Some(&token),
    Some(json!({ "world_id": world["id"], "number": 1, "title": "Piloto" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let episode_id = body["episode"]["id"].clone();

  let sinopse = json!({
    "universe_id": universe_id,
    "world_id": world["id"],
    "category": "sinopse",
    "title": "Piloto",
    "episode_id": episode_id,
  });
  let first = create_ficha(&state, &token, sinopse.clone()).await;
  assert_eq!(first["code"], "KEP-SIN-001");

  let (status, body) = send(&state, "POST", "/fichas", Some(&token), Some(sinopse)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "this episode already has a sinopse");

  let (status, _) = send(
    &state,
    "POST",
    "/episodes",
    Some(&token),
    Some(json!({ "world_id": world["id"], "number": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn episode_with_a_sinopse_cannot_be_deleted() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;
  let world = create_world(&state, &token, &universe_id, "Kepler").await;

  let (_, body) = send(
    &state,
    "POST",
    "/episodes",
    Some(&token),
    Some(json!({ "world_id": world["id"], "number": 1 })),
  )
  .await;
  let episode_id = body["episode"]["id"].as_str().unwrap().to_owned();
  let sinopse = create_ficha(
    &state,
    &token,
    json!({
      "universe_id": universe_id,
      "world_id": world["id"],
      "category": "sinopse",
      "title": "Piloto",
      "episode_id": episode_id,
    }),
  )
  .await;
  let sinopse_id = sinopse["id"].as_str().unwrap();

  let (status, body) =
    send(&state, "DELETE", &format!("/episodes/{episode_id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("KEP-SIN-001"));

  // The sinopse is untouched and still editable.
  let (status, body) = send(
    &state,
    "PUT",
    &format!("/fichas/{sinopse_id}"),
    Some(&token),
    Some(json!({ "title": "Piloto 2", "episode_id": episode_id })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["ficha"]["episode_id"], episode_id.as_str());

  let (status, _) =
    send(&state, "DELETE", &format!("/fichas/{sinopse_id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) =
    send(&state, "DELETE", &format!("/episodes/{episode_id}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Relations ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn relations_reject_self_and_duplicates() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;
  let world = create_world(&state, &token, &universe_id, "Arrakis").await;
  let ficha = |title: &str| {
    json!({
      "universe_id": universe_id,
      "world_id": world["id"],
      "category": "personagem",
      "title": title,
    })
  };
  let paul = create_ficha(&state, &token, ficha("Paul")).await;
  let jessica = create_ficha(&state, &token, ficha("Jessica")).await;

  let (status, _) = send(
    &state,
    "POST",
    "/relations",
    Some(&token),
    Some(json!({ "source_id": paul["id"], "target_id": paul["id"], "relation_type": "ally_of" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let relation = json!({
    "source_id": jessica["id"],
    "target_id": paul["id"],
    "relation_type": "parent_of",
  });
  let (status, body) =
    send(&state, "POST", "/relations", Some(&token), Some(relation.clone())).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");

  let (status, body) = send(&state, "POST", "/relations", Some(&token), Some(relation)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "relation already exists");

  let paul_id = paul["id"].as_str().unwrap();
  let (_, body) =
    send(&state, "GET", &format!("/relations?ficha_id={paul_id}"), Some(&token), None).await;
  assert_eq!(body["relations"].as_array().unwrap().len(), 1);

  let (status, body) = send(&state, "GET", "/relations/types", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["relation_types"].as_array().unwrap().contains(&json!("parent_of")));
}

#[tokio::test]
async fn relation_patch_can_clear_the_description() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;
  let world = create_world(&state, &token, &universe_id, "Arrakis").await;
  let ficha = |title: &str| {
    json!({
      "universe_id": universe_id,
      "world_id": world["id"],
      "category": "personagem",
      "title": title,
    })
  };
  let paul = create_ficha(&state, &token, ficha("Paul")).await;
  let chani = create_ficha(&state, &token, ficha("Chani")).await;

  let (_, body) = send(
    &state,
    "POST",
    "/relations",
    Some(&token),
    Some(json!({
      "source_id": paul["id"],
      "target_id": chani["id"],
      "relation_type": "friend_of",
      "description": "Conheceram-se no sietch",
    })),
  )
  .await;
  let id = body["relation"]["id"].as_str().unwrap().to_owned();
  let uri = format!("/relations/{id}");

  let (status, body) =
    send(&state, "PATCH", &uri, Some(&token), Some(json!({ "relation_type": "spouse_of" }))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["relation"]["relation_type"], "spouse_of");
  assert_eq!(body["relation"]["description"], "Conheceram-se no sietch");

  let (status, body) =
    send(&state, "PATCH", &uri, Some(&token), Some(json!({ "description": null }))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["relation"]["description"], Value::Null);
  assert_eq!(body["relation"]["relation_type"], "spouse_of");
}

// ─── Uploads ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_upload_appends_to_album() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;
  let ficha = create_ficha(
    &state,
    &token,
    json!({ "universe_id": universe_id, "category": "conceito", "title": "A Força" }),
  )
  .await;
  let ficha_id = ficha["id"].as_str().unwrap();

  let body = multipart("forca.png", "image/png", b"\x89PNG fake", &[("ficha_id", ficha_id)]);
  let (status, resp) = send_multipart(&state, "/images", &token, body).await;
  assert_eq!(status, StatusCode::CREATED, "{resp}");
  let url = resp["image"]["url"].as_str().unwrap().to_owned();
  assert!(url.starts_with("http://media.test/"));
  assert!(url.ends_with(".png"));

  let (_, resp) = send(&state, "GET", &format!("/fichas/{ficha_id}"), Some(&token), None).await;
  assert_eq!(resp["ficha"]["images"], json!([url]));
}

#[tokio::test]
async fn image_upload_rejects_unlisted_types() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let body = multipart("logo.svg", "image/svg+xml", b"<svg/>", &[]);
  let (status, resp) = send_multipart(&state, "/images", &token, body).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(resp["error"].as_str().unwrap().contains("unsupported image type"));
}

#[tokio::test]
async fn documents_are_parsed_to_text() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;

  let body = multipart("cap1.md", "text/markdown", "# Capítulo 1\n\nEra uma vez.".as_bytes(), &[]);
  let (status, resp) = send_multipart(&state, "/documents/parse", &token, body).await;
  assert_eq!(status, StatusCode::OK, "{resp}");
  assert_eq!(resp["document"]["kind"], "markdown");
  assert!(resp["document"]["text"].as_str().unwrap().contains("Era uma vez."));

  let body = multipart("planilha.xlsx", "application/octet-stream", b"PK", &[]);
  let (status, _) = send_multipart(&state, "/documents/parse", &token, body).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Language model ───────────────────────────────────────────────────────────

#[tokio::test]
async fn ai_routes_fail_without_a_model() {
  let state = make_state(false).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;

  let (status, body) = send(
    &state,
    "POST",
    "/extract",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "text": "Paul chega a Arrakis." })),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["error"], "language model is not configured");
}

#[tokio::test]
async fn extraction_returns_the_model_answer() {
  let state = make_state(true).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;

  let (status, body) = send(
    &state,
    "POST",
    "/extract",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "text": "Paul chega a Arrakis." })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["extraction"]["entities"][0]["name"], "Paul");
  assert_eq!(body["extraction"]["relations"], json!([]));

  let (status, _) = send(
    &state,
    "POST",
    "/extract",
    Some(&token),
    Some(json!({ "universe_id": universe_id, "text": "  " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn semantic_search_ranks_embedded_fichas() {
  let state = make_state(true).await;
  let token = signup(&state, "ana@example.com").await;
  let universe_id = create_universe(&state, &token, "Saga").await;
  let ficha = |title: &str| {
    json!({ "universe_id": universe_id, "category": "conceito", "title": title })
  };
  let near = create_ficha(&state, &token, ficha("aaaa")).await;
  let far = create_ficha(&state, &token, ficha("xyz")).await;
  create_ficha(&state, &token, ficha("never embedded")).await;

  for f in [&near, &far] {
    let id = f["id"].as_str().unwrap();
    let (status, body) =
      send(&state, "POST", &format!("/fichas/{id}/embedding"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ficha"]["has_embedding"], true);
    assert!(body["ficha"].get("embedding").is_none());
  }

  let (status, body) = send(
    &state,
    "GET",
    &format!("/search/semantic?universe_id={universe_id}&q=aeio"),
    Some(&token),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let results = body["results"].as_array().unwrap();
  assert_eq!(results.len(), 2);
  assert_eq!(results[0]["ficha"]["title"], "aaaa");
  assert_eq!(results[1]["ficha"]["title"], "xyz");
}
