//! Integration tests for `SqliteStore` against an in-memory database.

use blake_core::{
  category::{BASE_CATEGORIES, CategoryUpdate, NewCategory, PERSONAGEM, SINOPSE},
  episode::{EpisodeUpdate, NewEpisode},
  ficha::{FichaQuery, FichaUpdate, NewFicha},
  relation::{NewRelation, RelationType, RelationUpdate},
  session::SessionRecord,
  store::VisionStore,
  universe::{NewUniverse, ROOT_WORLD_NAME, Universe, UniverseUpdate},
  world::{NewWorld, World, WorldUpdate},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn universe(s: &SqliteStore, owner: Uuid, name: &str, prefix: &str) -> (Universe, World) {
  s.create_universe(owner, NewUniverse {
    name:              name.into(),
    description:       None,
    root_world_prefix: prefix.into(),
  })
  .await
  .unwrap()
}

async fn world(s: &SqliteStore, owner: Uuid, universe_id: Uuid, name: &str, prefix: &str) -> World {
  s.create_world(owner, NewWorld {
    universe_id,
    name: name.into(),
    description: None,
    has_episodes: true,
    prefix: prefix.into(),
  })
  .await
  .unwrap()
}

fn ficha(universe_id: Uuid, world_id: Option<Uuid>, category: &str, title: &str, code: &str) -> NewFicha {
  NewFicha {
    universe_id,
    world_id,
    category: category.into(),
    title: title.into(),
    code: code.into(),
    summary: None,
    content: None,
    tags: vec![],
    diegetic_year: None,
    temporal_layer: None,
    episode_id: None,
    images: vec![],
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn credentials_round_trip_by_email() {
  let s = store().await;
  let user = s.create_user("ana@example.com".into(), "hash".into()).await.unwrap();

  let creds = s.find_credentials("ana@example.com".into()).await.unwrap().unwrap();
  assert_eq!(creds.user.id, user.id);
  assert_eq!(creds.password_hash, "hash");

  assert!(s.find_credentials("bob@example.com".into()).await.unwrap().is_none());
  assert_eq!(s.get_user(user.id).await.unwrap().unwrap().email, "ana@example.com");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  s.create_user("ana@example.com".into(), "a".into()).await.unwrap();
  assert!(s.create_user("ana@example.com".into(), "b".into()).await.is_err());
}

#[tokio::test]
async fn expired_sessions_resolve_to_nobody() {
  let s = store().await;
  let user = s.create_user("ana@example.com".into(), "hash".into()).await.unwrap();
  let now = Utc::now();

  s.create_session(SessionRecord {
    token_hash: "live".into(),
    user_id:    user.id,
    created_at: now,
    expires_at: now + Duration::hours(1),
  })
  .await
  .unwrap();
  s.create_session(SessionRecord {
    token_hash: "stale".into(),
    user_id:    user.id,
    created_at: now - Duration::hours(2),
    expires_at: now - Duration::hours(1),
  })
  .await
  .unwrap();

  assert_eq!(s.session_user("live".into(), now).await.unwrap(), Some(user.id));
  assert_eq!(s.session_user("stale".into(), now).await.unwrap(), None);
  assert_eq!(s.session_user("unknown".into(), now).await.unwrap(), None);

  s.delete_session("live".into()).await.unwrap();
  assert_eq!(s.session_user("live".into(), now).await.unwrap(), None);
}

// ─── Universes and worlds ────────────────────────────────────────────────────

#[tokio::test]
async fn universe_comes_with_a_root_world() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Terra Média", "TM").await;

  assert!(root.is_root);
  assert_eq!(root.name, ROOT_WORLD_NAME);
  assert_eq!(root.universe_id, u.id);
  assert_eq!(root.order_index, 0);

  let fetched = s.root_world(owner, u.id).await.unwrap().unwrap();
  assert_eq!(fetched.id, root.id);
  assert_eq!(s.list_universes(owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn other_owners_see_nothing() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let stranger = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Terra Média", "TM").await;

  assert!(s.list_universes(stranger).await.unwrap().is_empty());
  assert!(s.get_universe(stranger, u.id).await.unwrap().is_none());
  assert!(s.get_world(stranger, root.id).await.unwrap().is_none());
  assert!(!s.delete_universe(stranger, u.id).await.unwrap());
  assert!(
    s.update_universe(stranger, u.id, UniverseUpdate { name: "x".into(), description: None })
      .await
      .unwrap()
      .is_none()
  );
  assert!(s.get_universe(owner, u.id).await.unwrap().is_some());
}

#[tokio::test]
async fn world_order_index_grows_and_reorders() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  let a = world(&s, owner, u.id, "Arrakis", "ARR").await;
  let b = world(&s, owner, u.id, "Caladan", "CAL").await;
  assert_eq!(a.order_index, 1);
  assert_eq!(b.order_index, 2);

  let reordered = s.reorder_worlds(owner, u.id, vec![b.id, root.id, a.id]).await.unwrap();
  let ids: Vec<Uuid> = reordered.iter().map(|w| w.id).collect();
  assert_eq!(ids, vec![b.id, root.id, a.id]);
}

#[tokio::test]
async fn world_prefixes_span_all_universes_of_an_owner() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u1, _) = universe(&s, owner, "One", "ONE").await;
  let (_, _) = universe(&s, owner, "Two", "TWO").await;
  world(&s, owner, u1.id, "Arrakis", "ARR").await;
  universe(&s, Uuid::new_v4(), "Other", "OTH").await;

  let prefixes = s.world_prefixes(owner).await.unwrap();
  let mut sorted: Vec<_> = prefixes.into_iter().collect();
  sorted.sort();
  assert_eq!(sorted, vec!["ARR", "ONE", "TWO"]);
}

#[tokio::test]
async fn duplicate_world_prefix_for_same_owner_fails() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;
  let result = s
    .create_world(owner, NewWorld {
      universe_id:  u.id,
      name:         "Sagitário".into(),
      description:  None,
      has_episodes: false,
      prefix:       "SAG".into(),
    })
    .await;
  assert!(result.is_err());

  // another owner may reuse it
  universe(&s, Uuid::new_v4(), "Saga", "SAG").await;
}

#[tokio::test]
async fn root_world_cannot_be_deleted() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  let w = world(&s, owner, u.id, "Arrakis", "ARR").await;

  assert!(!s.delete_world(owner, root.id).await.unwrap());
  assert!(s.delete_world(owner, w.id).await.unwrap());
  assert_eq!(s.list_worlds(owner, u.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn world_update_changes_fields() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;
  let w = world(&s, owner, u.id, "Arrakis", "ARR").await;

  let updated = s
    .update_world(owner, w.id, WorldUpdate {
      name:         "Dune".into(),
      description:  Some("desert".into()),
      has_episodes: false,
      prefix:       "DUN".into(),
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.name, "Dune");
  assert_eq!(updated.prefix, "DUN");
  assert!(!updated.has_episodes);
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn base_categories_are_seeded_once() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;

  let categories = s.list_categories(owner, u.id).await.unwrap();
  assert_eq!(categories.len(), BASE_CATEGORIES.len());
  assert!(categories.iter().all(|c| c.is_base()));
  assert_eq!(categories[0].slug, PERSONAGEM);

  let prefixes = s.category_prefixes(owner).await.unwrap();
  assert!(prefixes.contains("PER"));
  assert!(prefixes.contains("SIN"));
}

#[tokio::test]
async fn custom_categories_follow_base_ones_and_stay_private() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;
  let created = s
    .create_category(owner, NewCategory {
      universe_id: u.id,
      slug:        "artefato".into(),
      label:       "Artefato".into(),
      description: None,
      prefix:      "ART".into(),
    })
    .await
    .unwrap();

  let categories = s.list_categories(owner, u.id).await.unwrap();
  assert_eq!(categories.last().unwrap().id, created.id);

  let found = s.find_category(owner, u.id, "artefato".into()).await.unwrap();
  assert_eq!(found.unwrap().id, created.id);
  let base = s.find_category(owner, u.id, SINOPSE.into()).await.unwrap().unwrap();
  assert!(base.is_base());

  let stranger = Uuid::new_v4();
  assert!(s.get_category(stranger, created.id).await.unwrap().is_none());
  assert!(!s.category_prefixes(stranger).await.unwrap().contains("ART"));
}

#[tokio::test]
async fn base_categories_cannot_be_updated_or_deleted() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;
  let base = s.find_category(owner, u.id, PERSONAGEM.into()).await.unwrap().unwrap();

  let updated = s
    .update_category(owner, base.id, CategoryUpdate {
      label:       "Pessoa".into(),
      description: None,
      prefix:      "PES".into(),
    })
    .await
    .unwrap();
  assert!(updated.is_none());
  assert!(!s.delete_category(owner, base.id).await.unwrap());
}

// ─── Fichas ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn codes_with_stem_matches_prefix_only() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Ana", "SAG-PER-001")).await.unwrap();
  s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Bia", "SAG-PER-002")).await.unwrap();
  s.create_ficha(owner, ficha(u.id, Some(root.id), "local", "Casa", "SAG-LOC-001")).await.unwrap();

  let mut codes = s.codes_with_stem(owner, "SAG-PER-".into()).await.unwrap();
  codes.sort();
  assert_eq!(codes, vec!["SAG-PER-001", "SAG-PER-002"]);
}

#[tokio::test]
async fn ficha_filters_by_tag_text_and_category() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;

  let mut hero = ficha(u.id, Some(root.id), PERSONAGEM, "Paul Atreides", "SAG-PER-001");
  hero.tags = vec!["protagonista".into()];
  hero.summary = Some("Duke heir".into());
  s.create_ficha(owner, hero).await.unwrap();
  s.create_ficha(owner, ficha(u.id, Some(root.id), "local", "Arrakeen", "SAG-LOC-001")).await.unwrap();

  let by_tag = s
    .list_fichas(owner, &FichaQuery { tag: Some("protagonista".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_tag.len(), 1);
  assert_eq!(by_tag[0].title, "Paul Atreides");

  let by_text = s
    .list_fichas(owner, &FichaQuery { text: Some("heir".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);

  let by_category = s
    .list_fichas(owner, &FichaQuery {
      universe_id: Some(u.id),
      category: Some("local".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_category.len(), 1);
  assert_eq!(by_category[0].code, "SAG-LOC-001");

  let paged = s
    .list_fichas(owner, &FichaQuery { limit: Some(1), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(paged.len(), 1);
  assert_eq!(paged[0].title, "Arrakeen");

  let stranger = s.list_fichas(Uuid::new_v4(), &FichaQuery::default()).await.unwrap();
  assert!(stranger.is_empty());
}

#[tokio::test]
async fn oversized_paging_saturates_instead_of_wrapping() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Ana", "SAG-PER-001")).await.unwrap();
  s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Bia", "SAG-PER-002")).await.unwrap();

  let everything = s
    .list_fichas(owner, &FichaQuery { limit: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(everything.len(), 2);

  let past_the_end = s
    .list_fichas(owner, &FichaQuery { offset: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert!(past_the_end.is_empty());
}

#[tokio::test]
async fn ficha_update_and_embedding() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  let f = s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Ana", "SAG-PER-001")).await.unwrap();

  let updated = s
    .update_ficha(owner, f.id, FichaUpdate {
      title:          "Ana Clara".into(),
      summary:        Some("sister".into()),
      content:        None,
      tags:           vec!["família".into()],
      diegetic_year:  Some(1990),
      temporal_layer: None,
      episode_id:     None,
      images:         vec!["https://cdn/x.png".into()],
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.title, "Ana Clara");
  assert_eq!(updated.code, "SAG-PER-001");
  assert_eq!(updated.tags, vec!["família"]);
  assert_eq!(updated.images.len(), 1);

  assert!(s.embedded_fichas(owner, u.id).await.unwrap().is_empty());
  assert!(s.set_embedding(owner, f.id, vec![0.5, 0.25]).await.unwrap());
  let embedded = s.embedded_fichas(owner, u.id).await.unwrap();
  assert_eq!(embedded.len(), 1);
  assert_eq!(embedded[0].embedding.as_deref(), Some(&[0.5, 0.25][..]));
}

#[tokio::test]
async fn sinopse_is_unique_per_episode() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;
  let w = world(&s, owner, u.id, "Arrakis", "ARR").await;
  let ep = s
    .create_episode(owner, NewEpisode { world_id: w.id, number: 1, title: None })
    .await
    .unwrap();

  let mut first = ficha(u.id, Some(w.id), SINOPSE, "Piloto", "ARR-SIN-001");
  first.episode_id = Some(ep.id);
  let created = s.create_ficha(owner, first).await.unwrap();

  let found = s.find_sinopse(owner, w.id, ep.id).await.unwrap().unwrap();
  assert_eq!(found.id, created.id);

  let mut second = ficha(u.id, Some(w.id), SINOPSE, "Piloto 2", "ARR-SIN-002");
  second.episode_id = Some(ep.id);
  assert!(s.create_ficha(owner, second).await.is_err());
}

#[tokio::test]
async fn deleting_a_universe_cascades() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  let w = world(&s, owner, u.id, "Arrakis", "ARR").await;
  let a = s.create_ficha(owner, ficha(u.id, Some(w.id), PERSONAGEM, "Ana", "ARR-PER-001")).await.unwrap();
  let b = s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Bia", "SAG-PER-001")).await.unwrap();
  let rel = s
    .create_relation(owner, NewRelation {
      source_id:     a.id,
      target_id:     b.id,
      relation_type: RelationType::SiblingOf,
      description:   None,
    })
    .await
    .unwrap();

  assert!(s.delete_universe(owner, u.id).await.unwrap());
  assert!(s.get_world(owner, w.id).await.unwrap().is_none());
  assert!(s.get_ficha(owner, a.id).await.unwrap().is_none());
  assert!(s.get_relation(owner, rel.id).await.unwrap().is_none());
  assert!(s.world_prefixes(owner).await.unwrap().is_empty());
}

// ─── Episodes ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn episodes_are_numbered_uniquely_per_world() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;
  let w = world(&s, owner, u.id, "Arrakis", "ARR").await;

  s.create_episode(owner, NewEpisode { world_id: w.id, number: 2, title: None }).await.unwrap();
  let first = s
    .create_episode(owner, NewEpisode { world_id: w.id, number: 1, title: Some("Piloto".into()) })
    .await
    .unwrap();
  assert!(
    s.create_episode(owner, NewEpisode { world_id: w.id, number: 1, title: None })
      .await
      .is_err()
  );

  let listed = s.list_episodes(owner, w.id).await.unwrap();
  let numbers: Vec<i32> = listed.iter().map(|e| e.number).collect();
  assert_eq!(numbers, vec![1, 2]);

  let renumbered = s
    .update_episode(owner, first.id, EpisodeUpdate { number: 3, title: None })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(renumbered.number, 3);
}

#[tokio::test]
async fn deleting_an_episode_unlinks_its_fichas() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, _) = universe(&s, owner, "Saga", "SAG").await;
  let w = world(&s, owner, u.id, "Arrakis", "ARR").await;
  let ep = s.create_episode(owner, NewEpisode { world_id: w.id, number: 1, title: None }).await.unwrap();

  let mut input = ficha(u.id, Some(w.id), "roteiro", "Cena 1", "ARR-ROT-001");
  input.episode_id = Some(ep.id);
  let f = s.create_ficha(owner, input).await.unwrap();

  assert!(s.delete_episode(owner, ep.id).await.unwrap());
  let after = s.get_ficha(owner, f.id).await.unwrap().unwrap();
  assert_eq!(after.episode_id, None);
}

// ─── Relations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn relations_are_listed_from_either_end_and_unique() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  let a = s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Ana", "SAG-PER-001")).await.unwrap();
  let b = s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Bia", "SAG-PER-002")).await.unwrap();

  let input = NewRelation {
    source_id:     a.id,
    target_id:     b.id,
    relation_type: RelationType::FriendOf,
    description:   None,
  };
  let rel = s.create_relation(owner, input.clone()).await.unwrap();
  assert!(s.create_relation(owner, input).await.is_err());

  assert_eq!(s.list_relations(owner, a.id).await.unwrap().len(), 1);
  assert_eq!(s.list_relations(owner, b.id).await.unwrap().len(), 1);

  let found = s.find_relation(owner, a.id, b.id, RelationType::FriendOf).await.unwrap();
  assert_eq!(found.unwrap().id, rel.id);
  assert!(s.find_relation(owner, b.id, a.id, RelationType::FriendOf).await.unwrap().is_none());

  let updated = s
    .update_relation(owner, rel.id, RelationUpdate {
      relation_type: RelationType::EnemyOf,
      description:   Some("falling out".into()),
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.relation_type, RelationType::EnemyOf);

  assert!(s.delete_ficha(owner, b.id).await.unwrap());
  assert!(s.list_relations(owner, a.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn self_relations_are_rejected() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let (u, root) = universe(&s, owner, "Saga", "SAG").await;
  let a = s.create_ficha(owner, ficha(u.id, Some(root.id), PERSONAGEM, "Ana", "SAG-PER-001")).await.unwrap();

  let result = s
    .create_relation(owner, NewRelation {
      source_id:     a.id,
      target_id:     a.id,
      relation_type: RelationType::RelatedTo,
      description:   None,
    })
    .await;
  assert!(result.is_err());
}
