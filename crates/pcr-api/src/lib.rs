//! JSON REST API for the performance commitment & review workflow.
//!
//! Exposes an axum [`Router`] backed by any
//! [`pcr_core::store::ReviewStore`] via the workflow engine. Identity
//! resolution, TLS, and transport concerns are the caller's
//! responsibility; each request carries its resolved actor in the
//! `X-Actor` header (see [`auth`]).

pub mod auth;
pub mod error;
pub mod forms;

use std::path::PathBuf;

use axum::{
  Router,
  routing::{get, post, put},
};
use pcr_core::store::ReviewStore;
use pcr_engine::WorkflowEngine;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(engine: WorkflowEngine<S>) -> Router<()>
where
  S: ReviewStore + 'static,
{
  Router::new()
    .route("/forms", get(forms::list::<S>).post(forms::create::<S>))
    .route("/forms/{id}", get(forms::get_one::<S>))
    .route("/forms/{id}/items", put(forms::save_items::<S>))
    .route("/forms/{id}/submit", post(forms::submit::<S>))
    .route("/forms/{id}/review", post(forms::review::<S>))
    .route("/forms/{id}/finalize", post(forms::finalize::<S>))
    .route("/forms/{id}/approve", post(forms::approve::<S>))
    .route("/forms/{id}/return", post(forms::return_form::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use pcr_core::actor::{Actor, Role};
  use pcr_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(WorkflowEngine::new(Arc::new(store)))
  }

  fn staff(unit: Uuid) -> Actor {
    Actor {
      actor_id:         Uuid::new_v4(),
      role:             Role::Staff,
      unit_id:          Some(unit),
      supervised_units: vec![],
    }
  }

  fn chief(unit: Uuid) -> Actor {
    Actor {
      actor_id:         Uuid::new_v4(),
      role:             Role::DivisionChief,
      unit_id:          Some(unit),
      supervised_units: vec![],
    }
  }

  fn head() -> Actor {
    Actor {
      actor_id:         Uuid::new_v4(),
      role:             Role::OfficeHead,
      unit_id:          None,
      supervised_units: vec![],
    }
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
      builder = builder.header("x-actor", serde_json::to_string(actor).unwrap());
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn create_body(cycle: Uuid) -> Value {
    json!({ "kind": "individual", "cycle_id": cycle })
  }

  fn one_item() -> Value {
    json!([{ "category": "core_function", "description": "ship the thing" }])
  }

  // ── Auth ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_actor_header_returns_401() {
    let app = app().await;
    let resp = send(&app, "GET", "/forms", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn malformed_actor_header_returns_401() {
    let app = app().await;
    let req = Request::builder()
      .method("GET")
      .uri("/forms")
      .header("x-actor", "not json")
      .body(Body::empty())
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Create ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_returns_201_with_draft_form() {
    let app = app().await;
    let owner = staff(Uuid::new_v4());
    let resp = send(
      &app,
      "POST",
      "/forms",
      Some(&owner),
      Some(create_body(Uuid::new_v4())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let form = json_body(resp).await;
    assert_eq!(form["status"], "draft");
    assert_eq!(form["subject_id"], json!(owner.actor_id));
  }

  #[tokio::test]
  async fn duplicate_create_returns_409_with_existing_id() {
    let app = app().await;
    let owner = staff(Uuid::new_v4());
    let cycle = Uuid::new_v4();

    let first = send(&app, "POST", "/forms", Some(&owner), Some(create_body(cycle))).await;
    let form = json_body(first).await;

    let second = send(&app, "POST", "/forms", Some(&owner), Some(create_body(cycle))).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = json_body(second).await;
    assert_eq!(body["existing_form_id"], form["form_id"]);
  }

  // ── Reads ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn get_missing_form_returns_404() {
    let app = app().await;
    let uri = format!("/forms/{}", Uuid::new_v4());
    let resp = send(&app, "GET", &uri, Some(&head()), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn unrelated_staff_view_returns_403() {
    let app = app().await;
    let owner = staff(Uuid::new_v4());
    let resp = send(
      &app,
      "POST",
      "/forms",
      Some(&owner),
      Some(create_body(Uuid::new_v4())),
    )
    .await;
    let form = json_body(resp).await;

    let uri = format!("/forms/{}", form["form_id"].as_str().unwrap());
    let stranger = staff(Uuid::new_v4());
    let resp = send(&app, "GET", &uri, Some(&stranger), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  // ── Transition errors ───────────────────────────────────────────────

  #[tokio::test]
  async fn submit_without_items_returns_422() {
    let app = app().await;
    let owner = staff(Uuid::new_v4());
    let resp = send(
      &app,
      "POST",
      "/forms",
      Some(&owner),
      Some(create_body(Uuid::new_v4())),
    )
    .await;
    let form = json_body(resp).await;

    let uri = format!("/forms/{}/submit", form["form_id"].as_str().unwrap());
    let resp = send(&app, "POST", &uri, Some(&owner), None).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[tokio::test]
  async fn review_of_draft_returns_409() {
    let app = app().await;
    let unit = Uuid::new_v4();
    let owner = staff(unit);
    let resp = send(
      &app,
      "POST",
      "/forms",
      Some(&owner),
      Some(create_body(Uuid::new_v4())),
    )
    .await;
    let form = json_body(resp).await;

    let uri = format!("/forms/{}/review", form["form_id"].as_str().unwrap());
    let resp = send(&app, "POST", &uri, Some(&chief(unit)), Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  // ── Full lifecycle ──────────────────────────────────────────────────

  #[tokio::test]
  async fn individual_lifecycle_over_http() {
    let app = app().await;
    let unit = Uuid::new_v4();
    let owner = staff(unit);
    let reviewer = chief(unit);
    let approver = head();

    let resp = send(
      &app,
      "POST",
      "/forms",
      Some(&owner),
      Some(create_body(Uuid::new_v4())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let form = json_body(resp).await;
    let id = form["form_id"].as_str().unwrap().to_string();

    // Save one item.
    let resp = send(
      &app,
      "PUT",
      &format!("/forms/{id}/items"),
      Some(&owner),
      Some(one_item()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let items = json_body(resp).await;
    let item_id = items[0]["item_id"].clone();

    // Submit.
    let resp = send(&app, "POST", &format!("/forms/{id}/submit"), Some(&owner), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "submitted");

    // Review.
    let resp = send(
      &app,
      "POST",
      &format!("/forms/{id}/review"),
      Some(&reviewer),
      Some(json!({ "comments": "ok" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "reviewed");

    // Finalize with perfect marks.
    let resp = send(
      &app,
      "POST",
      &format!("/forms/{id}/finalize"),
      Some(&approver),
      Some(json!({
        "ratings": [{
          "item_id": item_id,
          "quantity": 5.0,
          "efficiency": 5.0,
          "timeliness": 5.0,
        }],
        "remarks": "good year",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let closed = json_body(resp).await;
    assert_eq!(closed["form"]["status"], "finalized");
    assert_eq!(closed["form"]["final_average_rating"], json!(5.0));
    assert_eq!(closed["form"]["adjectival_rating"], "outstanding");
    assert_eq!(closed["items"][0]["rating_average"], json!(5.0));

    // Listing as office head shows the item count.
    let resp = send(&app, "GET", "/forms", Some(&approver), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = json_body(resp).await;
    assert_eq!(listed[0]["item_count"], json!(1));
  }
}
