//! Handlers for `/forms` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/forms` | `?cycle_id=&status=&kind=`; scope narrows by role |
//! | `POST` | `/forms` | Body: [`NewFormRequest`] |
//! | `GET`  | `/forms/:id` | Form plus sorted items |
//! | `PUT`  | `/forms/:id/items` | Body: full target item list |
//! | `POST` | `/forms/:id/submit` | |
//! | `POST` | `/forms/:id/review` | Body: `{"comments": ...}` |
//! | `POST` | `/forms/:id/finalize` | Body: `{"ratings": [...], "remarks": ...}` |
//! | `POST` | `/forms/:id/approve` | Same body as finalize |
//! | `POST` | `/forms/:id/return` | Body: `{"remarks": "..."}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use pcr_core::{
  form::PerformanceForm,
  item::{ItemRating, LineItem, LineItemDraft},
  store::{FormSummary, ReviewStore},
};
use pcr_engine::{FormWithItems, ListFilter, NewFormRequest, WorkflowEngine};
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::ActorHeader, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /forms`
pub async fn create<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Json(body): Json<NewFormRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore + 'static,
{
  let form = engine.create_form(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(form)))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /forms[?cycle_id=&status=&kind=]`
pub async fn list<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<FormSummary>>, ApiError>
where
  S: ReviewStore + 'static,
{
  let forms = engine.list_forms(&actor, filter).await?;
  Ok(Json(forms))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /forms/:id`
pub async fn get_one<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Path(id): Path<Uuid>,
) -> Result<Json<FormWithItems>, ApiError>
where
  S: ReviewStore + 'static,
{
  let form = engine.get_form(&actor, id).await?;
  Ok(Json(form))
}

// ─── Item save ───────────────────────────────────────────────────────────────

/// `PUT /forms/:id/items` — body: the full target item list.
pub async fn save_items<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Path(id): Path<Uuid>,
  Json(drafts): Json<Vec<LineItemDraft>>,
) -> Result<Json<Vec<LineItem>>, ApiError>
where
  S: ReviewStore + 'static,
{
  let items = engine.save_line_items(&actor, id, drafts).await?;
  Ok(Json(items))
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// `POST /forms/:id/submit`
pub async fn submit<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Path(id): Path<Uuid>,
) -> Result<Json<PerformanceForm>, ApiError>
where
  S: ReviewStore + 'static,
{
  let form = engine.submit(&actor, id).await?;
  Ok(Json(form))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  #[serde(default)]
  pub comments: Option<String>,
}

/// `POST /forms/:id/review`
pub async fn review<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<PerformanceForm>, ApiError>
where
  S: ReviewStore + 'static,
{
  let form = engine.review(&actor, id, body.comments).await?;
  Ok(Json(form))
}

#[derive(Debug, Deserialize)]
pub struct RatingsBody {
  pub ratings: Vec<ItemRating>,
  #[serde(default)]
  pub remarks: Option<String>,
}

/// `POST /forms/:id/finalize`
pub async fn finalize<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Path(id): Path<Uuid>,
  Json(body): Json<RatingsBody>,
) -> Result<Json<FormWithItems>, ApiError>
where
  S: ReviewStore + 'static,
{
  let closed = engine
    .finalize(&actor, id, body.ratings, body.remarks)
    .await?;
  Ok(Json(closed))
}

/// `POST /forms/:id/approve`
pub async fn approve<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Path(id): Path<Uuid>,
  Json(body): Json<RatingsBody>,
) -> Result<Json<FormWithItems>, ApiError>
where
  S: ReviewStore + 'static,
{
  let closed = engine
    .approve(&actor, id, body.ratings, body.remarks)
    .await?;
  Ok(Json(closed))
}

#[derive(Debug, Deserialize)]
pub struct ReturnBody {
  pub remarks: String,
}

/// `POST /forms/:id/return`
pub async fn return_form<S>(
  State(engine): State<WorkflowEngine<S>>,
  ActorHeader(actor): ActorHeader,
  Path(id): Path<Uuid>,
  Json(body): Json<ReturnBody>,
) -> Result<Json<PerformanceForm>, ApiError>
where
  S: ReviewStore + 'static,
{
  let form = engine.return_form(&actor, id, body.remarks).await?;
  Ok(Json(form))
}
