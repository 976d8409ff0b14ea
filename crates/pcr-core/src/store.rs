//! The `ReviewStore` trait and supporting query/patch types.
//!
//! The trait is implemented by storage backends (e.g.
//! `pcr-store-sqlite`). The engine depends on this abstraction, not on
//! any concrete backend. The single most important contract here is
//! [`ReviewStore::transition_form`]: every status change is a
//! conditional write on the status observed at read time, and a write
//! that affects zero rows is reported as `false`, never a silent
//! success.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  form::{FormKind, FormStatus, NewForm, PerformanceForm},
  item::LineItem,
  rating::AdjectivalRating,
  reconcile::ReconcilePlan,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`ReviewStore::list_forms`].
#[derive(Debug, Clone, Default)]
pub struct FormQuery {
  pub cycle_id:   Option<Uuid>,
  pub status:     Option<FormStatus>,
  pub kind:       Option<FormKind>,
  /// Restrict to forms of a single subject (staff self-view).
  pub subject_id: Option<Uuid>,
  /// Restrict to forms in any of these units (reviewer scope). `None`
  /// means no unit restriction.
  pub unit_scope: Option<Vec<Uuid>>,
}

/// One row of a form listing: the form plus its line-item count.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FormSummary {
  #[serde(flatten)]
  pub form:       PerformanceForm,
  pub item_count: u64,
}

// ─── Patch types ─────────────────────────────────────────────────────────────

/// The field changes carried by one status transition.
///
/// `None` fields are left untouched by the store. Each transition sets
/// only the fields the state-machine table assigns to it.
#[derive(Debug, Clone)]
pub struct FormPatch {
  pub status:               FormStatus,
  pub updated_at:           DateTime<Utc>,
  pub reviewer_id:          Option<Uuid>,
  pub approver_id:          Option<Uuid>,
  pub review_comments:      Option<String>,
  pub remarks:              Option<String>,
  pub submitted_at:         Option<DateTime<Utc>>,
  pub reviewed_at:          Option<DateTime<Utc>>,
  pub finalized_at:         Option<DateTime<Utc>>,
  pub final_average_rating: Option<f64>,
  pub adjectival_rating:    Option<AdjectivalRating>,
}

impl FormPatch {
  /// A patch that only moves the status and bumps `updated_at`.
  pub fn status_only(status: FormStatus) -> Self {
    Self {
      status,
      updated_at: Utc::now(),
      reviewer_id: None,
      approver_id: None,
      review_comments: None,
      remarks: None,
      submitted_at: None,
      reviewed_at: None,
      finalized_at: None,
      final_average_rating: None,
      adjectival_rating: None,
    }
  }
}

/// One item's computed rating, persisted during finalize/approve.
#[derive(Debug, Clone, Copy)]
pub struct RatedItem {
  pub item_id:    Uuid,
  pub quantity:   f64,
  pub efficiency: f64,
  pub timeliness: f64,
  /// The per-item criterion mean, already rounded.
  pub average:    f64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a performance-review record store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ReviewStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Forms ─────────────────────────────────────────────────────────

  /// Insert a new form in `draft` status. The store assigns the id and
  /// timestamps. Deduplication is the engine's job via
  /// [`Self::find_form_by_key`].
  fn insert_form(
    &self,
    input: NewForm,
  ) -> impl Future<Output = Result<PerformanceForm, Self::Error>> + Send + '_;

  /// Look up a form by its uniqueness key: (cycle, subject) for
  /// individual forms, (cycle, unit) for department/office forms.
  fn find_form_by_key(
    &self,
    kind: FormKind,
    cycle_id: Uuid,
    subject_id: Option<Uuid>,
    unit_id: Uuid,
  ) -> impl Future<Output = Result<Option<PerformanceForm>, Self::Error>> + Send + '_;

  /// Retrieve a form by id. Returns `None` if not found.
  fn get_form(
    &self,
    form_id: Uuid,
  ) -> impl Future<Output = Result<Option<PerformanceForm>, Self::Error>> + Send + '_;

  /// List forms matching `query`, each with its item count.
  fn list_forms<'a>(
    &'a self,
    query: &'a FormQuery,
  ) -> impl Future<Output = Result<Vec<FormSummary>, Self::Error>> + Send + 'a;

  // ── Items ─────────────────────────────────────────────────────────

  /// All items of a form, sorted by category rank then `sort_order`.
  fn list_items(
    &self,
    form_id: Uuid,
  ) -> impl Future<Output = Result<Vec<LineItem>, Self::Error>> + Send + '_;

  fn count_items(
    &self,
    form_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Apply a reconciliation plan in one transaction: updates, then
  /// inserts, then deletes, plus a bump of the form's `updated_at`.
  /// A partial failure must leave the item set untouched.
  ///
  /// The whole transaction is gated on the form still being editable
  /// (`draft` or `returned`) at write time; `false` means the status
  /// moved since it was read and nothing was changed.
  fn apply_plan(
    &self,
    form_id: Uuid,
    plan: ReconcilePlan,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Conditional writes ────────────────────────────────────────────

  /// Compare-and-swap status transition:
  /// `UPDATE … WHERE form_id = ? AND status = expected`.
  ///
  /// Returns `false` when zero rows were affected — the caller lost a
  /// race or the status moved since it was read.
  fn transition_form(
    &self,
    form_id: Uuid,
    expected: FormStatus,
    patch: FormPatch,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Persist per-item rating results and the terminal form patch in
  /// one transaction, gated on the same compare-and-swap as
  /// [`Self::transition_form`]. A lost CAS rolls back the item writes
  /// and returns `false`.
  fn apply_ratings(
    &self,
    form_id: Uuid,
    expected: FormStatus,
    items: Vec<RatedItem>,
    patch: FormPatch,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
