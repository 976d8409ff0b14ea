//! The performance-commitment form — one per subject per review cycle.
//!
//! A form is the parent record of the workflow: it owns a status, the
//! actor references set by each transition, and (once terminal) the
//! computed final rating. Its committed outputs live in
//! [`LineItem`](crate::item::LineItem) rows keyed by `form_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rating::AdjectivalRating;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Which variant of the commitment form this is. The three kinds share
/// one state machine; department and office forms elide the review
/// step and terminate in `approved` instead of `finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
  /// One staff member's commitments (has an explicit subject).
  Individual,
  /// A division/department's commitments (subject implicit in the unit).
  Department,
  /// The whole office's commitments.
  Office,
}

impl FormKind {
  /// Individual forms pass through a division-level review before the
  /// terminal transition; department and office forms do not.
  pub fn has_review_step(self) -> bool { matches!(self, Self::Individual) }

  /// The terminal status this kind of form ends in.
  pub fn terminal_status(self) -> FormStatus {
    match self {
      Self::Individual => FormStatus::Finalized,
      Self::Department | Self::Office => FormStatus::Approved,
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// The workflow status of a form. Which statuses are reachable depends
/// on the form kind; the engine's transition table is the single
/// authority on legality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
  Draft,
  Submitted,
  Reviewed,
  Returned,
  Finalized,
  Approved,
}

impl FormStatus {
  /// Terminal statuses admit no further transition, for any role.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Finalized | Self::Approved)
  }

  /// Statuses in which the owner may still edit line items.
  pub fn is_editable(self) -> bool {
    matches!(self, Self::Draft | Self::Returned)
  }
}

// ─── Form ────────────────────────────────────────────────────────────────────

/// A performance-commitment record.
///
/// `final_average_rating` and `adjectival_rating` are either both
/// `None` or both `Some`; they are written exactly once, atomically
/// with the terminal status transition. Forms are never physically
/// deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceForm {
  pub form_id:              Uuid,
  pub kind:                 FormKind,
  pub cycle_id:             Uuid,
  /// Set for individual forms; `None` for department/office forms,
  /// whose subject is implicit in `unit_id`.
  pub subject_id:           Option<Uuid>,
  /// The org unit this form belongs to, captured at creation. Used
  /// for reviewer scoping; never changes afterwards.
  pub unit_id:              Uuid,
  pub status:               FormStatus,
  pub reviewer_id:          Option<Uuid>,
  pub approver_id:          Option<Uuid>,
  pub final_average_rating: Option<f64>,
  pub adjectival_rating:    Option<AdjectivalRating>,
  pub remarks:              Option<String>,
  pub review_comments:      Option<String>,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  pub submitted_at:         Option<DateTime<Utc>>,
  pub reviewed_at:          Option<DateTime<Utc>>,
  /// Terminal timestamp; doubles as the approval time for
  /// department/office forms.
  pub finalized_at:         Option<DateTime<Utc>>,
}

// ─── NewForm ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ReviewStore::insert_form`]. Ids and
/// timestamps are assigned by the store; new forms always start in
/// [`FormStatus::Draft`].
#[derive(Debug, Clone)]
pub struct NewForm {
  pub kind:       FormKind,
  pub cycle_id:   Uuid,
  pub subject_id: Option<Uuid>,
  pub unit_id:    Uuid,
}
