//! Line items — the committed outputs of a form, individually rated.
//!
//! Items belong exclusively to one form. They are never created or
//! deleted through an item-level operation: the full item set is
//! replaced wholesale on every save via the reconciler
//! ([`crate::reconcile`]).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Category ────────────────────────────────────────────────────────────────

/// The commitment category. Used only for display ordering — the
/// engine never validates against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
  StrategicPriority,
  CoreFunction,
  SupportFunction,
}

impl ItemCategory {
  /// Display rank: strategic priorities first, support functions last.
  pub fn rank(self) -> u8 {
    match self {
      Self::StrategicPriority => 0,
      Self::CoreFunction => 1,
      Self::SupportFunction => 2,
    }
  }
}

// ─── LineItem ────────────────────────────────────────────────────────────────

/// One committed output within a form.
///
/// The three criterion ratings (quantity, efficiency, timeliness) use
/// a 1–5 domain by convention; the engine does not enforce the range.
/// `rating_average` stays `None` until the form's terminal transition
/// runs the aggregator — it is never writable through item saves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
  pub item_id:           Uuid,
  pub form_id:           Uuid,
  pub category:          ItemCategory,
  /// Caller-assigned secondary sort key within the category.
  pub sort_order:        i64,
  pub description:       Option<String>,
  pub success_indicator: Option<String>,
  pub accountable_party: Option<String>,
  pub accomplishment:    Option<String>,
  pub remarks:           Option<String>,
  pub rating_quantity:   Option<f64>,
  pub rating_efficiency: Option<f64>,
  pub rating_timeliness: Option<f64>,
  pub rating_average:    Option<f64>,
}

// ─── LineItemDraft ───────────────────────────────────────────────────────────

/// One entry in the caller-supplied target list for a save.
///
/// An entry with `item_id: Some(..)` updates that persisted item; an
/// entry without one creates a new item under the form. Persisted
/// items absent from the target list are deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemDraft {
  pub item_id:           Option<Uuid>,
  pub category:          ItemCategory,
  #[serde(default)]
  pub sort_order:        i64,
  pub description:       Option<String>,
  pub success_indicator: Option<String>,
  pub accountable_party: Option<String>,
  pub accomplishment:    Option<String>,
  pub remarks:           Option<String>,
  pub rating_quantity:   Option<f64>,
  pub rating_efficiency: Option<f64>,
  pub rating_timeliness: Option<f64>,
}

// ─── ItemRating ──────────────────────────────────────────────────────────────

/// Per-item criterion scores supplied with a finalize/approve call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ItemRating {
  pub item_id:    Uuid,
  pub quantity:   f64,
  pub efficiency: f64,
  pub timeliness: f64,
}
