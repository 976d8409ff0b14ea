//! Rating aggregation: per-item averages, the per-form average, and
//! the adjectival band.
//!
//! Pure functions of their inputs — no I/O. The engine calls them
//! exactly once per terminal transition and persists both levels of
//! result atomically with the status change.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Band ────────────────────────────────────────────────────────────────────

/// The qualitative label derived from the final numeric average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjectivalRating {
  Outstanding,
  VerySatisfactory,
  Satisfactory,
  Unsatisfactory,
  Poor,
}

impl AdjectivalRating {
  /// The display label used on printed review forms.
  pub fn label(self) -> &'static str {
    match self {
      Self::Outstanding => "Outstanding",
      Self::VerySatisfactory => "Very Satisfactory",
      Self::Satisfactory => "Satisfactory",
      Self::Unsatisfactory => "Unsatisfactory",
      Self::Poor => "Poor",
    }
  }
}

// ─── Rounding ────────────────────────────────────────────────────────────────

/// Round half away from zero to `places` decimal places.
fn round_to(x: f64, places: u32) -> f64 {
  let factor = 10_f64.powi(places as i32);
  (x * factor).round() / factor
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Mean of one item's three criterion scores, rounded to 2 decimals.
///
/// The 1–5 domain is a convention, not a rule; only non-finite scores
/// are rejected.
pub fn item_average(quantity: f64, efficiency: f64, timeliness: f64) -> Result<f64> {
  for (name, v) in [
    ("quantity", quantity),
    ("efficiency", efficiency),
    ("timeliness", timeliness),
  ] {
    if !v.is_finite() {
      return Err(Error::Validation(format!("{name} rating is not a number")));
    }
  }
  Ok(round_to((quantity + efficiency + timeliness) / 3.0, 2))
}

/// Mean of the per-item averages, rounded to 3 decimals.
pub fn form_average(item_averages: &[f64]) -> Result<f64> {
  if item_averages.is_empty() {
    return Err(Error::Validation(
      "cannot rate a form with no rated line items".into(),
    ));
  }
  let sum: f64 = item_averages.iter().sum();
  Ok(round_to(sum / item_averages.len() as f64, 3))
}

/// Band a form average into its adjectival rating. Lower bounds are
/// inclusive; an exact 5.0 is its own band.
pub fn band(form_average: f64) -> AdjectivalRating {
  if form_average == 5.0 {
    AdjectivalRating::Outstanding
  } else if form_average >= 4.0 {
    AdjectivalRating::VerySatisfactory
  } else if form_average >= 3.0 {
    AdjectivalRating::Satisfactory
  } else if form_average >= 2.0 {
    AdjectivalRating::Unsatisfactory
  } else {
    AdjectivalRating::Poor
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
