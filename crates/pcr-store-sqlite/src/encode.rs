//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs are hyphenated lowercase
//! strings, closed enums are snake_case discriminant strings matching
//! their serde tags.

use chrono::{DateTime, Utc};
use pcr_core::{
  form::{FormKind, FormStatus, PerformanceForm},
  item::{ItemCategory, LineItem},
  rating::AdjectivalRating,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_uuid_opt(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── FormKind ────────────────────────────────────────────────────────────────

pub fn encode_form_kind(k: FormKind) -> &'static str {
  match k {
    FormKind::Individual => "individual",
    FormKind::Department => "department",
    FormKind::Office => "office",
  }
}

pub fn decode_form_kind(s: &str) -> Result<FormKind> {
  match s {
    "individual" => Ok(FormKind::Individual),
    "department" => Ok(FormKind::Department),
    "office" => Ok(FormKind::Office),
    other => Err(Error::Decode(format!("unknown form kind: {other:?}"))),
  }
}

// ─── FormStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(s: FormStatus) -> &'static str {
  match s {
    FormStatus::Draft => "draft",
    FormStatus::Submitted => "submitted",
    FormStatus::Reviewed => "reviewed",
    FormStatus::Returned => "returned",
    FormStatus::Finalized => "finalized",
    FormStatus::Approved => "approved",
  }
}

pub fn decode_status(s: &str) -> Result<FormStatus> {
  match s {
    "draft" => Ok(FormStatus::Draft),
    "submitted" => Ok(FormStatus::Submitted),
    "reviewed" => Ok(FormStatus::Reviewed),
    "returned" => Ok(FormStatus::Returned),
    "finalized" => Ok(FormStatus::Finalized),
    "approved" => Ok(FormStatus::Approved),
    other => Err(Error::Decode(format!("unknown form status: {other:?}"))),
  }
}

// ─── ItemCategory ────────────────────────────────────────────────────────────

pub fn encode_category(c: ItemCategory) -> &'static str {
  match c {
    ItemCategory::StrategicPriority => "strategic_priority",
    ItemCategory::CoreFunction => "core_function",
    ItemCategory::SupportFunction => "support_function",
  }
}

pub fn decode_category(s: &str) -> Result<ItemCategory> {
  match s {
    "strategic_priority" => Ok(ItemCategory::StrategicPriority),
    "core_function" => Ok(ItemCategory::CoreFunction),
    "support_function" => Ok(ItemCategory::SupportFunction),
    other => Err(Error::Decode(format!("unknown item category: {other:?}"))),
  }
}

// ─── AdjectivalRating ────────────────────────────────────────────────────────

pub fn encode_adjectival(r: AdjectivalRating) -> &'static str {
  match r {
    AdjectivalRating::Outstanding => "outstanding",
    AdjectivalRating::VerySatisfactory => "very_satisfactory",
    AdjectivalRating::Satisfactory => "satisfactory",
    AdjectivalRating::Unsatisfactory => "unsatisfactory",
    AdjectivalRating::Poor => "poor",
  }
}

pub fn decode_adjectival(s: &str) -> Result<AdjectivalRating> {
  match s {
    "outstanding" => Ok(AdjectivalRating::Outstanding),
    "very_satisfactory" => Ok(AdjectivalRating::VerySatisfactory),
    "satisfactory" => Ok(AdjectivalRating::Satisfactory),
    "unsatisfactory" => Ok(AdjectivalRating::Unsatisfactory),
    "poor" => Ok(AdjectivalRating::Poor),
    other => Err(Error::Decode(format!("unknown adjectival rating: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `forms` row.
pub struct RawForm {
  pub form_id:              String,
  pub kind:                 String,
  pub cycle_id:             String,
  pub subject_id:           Option<String>,
  pub unit_id:              String,
  pub status:               String,
  pub reviewer_id:          Option<String>,
  pub approver_id:          Option<String>,
  pub final_average_rating: Option<f64>,
  pub adjectival_rating:    Option<String>,
  pub remarks:              Option<String>,
  pub review_comments:      Option<String>,
  pub created_at:           String,
  pub updated_at:           String,
  pub submitted_at:         Option<String>,
  pub reviewed_at:          Option<String>,
  pub finalized_at:         Option<String>,
}

impl RawForm {
  /// The column list matching [`Self::from_row`]'s ordering.
  pub const COLUMNS: &'static str = "form_id, kind, cycle_id, subject_id, \
     unit_id, status, reviewer_id, approver_id, final_average_rating, \
     adjectival_rating, remarks, review_comments, created_at, updated_at, \
     submitted_at, reviewed_at, finalized_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      form_id:              row.get(0)?,
      kind:                 row.get(1)?,
      cycle_id:             row.get(2)?,
      subject_id:           row.get(3)?,
      unit_id:              row.get(4)?,
      status:               row.get(5)?,
      reviewer_id:          row.get(6)?,
      approver_id:          row.get(7)?,
      final_average_rating: row.get(8)?,
      adjectival_rating:    row.get(9)?,
      remarks:              row.get(10)?,
      review_comments:      row.get(11)?,
      created_at:           row.get(12)?,
      updated_at:           row.get(13)?,
      submitted_at:         row.get(14)?,
      reviewed_at:          row.get(15)?,
      finalized_at:         row.get(16)?,
    })
  }

  pub fn into_form(self) -> Result<PerformanceForm> {
    Ok(PerformanceForm {
      form_id:              decode_uuid(&self.form_id)?,
      kind:                 decode_form_kind(&self.kind)?,
      cycle_id:             decode_uuid(&self.cycle_id)?,
      subject_id:           decode_uuid_opt(self.subject_id.as_deref())?,
      unit_id:              decode_uuid(&self.unit_id)?,
      status:               decode_status(&self.status)?,
      reviewer_id:          decode_uuid_opt(self.reviewer_id.as_deref())?,
      approver_id:          decode_uuid_opt(self.approver_id.as_deref())?,
      final_average_rating: self.final_average_rating,
      adjectival_rating:    self
        .adjectival_rating
        .as_deref()
        .map(decode_adjectival)
        .transpose()?,
      remarks:              self.remarks,
      review_comments:      self.review_comments,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
      submitted_at:         decode_dt_opt(self.submitted_at.as_deref())?,
      reviewed_at:          decode_dt_opt(self.reviewed_at.as_deref())?,
      finalized_at:         decode_dt_opt(self.finalized_at.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `line_items` row.
pub struct RawItem {
  pub item_id:           String,
  pub form_id:           String,
  pub category:          String,
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

impl RawItem {
  /// The column list matching [`Self::from_row`]'s ordering.
  pub const COLUMNS: &'static str = "item_id, form_id, category, sort_order, \
     description, success_indicator, accountable_party, accomplishment, \
     remarks, rating_quantity, rating_efficiency, rating_timeliness, \
     rating_average";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:           row.get(0)?,
      form_id:           row.get(1)?,
      category:          row.get(2)?,
      sort_order:        row.get(3)?,
      description:       row.get(4)?,
      success_indicator: row.get(5)?,
      accountable_party: row.get(6)?,
      accomplishment:    row.get(7)?,
      remarks:           row.get(8)?,
      rating_quantity:   row.get(9)?,
      rating_efficiency: row.get(10)?,
      rating_timeliness: row.get(11)?,
      rating_average:    row.get(12)?,
    })
  }

  pub fn into_item(self) -> Result<LineItem> {
    Ok(LineItem {
      item_id:           decode_uuid(&self.item_id)?,
      form_id:           decode_uuid(&self.form_id)?,
      category:          decode_category(&self.category)?,
      sort_order:        self.sort_order,
      description:       self.description,
      success_indicator: self.success_indicator,
      accountable_party: self.accountable_party,
      accomplishment:    self.accomplishment,
      remarks:           self.remarks,
      rating_quantity:   self.rating_quantity,
      rating_efficiency: self.rating_efficiency,
      rating_timeliness: self.rating_timeliness,
      rating_average:    self.rating_average,
    })
  }
}
