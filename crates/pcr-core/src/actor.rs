//! Actors and roles.
//!
//! The identity/session provider (out of scope here) resolves the
//! calling user into an [`Actor`], including the org-unit facts the
//! guard needs. The engine treats this as given and never
//! authenticates anything itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role an actor holds within the office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Staff,
  DivisionChief,
  OfficeHead,
  Admin,
}

impl Role {
  /// Division chiefs and above can review and own department forms.
  pub fn is_division_level(self) -> bool {
    matches!(self, Self::DivisionChief | Self::OfficeHead | Self::Admin)
  }

  /// Office heads and admins hold office-wide authority.
  pub fn is_office_wide(self) -> bool {
    matches!(self, Self::OfficeHead | Self::Admin)
  }
}

/// The calling actor, with the org-unit facts needed to derive an
/// ownership relation. Supplied by the identity provider at the
/// boundary — nothing here is looked up inside the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
  pub actor_id:         Uuid,
  pub role:             Role,
  /// The unit the actor belongs to (or heads, for division chiefs).
  pub unit_id:          Option<Uuid>,
  /// Units the actor supervises beyond their own.
  #[serde(default)]
  pub supervised_units: Vec<Uuid>,
}

impl Actor {
  /// Whether the actor supervises (or belongs at division level to)
  /// the given unit.
  pub fn oversees_unit(&self, unit: Uuid) -> bool {
    self.unit_id == Some(unit) || self.supervised_units.contains(&unit)
  }
}
