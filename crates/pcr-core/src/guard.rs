//! The authorization guard — one decision table for every transition.
//!
//! Maps (role, operation, ownership relation) to allow/deny. The guard
//! is a pure function: the org-unit facts needed to derive the
//! relation are supplied by the caller (the workflow engine), never
//! fetched here. Deny is the default for any uncovered cell.

use serde::{Deserialize, Serialize};

use crate::actor::{Actor, Role};
use crate::form::{FormKind, PerformanceForm};

// ─── Operation ───────────────────────────────────────────────────────────────

/// The engine operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  Create,
  View,
  SaveItems,
  Submit,
  Review,
  Finalize,
  Approve,
  Return,
}

// ─── Relation ────────────────────────────────────────────────────────────────

/// How the actor relates to the record under consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
  /// The actor is the subject (owner) of the record.
  Subject,
  /// The actor supervises the record's org unit.
  Supervisor,
  /// The actor holds office-wide authority.
  OfficeWide,
  /// No recognised relation.
  None,
}

/// Derive the actor's relation to a form from caller-supplied facts.
///
/// Ownership is checked first so a subject is treated as the owner of
/// their own form even when they also hold a wider role. For
/// department/office forms the owner is the division-level actor whose
/// unit the form belongs to.
pub fn relation_of(actor: &Actor, form: &PerformanceForm) -> Relation {
  relation_for(actor, form.kind, form.subject_id, form.unit_id)
}

/// [`relation_of`] over the raw record key — used at creation time,
/// before any form row exists.
pub fn relation_for(
  actor: &Actor,
  kind: FormKind,
  subject_id: Option<uuid::Uuid>,
  unit_id: uuid::Uuid,
) -> Relation {
  if is_owner(actor, kind, subject_id, unit_id) {
    return Relation::Subject;
  }
  if actor.role.is_office_wide() {
    return Relation::OfficeWide;
  }
  if actor.role.is_division_level() && actor.oversees_unit(unit_id) {
    return Relation::Supervisor;
  }
  Relation::None
}

/// Ownership check shared by [`relation_of`] and form creation (where
/// no form row exists yet).
pub fn is_owner(
  actor: &Actor,
  kind: FormKind,
  subject_id: Option<uuid::Uuid>,
  unit_id: uuid::Uuid,
) -> bool {
  match kind {
    FormKind::Individual => subject_id == Some(actor.actor_id),
    FormKind::Department | FormKind::Office => {
      actor.role.is_division_level() && actor.oversees_unit(unit_id)
    }
  }
}

// ─── Decision table ──────────────────────────────────────────────────────────

/// The single allow/deny decision point consulted by every transition.
pub fn allows(role: Role, op: Operation, relation: Relation) -> bool {
  use Operation::*;
  use Relation::*;

  match op {
    // Subjects create their own forms; division-level actors and
    // above create forms for units they oversee.
    Create => match relation {
      Subject => true,
      Supervisor | OfficeWide => role.is_division_level(),
      None => false,
    },

    // Owners see their own records; supervisors see their units';
    // office-wide roles see everything.
    View => match relation {
      Subject => true,
      Supervisor => role.is_division_level(),
      OfficeWide => role.is_office_wide(),
      None => false,
    },

    // Item edits and submission are owner-only.
    SaveItems | Submit => relation == Subject,

    // Review requires division level or higher, scoped to the
    // subject's org unit.
    Review => {
      role.is_division_level() && matches!(relation, Supervisor | OfficeWide)
    }

    // Terminal and return transitions require office-wide authority.
    Finalize | Approve | Return => {
      role.is_office_wide() && relation == OfficeWide
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
