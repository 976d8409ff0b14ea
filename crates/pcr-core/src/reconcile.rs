//! Line-item reconciliation: caller-supplied target list → minimal
//! store operations.
//!
//! Every save carries the complete desired item set. Entries with an
//! id update the persisted item; entries without one create a new
//! item; persisted items absent from the target list are deleted.
//! Full-replace semantics, not an incremental patch.

use std::collections::HashSet;

use uuid::Uuid;

use crate::item::LineItemDraft;

/// The insert/update/delete plan for one save, applied by the store
/// inside a single transaction.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
  /// Drafts carrying an existing item id. An id unknown under the
  /// form is a benign no-op at the store level, not an error.
  pub updates:    Vec<(Uuid, LineItemDraft)>,
  /// Drafts without an id — created fresh under the form.
  pub inserts:    Vec<LineItemDraft>,
  /// Persisted ids missing from the target list.
  pub delete_ids: Vec<Uuid>,
}

/// Compute the plan that makes the persisted item set equal exactly
/// the caller-supplied target set.
///
/// An empty target list deletes every item of the form.
pub fn plan(existing_ids: &[Uuid], drafts: Vec<LineItemDraft>) -> ReconcilePlan {
  let mut updates: Vec<(Uuid, LineItemDraft)> = vec![];
  let mut inserts: Vec<LineItemDraft> = vec![];
  let mut keep: HashSet<Uuid> = HashSet::new();

  for draft in drafts {
    match draft.item_id {
      Some(id) => {
        keep.insert(id);
        updates.push((id, draft));
      }
      None => inserts.push(draft),
    }
  }

  let delete_ids: Vec<Uuid> = existing_ids
    .iter()
    .filter(|id| !keep.contains(id))
    .copied()
    .collect();

  ReconcilePlan { updates, inserts, delete_ids }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::item::ItemCategory;

  fn draft(item_id: Option<Uuid>) -> LineItemDraft {
    LineItemDraft {
      item_id,
      category: ItemCategory::CoreFunction,
      sort_order: 0,
      description: Some("deliver the thing".into()),
      success_indicator: None,
      accountable_party: None,
      accomplishment: None,
      remarks: None,
      rating_quantity: None,
      rating_efficiency: None,
      rating_timeliness: None,
    }
  }

  #[test]
  fn all_new_drafts_are_inserts() {
    let p = plan(&[], vec![draft(None), draft(None)]);
    assert_eq!(p.inserts.len(), 2);
    assert!(p.updates.is_empty());
    assert!(p.delete_ids.is_empty());
  }

  #[test]
  fn drafts_with_ids_are_updates() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let p = plan(&[a, b], vec![draft(Some(a)), draft(Some(b))]);
    assert_eq!(p.updates.len(), 2);
    assert!(p.inserts.is_empty());
    assert!(p.delete_ids.is_empty());
  }

  #[test]
  fn missing_existing_ids_are_deleted() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let p = plan(&[a, b], vec![draft(Some(a))]);
    assert_eq!(p.updates.len(), 1);
    assert_eq!(p.delete_ids, vec![b]);
  }

  #[test]
  fn empty_target_list_deletes_everything() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let p = plan(&[a, b], vec![]);
    assert!(p.updates.is_empty());
    assert!(p.inserts.is_empty());
    assert_eq!(p.delete_ids.len(), 2);
  }

  #[test]
  fn unknown_draft_id_is_kept_as_update() {
    // The store treats an unknown id as a no-op; the planner does not
    // reject it.
    let unknown = Uuid::new_v4();
    let p = plan(&[], vec![draft(Some(unknown))]);
    assert_eq!(p.updates.len(), 1);
    assert!(p.delete_ids.is_empty());
  }

  #[test]
  fn mixed_plan() {
    let keep = Uuid::new_v4();
    let drop = Uuid::new_v4();
    let p = plan(&[keep, drop], vec![draft(Some(keep)), draft(None)]);
    assert_eq!(p.updates.len(), 1);
    assert_eq!(p.inserts.len(), 1);
    assert_eq!(p.delete_ids, vec![drop]);
  }
}
