//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use pcr_core::{
  form::{FormKind, FormStatus, NewForm},
  item::{ItemCategory, LineItemDraft},
  rating::AdjectivalRating,
  reconcile,
  store::{FormPatch, FormQuery, RatedItem, ReviewStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn individual_form(cycle_id: Uuid, subject_id: Uuid, unit_id: Uuid) -> NewForm {
  NewForm {
    kind: FormKind::Individual,
    cycle_id,
    subject_id: Some(subject_id),
    unit_id,
  }
}

fn draft(item_id: Option<Uuid>, category: ItemCategory, sort_order: i64) -> LineItemDraft {
  LineItemDraft {
    item_id,
    category,
    sort_order,
    description: Some("target".into()),
    success_indicator: Some("100% on time".into()),
    accountable_party: None,
    accomplishment: None,
    remarks: None,
    rating_quantity: None,
    rating_efficiency: None,
    rating_timeliness: None,
  }
}

// ─── Forms ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_form() {
  let s = store().await;
  let subject = Uuid::new_v4();
  let unit = Uuid::new_v4();

  let form = s
    .insert_form(individual_form(Uuid::new_v4(), subject, unit))
    .await
    .unwrap();
  assert_eq!(form.status, FormStatus::Draft);
  assert_eq!(form.subject_id, Some(subject));

  let fetched = s.get_form(form.form_id).await.unwrap().unwrap();
  assert_eq!(fetched.form_id, form.form_id);
  assert_eq!(fetched.kind, FormKind::Individual);
  assert_eq!(fetched.unit_id, unit);
  assert!(fetched.final_average_rating.is_none());
  assert!(fetched.adjectival_rating.is_none());
}

#[tokio::test]
async fn get_form_missing_returns_none() {
  let s = store().await;
  assert!(s.get_form(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn find_form_by_key_individual_matches_subject() {
  let s = store().await;
  let cycle = Uuid::new_v4();
  let subject = Uuid::new_v4();
  let unit = Uuid::new_v4();

  let form = s
    .insert_form(individual_form(cycle, subject, unit))
    .await
    .unwrap();

  let found = s
    .find_form_by_key(FormKind::Individual, cycle, Some(subject), unit)
    .await
    .unwrap();
  assert_eq!(found.unwrap().form_id, form.form_id);

  // Different subject, same cycle — no match.
  let other = s
    .find_form_by_key(FormKind::Individual, cycle, Some(Uuid::new_v4()), unit)
    .await
    .unwrap();
  assert!(other.is_none());
}

#[tokio::test]
async fn find_form_by_key_department_matches_unit() {
  let s = store().await;
  let cycle = Uuid::new_v4();
  let unit = Uuid::new_v4();

  let form = s
    .insert_form(NewForm {
      kind:       FormKind::Department,
      cycle_id:   cycle,
      subject_id: None,
      unit_id:    unit,
    })
    .await
    .unwrap();

  let found = s
    .find_form_by_key(FormKind::Department, cycle, None, unit)
    .await
    .unwrap();
  assert_eq!(found.unwrap().form_id, form.form_id);

  let other = s
    .find_form_by_key(FormKind::Department, cycle, None, Uuid::new_v4())
    .await
    .unwrap();
  assert!(other.is_none());
}

#[tokio::test]
async fn list_forms_filters_and_counts() {
  let s = store().await;
  let cycle = Uuid::new_v4();
  let unit_a = Uuid::new_v4();
  let unit_b = Uuid::new_v4();

  let a = s
    .insert_form(individual_form(cycle, Uuid::new_v4(), unit_a))
    .await
    .unwrap();
  s.insert_form(individual_form(cycle, Uuid::new_v4(), unit_b))
    .await
    .unwrap();
  s.insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), unit_a))
    .await
    .unwrap();

  let plan = reconcile::plan(&[], vec![
    draft(None, ItemCategory::CoreFunction, 0),
    draft(None, ItemCategory::CoreFunction, 1),
  ]);
  s.apply_plan(a.form_id, plan).await.unwrap();

  // Cycle filter.
  let in_cycle = s
    .list_forms(&FormQuery { cycle_id: Some(cycle), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(in_cycle.len(), 2);

  let a_row = in_cycle
    .iter()
    .find(|f| f.form.form_id == a.form_id)
    .unwrap();
  assert_eq!(a_row.item_count, 2);

  // Unit scope.
  let scoped = s
    .list_forms(&FormQuery {
      cycle_id:   Some(cycle),
      unit_scope: Some(vec![unit_a]),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(scoped.len(), 1);
  assert_eq!(scoped[0].form.form_id, a.form_id);

  // Status filter.
  let drafts = s
    .list_forms(&FormQuery {
      status: Some(FormStatus::Draft),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(drafts.len(), 3);
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn apply_plan_inserts_updates_and_deletes() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  // First save: two new items.
  let plan = reconcile::plan(&[], vec![
    draft(None, ItemCategory::StrategicPriority, 0),
    draft(None, ItemCategory::CoreFunction, 0),
  ]);
  s.apply_plan(form.form_id, plan).await.unwrap();

  let items = s.list_items(form.form_id).await.unwrap();
  assert_eq!(items.len(), 2);

  // Second save: keep the first (with a new description), drop the
  // second, add a third.
  let keep = items[0].item_id;
  let mut kept = draft(Some(keep), items[0].category, 0);
  kept.description = Some("revised target".into());

  let existing: Vec<Uuid> = items.iter().map(|i| i.item_id).collect();
  let plan = reconcile::plan(&existing, vec![
    kept,
    draft(None, ItemCategory::SupportFunction, 0),
  ]);
  s.apply_plan(form.form_id, plan).await.unwrap();

  let items = s.list_items(form.form_id).await.unwrap();
  assert_eq!(items.len(), 2);
  let kept_row = items.iter().find(|i| i.item_id == keep).unwrap();
  assert_eq!(kept_row.description.as_deref(), Some("revised target"));
  assert!(items.iter().all(|i| i.item_id != existing[1]));
}

#[tokio::test]
async fn apply_plan_is_idempotent_for_same_target_list() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let plan = reconcile::plan(&[], vec![draft(None, ItemCategory::CoreFunction, 0)]);
  s.apply_plan(form.form_id, plan).await.unwrap();
  let first = s.list_items(form.form_id).await.unwrap();
  assert_eq!(first.len(), 1);

  // Re-saving the persisted set (now with its id) changes nothing.
  let existing: Vec<Uuid> = first.iter().map(|i| i.item_id).collect();
  let plan = reconcile::plan(&existing, vec![draft(
    Some(first[0].item_id),
    ItemCategory::CoreFunction,
    0,
  )]);
  s.apply_plan(form.form_id, plan).await.unwrap();

  let second = s.list_items(form.form_id).await.unwrap();
  assert_eq!(second.len(), 1);
  assert_eq!(second[0].item_id, first[0].item_id);
}

#[tokio::test]
async fn apply_plan_refused_once_form_leaves_editable() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let plan = reconcile::plan(&[], vec![draft(None, ItemCategory::CoreFunction, 0)]);
  assert!(s.apply_plan(form.form_id, plan).await.unwrap());

  s.transition_form(
    form.form_id,
    FormStatus::Draft,
    FormPatch::status_only(FormStatus::Submitted),
  )
  .await
  .unwrap();

  // A save that raced past the engine's status check is refused here
  // and leaves the item set untouched.
  let existing: Vec<Uuid> = s
    .list_items(form.form_id)
    .await
    .unwrap()
    .iter()
    .map(|i| i.item_id)
    .collect();
  let plan = reconcile::plan(&existing, vec![]);
  assert!(!s.apply_plan(form.form_id, plan).await.unwrap());

  assert_eq!(s.count_items(form.form_id).await.unwrap(), 1);
}

#[tokio::test]
async fn apply_plan_empty_target_deletes_all() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let plan = reconcile::plan(&[], vec![
    draft(None, ItemCategory::CoreFunction, 0),
    draft(None, ItemCategory::CoreFunction, 1),
  ]);
  s.apply_plan(form.form_id, plan).await.unwrap();

  let existing: Vec<Uuid> = s
    .list_items(form.form_id)
    .await
    .unwrap()
    .iter()
    .map(|i| i.item_id)
    .collect();
  let plan = reconcile::plan(&existing, vec![]);
  s.apply_plan(form.form_id, plan).await.unwrap();

  assert_eq!(s.count_items(form.form_id).await.unwrap(), 0);
}

#[tokio::test]
async fn list_items_sorted_by_category_rank_then_order() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let plan = reconcile::plan(&[], vec![
    draft(None, ItemCategory::SupportFunction, 0),
    draft(None, ItemCategory::CoreFunction, 2),
    draft(None, ItemCategory::CoreFunction, 1),
    draft(None, ItemCategory::StrategicPriority, 5),
  ]);
  s.apply_plan(form.form_id, plan).await.unwrap();

  let items = s.list_items(form.form_id).await.unwrap();
  let order: Vec<(ItemCategory, i64)> =
    items.iter().map(|i| (i.category, i.sort_order)).collect();
  assert_eq!(order, vec![
    (ItemCategory::StrategicPriority, 5),
    (ItemCategory::CoreFunction, 1),
    (ItemCategory::CoreFunction, 2),
    (ItemCategory::SupportFunction, 0),
  ]);
}

// ─── Conditional writes ──────────────────────────────────────────────────────

#[tokio::test]
async fn transition_form_cas_wins_once() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let mut patch = FormPatch::status_only(FormStatus::Submitted);
  patch.submitted_at = Some(Utc::now());

  // Two writers that both observed `draft`: exactly one wins.
  let first = s
    .transition_form(form.form_id, FormStatus::Draft, patch.clone())
    .await
    .unwrap();
  let second = s
    .transition_form(form.form_id, FormStatus::Draft, patch)
    .await
    .unwrap();
  assert!(first);
  assert!(!second);

  let fetched = s.get_form(form.form_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, FormStatus::Submitted);
  assert!(fetched.submitted_at.is_some());
}

#[tokio::test]
async fn transition_form_wrong_expected_status_is_rejected() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let ok = s
    .transition_form(
      form.form_id,
      FormStatus::Submitted,
      FormPatch::status_only(FormStatus::Reviewed),
    )
    .await
    .unwrap();
  assert!(!ok);

  // Status unchanged.
  let fetched = s.get_form(form.form_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, FormStatus::Draft);
}

#[tokio::test]
async fn transition_patch_sets_only_carried_fields() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let mut patch = FormPatch::status_only(FormStatus::Submitted);
  patch.submitted_at = Some(Utc::now());
  s.transition_form(form.form_id, FormStatus::Draft, patch)
    .await
    .unwrap();

  let reviewer = Uuid::new_v4();
  let mut patch = FormPatch::status_only(FormStatus::Reviewed);
  patch.reviewer_id = Some(reviewer);
  patch.review_comments = Some("ok".into());
  patch.reviewed_at = Some(Utc::now());
  s.transition_form(form.form_id, FormStatus::Submitted, patch)
    .await
    .unwrap();

  let fetched = s.get_form(form.form_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, FormStatus::Reviewed);
  assert_eq!(fetched.reviewer_id, Some(reviewer));
  assert_eq!(fetched.review_comments.as_deref(), Some("ok"));
  // Earlier transition's fields survive.
  assert!(fetched.submitted_at.is_some());
  assert!(fetched.approver_id.is_none());
}

#[tokio::test]
async fn apply_ratings_persists_items_and_form_atomically() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let plan = reconcile::plan(&[], vec![
    draft(None, ItemCategory::CoreFunction, 0),
    draft(None, ItemCategory::CoreFunction, 1),
  ]);
  s.apply_plan(form.form_id, plan).await.unwrap();
  let items = s.list_items(form.form_id).await.unwrap();

  // Walk the form to `reviewed` first.
  s.transition_form(
    form.form_id,
    FormStatus::Draft,
    FormPatch::status_only(FormStatus::Submitted),
  )
  .await
  .unwrap();
  s.transition_form(
    form.form_id,
    FormStatus::Submitted,
    FormPatch::status_only(FormStatus::Reviewed),
  )
  .await
  .unwrap();

  let rated: Vec<RatedItem> = vec![
    RatedItem {
      item_id:    items[0].item_id,
      quantity:   5.0,
      efficiency: 5.0,
      timeliness: 5.0,
      average:    5.00,
    },
    RatedItem {
      item_id:    items[1].item_id,
      quantity:   4.0,
      efficiency: 4.0,
      timeliness: 5.0,
      average:    4.33,
    },
  ];

  let mut patch = FormPatch::status_only(FormStatus::Finalized);
  patch.final_average_rating = Some(4.665);
  patch.adjectival_rating = Some(AdjectivalRating::VerySatisfactory);
  patch.finalized_at = Some(Utc::now());

  let won = s
    .apply_ratings(form.form_id, FormStatus::Reviewed, rated, patch)
    .await
    .unwrap();
  assert!(won);

  let fetched = s.get_form(form.form_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, FormStatus::Finalized);
  assert_eq!(fetched.final_average_rating, Some(4.665));
  assert_eq!(
    fetched.adjectival_rating,
    Some(AdjectivalRating::VerySatisfactory)
  );

  let items = s.list_items(form.form_id).await.unwrap();
  assert!(items.iter().all(|i| i.rating_average.is_some()));
}

#[tokio::test]
async fn apply_ratings_lost_cas_touches_nothing() {
  let s = store().await;
  let form = s
    .insert_form(individual_form(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
    .await
    .unwrap();

  let plan = reconcile::plan(&[], vec![draft(None, ItemCategory::CoreFunction, 0)]);
  s.apply_plan(form.form_id, plan).await.unwrap();
  let items = s.list_items(form.form_id).await.unwrap();

  // The form is still `draft`; an approval expecting `reviewed` loses.
  let mut patch = FormPatch::status_only(FormStatus::Finalized);
  patch.final_average_rating = Some(5.0);
  patch.adjectival_rating = Some(AdjectivalRating::Outstanding);

  let won = s
    .apply_ratings(
      form.form_id,
      FormStatus::Reviewed,
      vec![RatedItem {
        item_id:    items[0].item_id,
        quantity:   5.0,
        efficiency: 5.0,
        timeliness: 5.0,
        average:    5.00,
      }],
      patch,
    )
    .await
    .unwrap();
  assert!(!won);

  // Neither the form nor the item was touched.
  let fetched = s.get_form(form.form_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, FormStatus::Draft);
  assert!(fetched.final_average_rating.is_none());

  let items = s.list_items(form.form_id).await.unwrap();
  assert!(items[0].rating_average.is_none());
}
