//! [`WorkflowEngine`] — the public operations and the transition table
//! behind them.
//!
//! The state machine (individual-form variant; department/office
//! forms elide the review step):
//!
//! | From            | Operation  | To        |
//! |-----------------|------------|-----------|
//! | —               | create     | draft     |
//! | draft, returned | save items | (same)    |
//! | draft, returned | submit     | submitted |
//! | submitted       | review     | reviewed  |
//! | submitted       | approve    | approved (dept/office, terminal) |
//! | reviewed        | finalize   | finalized (terminal) |
//! | reviewed        | return     | returned  |

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use pcr_core::{
  actor::{Actor, Role},
  form::{FormKind, FormStatus, NewForm, PerformanceForm},
  guard::{self, Operation},
  hooks::Hooks,
  item::{ItemRating, LineItem, LineItemDraft},
  rating,
  reconcile,
  store::{FormPatch, FormQuery, FormSummary, RatedItem, ReviewStore},
  Error, Result,
};

// ─── Request/response types ──────────────────────────────────────────────────

/// Input to [`WorkflowEngine::create_form`].
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewFormRequest {
  pub kind:       FormKind,
  pub cycle_id:   Uuid,
  /// For individual forms; defaults to the acting user. Must be absent
  /// for department/office forms.
  pub subject_id: Option<Uuid>,
  /// Defaults to the actor's own unit.
  pub unit_id:    Option<Uuid>,
}

/// Caller-facing filter for [`WorkflowEngine::list_forms`]. The unit
/// scope is derived from the actor's role, never taken from the caller.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ListFilter {
  pub cycle_id: Option<Uuid>,
  pub status:   Option<FormStatus>,
  pub kind:     Option<FormKind>,
}

/// A form bundled with its (sorted) line items.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FormWithItems {
  pub form:  PerformanceForm,
  pub items: Vec<LineItem>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The workflow engine. Cheap to clone; all state lives in the store.
pub struct WorkflowEngine<S> {
  store: Arc<S>,
  hooks: Hooks,
}

impl<S> Clone for WorkflowEngine<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), hooks: self.hooks.clone() }
  }
}

impl<S> WorkflowEngine<S>
where
  S: ReviewStore,
{
  pub fn new(store: Arc<S>) -> Self {
    Self { store, hooks: Hooks::default() }
  }

  pub fn with_hooks(store: Arc<S>, hooks: Hooks) -> Self {
    Self { store, hooks }
  }

  // ── Create ─────────────────────────────────────────────────────────────

  /// Create a new form in `draft` status.
  ///
  /// Enforces one form per (subject, cycle) — or (unit, cycle) for
  /// department/office forms — by an existence check; a duplicate
  /// reports the existing id rather than inserting a second row.
  pub async fn create_form(
    &self,
    actor: &Actor,
    req: NewFormRequest,
  ) -> Result<PerformanceForm> {
    let unit_id = req.unit_id.or(actor.unit_id).ok_or_else(|| {
      Error::Validation("an org unit is required to create a form".into())
    })?;

    let subject_id = match req.kind {
      FormKind::Individual => Some(req.subject_id.unwrap_or(actor.actor_id)),
      FormKind::Department | FormKind::Office => {
        if req.subject_id.is_some() {
          return Err(Error::Validation(
            "department and office forms have no individual subject".into(),
          ));
        }
        None
      }
    };

    let relation = guard::relation_for(actor, req.kind, subject_id, unit_id);
    if !guard::allows(actor.role, Operation::Create, relation) {
      return Err(Error::Forbidden(
        "you may only create forms for yourself or for units you manage".into(),
      ));
    }

    if let Some(existing) = self
      .store
      .find_form_by_key(req.kind, req.cycle_id, subject_id, unit_id)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::DuplicateForm { existing: existing.form_id });
    }

    let form = self
      .store
      .insert_form(NewForm {
        kind: req.kind,
        cycle_id: req.cycle_id,
        subject_id,
        unit_id,
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(form_id = %form.form_id, kind = ?form.kind, "form created");
    self.emit(actor, &form, "form.created", None);
    Ok(form)
  }

  // ── Reads ──────────────────────────────────────────────────────────────

  /// Fetch one form with its items, sorted by category rank then
  /// `sort_order`.
  pub async fn get_form(&self, actor: &Actor, form_id: Uuid) -> Result<FormWithItems> {
    let form = self.require_form(form_id).await?;

    let relation = guard::relation_of(actor, &form);
    if !guard::allows(actor.role, Operation::View, relation) {
      return Err(Error::Forbidden("you may not view this form".into()));
    }

    let items = self
      .store
      .list_items(form_id)
      .await
      .map_err(Error::store)?;
    Ok(FormWithItems { form, items })
  }

  /// List forms visible to the actor, with per-form item counts.
  ///
  /// Scope narrows with role: staff see only their own forms, division
  /// chiefs see their units, office-wide roles see everything.
  pub async fn list_forms(
    &self,
    actor: &Actor,
    filter: ListFilter,
  ) -> Result<Vec<FormSummary>> {
    let mut query = FormQuery {
      cycle_id: filter.cycle_id,
      status:   filter.status,
      kind:     filter.kind,
      subject_id: None,
      unit_scope: None,
    };

    match actor.role {
      Role::OfficeHead | Role::Admin => {}
      Role::DivisionChief => {
        let mut units = actor.supervised_units.clone();
        if let Some(own) = actor.unit_id {
          units.push(own);
        }
        query.unit_scope = Some(units);
      }
      Role::Staff => {
        query.subject_id = Some(actor.actor_id);
      }
    }

    self.store.list_forms(&query).await.map_err(Error::store)
  }

  // ── Item save ──────────────────────────────────────────────────────────

  /// Replace the form's entire line-item set with `drafts`.
  ///
  /// Full-replace semantics: drafts with an id update, drafts without
  /// one insert, persisted items missing from the list are deleted —
  /// all inside one store transaction. Legal only while the form is in
  /// `draft` or `returned`.
  pub async fn save_line_items(
    &self,
    actor: &Actor,
    form_id: Uuid,
    drafts: Vec<LineItemDraft>,
  ) -> Result<Vec<LineItem>> {
    let form = self.require_form(form_id).await?;

    let relation = guard::relation_of(actor, &form);
    if !guard::allows(actor.role, Operation::SaveItems, relation) {
      return Err(Error::Forbidden(
        "only the form's owner may edit its line items".into(),
      ));
    }

    if !form.status.is_editable() {
      return Err(Error::InvalidState(
        "line items can only be edited while the form is in draft or returned status"
          .into(),
      ));
    }

    let existing_ids: Vec<Uuid> = self
      .store
      .list_items(form_id)
      .await
      .map_err(Error::store)?
      .iter()
      .map(|i| i.item_id)
      .collect();

    let plan = reconcile::plan(&existing_ids, drafts);
    let applied = self
      .store
      .apply_plan(form_id, plan)
      .await
      .map_err(Error::store)?;
    if !applied {
      return Err(Error::InvalidState(
        "the form's status changed concurrently; re-fetch and try again".into(),
      ));
    }

    self.emit(actor, &form, "form.items_replaced", None);
    self.store.list_items(form_id).await.map_err(Error::store)
  }

  // ── Transitions ────────────────────────────────────────────────────────

  /// Submit a draft (or returned) form for review/approval. Requires
  /// at least one line item.
  pub async fn submit(&self, actor: &Actor, form_id: Uuid) -> Result<PerformanceForm> {
    let form = self.require_form(form_id).await?;

    let relation = guard::relation_of(actor, &form);
    if !guard::allows(actor.role, Operation::Submit, relation) {
      return Err(Error::Forbidden("only the form's owner may submit it".into()));
    }

    if !form.status.is_editable() {
      return Err(Error::InvalidState(
        "only draft or returned forms can be submitted".into(),
      ));
    }

    let count = self
      .store
      .count_items(form_id)
      .await
      .map_err(Error::store)?;
    if count == 0 {
      return Err(Error::Validation(
        "at least one line item is required before submitting".into(),
      ));
    }

    let mut patch = FormPatch::status_only(FormStatus::Submitted);
    patch.submitted_at = Some(Utc::now());

    self.cas(form_id, form.status, patch).await?;

    let form = self.require_form(form_id).await?;
    self.emit(actor, &form, "form.submitted", None);
    Ok(form)
  }

  /// Record the division-level review of a submitted individual form.
  pub async fn review(
    &self,
    actor: &Actor,
    form_id: Uuid,
    comments: Option<String>,
  ) -> Result<PerformanceForm> {
    let form = self.require_form(form_id).await?;

    if !form.kind.has_review_step() {
      return Err(Error::InvalidState(
        "department and office forms are approved directly; they have no review step"
          .into(),
      ));
    }

    let relation = guard::relation_of(actor, &form);
    if !guard::allows(actor.role, Operation::Review, relation) {
      return Err(Error::Forbidden(
        "reviewing requires a division-level role over the form's unit".into(),
      ));
    }

    if form.status != FormStatus::Submitted {
      return Err(Error::InvalidState("only submitted forms can be reviewed".into()));
    }

    let mut patch = FormPatch::status_only(FormStatus::Reviewed);
    patch.reviewer_id = Some(actor.actor_id);
    patch.review_comments = comments;
    patch.reviewed_at = Some(Utc::now());

    self.cas(form_id, FormStatus::Submitted, patch).await?;

    let form = self.require_form(form_id).await?;
    self.emit(actor, &form, "form.reviewed", Some("form_reviewed"));
    Ok(form)
  }

  /// Finalize a reviewed individual form: compute and persist all
  /// ratings atomically with the terminal status change.
  pub async fn finalize(
    &self,
    actor: &Actor,
    form_id: Uuid,
    ratings: Vec<ItemRating>,
    remarks: Option<String>,
  ) -> Result<FormWithItems> {
    let form = self.require_form(form_id).await?;

    if form.kind != FormKind::Individual {
      return Err(Error::InvalidState(
        "department and office forms are approved, not finalized".into(),
      ));
    }

    let relation = guard::relation_of(actor, &form);
    if !guard::allows(actor.role, Operation::Finalize, relation) {
      return Err(Error::Forbidden(
        "finalizing requires an office-wide role".into(),
      ));
    }

    if form.status != FormStatus::Reviewed {
      return Err(Error::InvalidState("only reviewed forms can be finalized".into()));
    }

    self
      .rate_and_close(actor, &form, FormStatus::Reviewed, ratings, remarks, "form.finalized")
      .await
  }

  /// Approve a submitted department/office form — the terminal
  /// transition for those kinds, with the same rating computation as
  /// [`Self::finalize`].
  pub async fn approve(
    &self,
    actor: &Actor,
    form_id: Uuid,
    ratings: Vec<ItemRating>,
    remarks: Option<String>,
  ) -> Result<FormWithItems> {
    let form = self.require_form(form_id).await?;

    if form.kind == FormKind::Individual {
      return Err(Error::InvalidState(
        "individual forms are finalized after review, not approved".into(),
      ));
    }

    let relation = guard::relation_of(actor, &form);
    if !guard::allows(actor.role, Operation::Approve, relation) {
      return Err(Error::Forbidden("approval requires an office-wide role".into()));
    }

    if form.status != FormStatus::Submitted {
      return Err(Error::InvalidState("only submitted forms can be approved".into()));
    }

    self
      .rate_and_close(actor, &form, FormStatus::Submitted, ratings, remarks, "form.approved")
      .await
  }

  /// Send a reviewed form back to its owner for rework. Remarks are
  /// mandatory — the owner must be told why.
  pub async fn return_form(
    &self,
    actor: &Actor,
    form_id: Uuid,
    remarks: String,
  ) -> Result<PerformanceForm> {
    if remarks.trim().is_empty() {
      return Err(Error::Validation(
        "remarks are required when returning a form".into(),
      ));
    }

    let form = self.require_form(form_id).await?;

    if !form.kind.has_review_step() {
      return Err(Error::InvalidState(
        "department and office forms cannot be returned".into(),
      ));
    }

    let relation = guard::relation_of(actor, &form);
    if !guard::allows(actor.role, Operation::Return, relation) {
      return Err(Error::Forbidden(
        "returning a form requires an office-wide role".into(),
      ));
    }

    if form.status != FormStatus::Reviewed {
      return Err(Error::InvalidState("only reviewed forms can be returned".into()));
    }

    let mut patch = FormPatch::status_only(FormStatus::Returned);
    patch.remarks = Some(remarks);

    self.cas(form_id, FormStatus::Reviewed, patch).await?;

    let form = self.require_form(form_id).await?;
    self.emit(actor, &form, "form.returned", Some("form_returned"));
    Ok(form)
  }

  // ── Internals ──────────────────────────────────────────────────────────

  async fn require_form(&self, form_id: Uuid) -> Result<PerformanceForm> {
    self
      .store
      .get_form(form_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::FormNotFound(form_id))
  }

  /// Issue the conditional status write and surface a lost race as
  /// `InvalidState`.
  async fn cas(
    &self,
    form_id: Uuid,
    expected: FormStatus,
    patch: FormPatch,
  ) -> Result<()> {
    let won = self
      .store
      .transition_form(form_id, expected, patch)
      .await
      .map_err(Error::store)?;
    if !won {
      return Err(Error::InvalidState(
        "the form's status changed concurrently; re-fetch and try again".into(),
      ));
    }
    Ok(())
  }

  /// Shared tail of finalize/approve: run the aggregator over the
  /// supplied ratings and persist everything atomically with the
  /// terminal transition.
  async fn rate_and_close(
    &self,
    actor: &Actor,
    form: &PerformanceForm,
    expected: FormStatus,
    ratings: Vec<ItemRating>,
    remarks: Option<String>,
    event: &str,
  ) -> Result<FormWithItems> {
    if ratings.is_empty() {
      return Err(Error::Validation(
        "at least one item rating is required".into(),
      ));
    }

    let items = self
      .store
      .list_items(form.form_id)
      .await
      .map_err(Error::store)?;

    // The ratings must cover the form's items exactly once each, or
    // the form average would diverge from the persisted item averages.
    if ratings.len() != items.len() {
      return Err(Error::Validation(format!(
        "expected a rating for each of the form's {} line items, got {}",
        items.len(),
        ratings.len()
      )));
    }

    let mut seen: HashSet<Uuid> = HashSet::with_capacity(ratings.len());
    let mut rated: Vec<RatedItem> = Vec::with_capacity(ratings.len());
    let mut averages: Vec<f64> = Vec::with_capacity(ratings.len());
    for r in &ratings {
      if !items.iter().any(|i| i.item_id == r.item_id) {
        return Err(Error::Validation(format!(
          "rating supplied for unknown line item {}",
          r.item_id
        )));
      }
      if !seen.insert(r.item_id) {
        return Err(Error::Validation(format!(
          "duplicate rating for line item {}",
          r.item_id
        )));
      }
      let average = rating::item_average(r.quantity, r.efficiency, r.timeliness)?;
      averages.push(average);
      rated.push(RatedItem {
        item_id:    r.item_id,
        quantity:   r.quantity,
        efficiency: r.efficiency,
        timeliness: r.timeliness,
        average,
      });
    }

    let final_average = rating::form_average(&averages)?;
    let adjectival = rating::band(final_average);

    let mut patch = FormPatch::status_only(form.kind.terminal_status());
    patch.approver_id = Some(actor.actor_id);
    patch.remarks = remarks;
    patch.finalized_at = Some(Utc::now());
    patch.final_average_rating = Some(final_average);
    patch.adjectival_rating = Some(adjectival);

    let won = self
      .store
      .apply_ratings(form.form_id, expected, rated, patch)
      .await
      .map_err(Error::store)?;
    if !won {
      return Err(Error::InvalidState(
        "the form's status changed concurrently; re-fetch and try again".into(),
      ));
    }

    tracing::info!(
      form_id = %form.form_id,
      final_average,
      adjectival = adjectival.label(),
      "form closed with final rating"
    );

    let form = self.require_form(form.form_id).await?;
    self.emit(actor, &form, event, Some("form_rated"));

    let items = self
      .store
      .list_items(form.form_id)
      .await
      .map_err(Error::store)?;
    Ok(FormWithItems { form, items })
  }

  /// Fire the best-effort side effects after a successful mutation.
  /// Failures are the implementations' problem — never the caller's.
  fn emit(
    &self,
    actor: &Actor,
    form: &PerformanceForm,
    event: &str,
    template: Option<&str>,
  ) {
    self.hooks.audit.record(
      event,
      "performance_form",
      form.form_id,
      &format!("by {}", actor.actor_id),
    );
    self.hooks.cache.invalidate(&format!("forms/{}", form.form_id));

    if let (Some(template), Some(recipient)) = (template, form.subject_id) {
      self.hooks.notifier.notify(
        recipient,
        template,
        &serde_json::json!({
          "form_id": form.form_id,
          "status": form.status,
          "cycle_id": form.cycle_id,
        }),
      );
    }
  }
}
