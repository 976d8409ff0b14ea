//! [`SqliteStore`] — the SQLite implementation of [`ReviewStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pcr_core::{
  form::{FormKind, FormStatus, NewForm, PerformanceForm},
  item::LineItem,
  reconcile::ReconcilePlan,
  store::{FormPatch, FormQuery, FormSummary, RatedItem, ReviewStore},
};

use crate::{
  encode::{
    encode_adjectival, encode_category, encode_dt, encode_form_kind,
    encode_status, encode_uuid, RawForm, RawItem,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A PCR review store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ReviewStore impl ────────────────────────────────────────────────────────

impl ReviewStore for SqliteStore {
  type Error = Error;

  // ── Forms ─────────────────────────────────────────────────────────────────

  async fn insert_form(&self, input: NewForm) -> Result<PerformanceForm> {
    let now = Utc::now();
    let form = PerformanceForm {
      form_id:              Uuid::new_v4(),
      kind:                 input.kind,
      cycle_id:             input.cycle_id,
      subject_id:           input.subject_id,
      unit_id:              input.unit_id,
      status:               FormStatus::Draft,
      reviewer_id:          None,
      approver_id:          None,
      final_average_rating: None,
      adjectival_rating:    None,
      remarks:              None,
      review_comments:      None,
      created_at:           now,
      updated_at:           now,
      submitted_at:         None,
      reviewed_at:          None,
      finalized_at:         None,
    };

    let form_id_str    = encode_uuid(form.form_id);
    let kind_str       = encode_form_kind(form.kind).to_owned();
    let cycle_id_str   = encode_uuid(form.cycle_id);
    let subject_id_str = form.subject_id.map(encode_uuid);
    let unit_id_str    = encode_uuid(form.unit_id);
    let status_str     = encode_status(form.status).to_owned();
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO forms (
             form_id, kind, cycle_id, subject_id, unit_id, status,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            form_id_str,
            kind_str,
            cycle_id_str,
            subject_id_str,
            unit_id_str,
            status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(form)
  }

  async fn find_form_by_key(
    &self,
    kind: FormKind,
    cycle_id: Uuid,
    subject_id: Option<Uuid>,
    unit_id: Uuid,
  ) -> Result<Option<PerformanceForm>> {
    let kind_str     = encode_form_kind(kind).to_owned();
    let cycle_id_str = encode_uuid(cycle_id);
    // Individual forms are keyed by subject, department/office forms
    // by unit.
    let key_str = match kind {
      FormKind::Individual => subject_id.map(encode_uuid),
      FormKind::Department | FormKind::Office => Some(encode_uuid(unit_id)),
    };
    let by_subject = matches!(kind, FormKind::Individual);

    let raw: Option<RawForm> = self
      .conn
      .call(move |conn| {
        let sql = if by_subject {
          format!(
            "SELECT {} FROM forms
             WHERE kind = ?1 AND cycle_id = ?2 AND subject_id = ?3
             LIMIT 1",
            RawForm::COLUMNS
          )
        } else {
          format!(
            "SELECT {} FROM forms
             WHERE kind = ?1 AND cycle_id = ?2 AND unit_id = ?3
             LIMIT 1",
            RawForm::COLUMNS
          )
        };
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![kind_str, cycle_id_str, key_str],
              RawForm::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawForm::into_form).transpose()
  }

  async fn get_form(&self, form_id: Uuid) -> Result<Option<PerformanceForm>> {
    let id_str = encode_uuid(form_id);

    let raw: Option<RawForm> = self
      .conn
      .call(move |conn| {
        let sql =
          format!("SELECT {} FROM forms WHERE form_id = ?1", RawForm::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawForm::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawForm::into_form).transpose()
  }

  async fn list_forms(&self, query: &FormQuery) -> Result<Vec<FormSummary>> {
    let cycle_str   = query.cycle_id.map(encode_uuid);
    let status_str  = query.status.map(encode_status).map(str::to_owned);
    let kind_str    = query.kind.map(encode_form_kind).map(str::to_owned);
    let subject_str = query.subject_id.map(encode_uuid);
    let unit_scope  = query.unit_scope.clone();

    let raws: Vec<(RawForm, u64)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {},
             (SELECT COUNT(*) FROM line_items i WHERE i.form_id = f.form_id)
           FROM forms f
           WHERE (?1 IS NULL OR cycle_id = ?1)
             AND (?2 IS NULL OR status = ?2)
             AND (?3 IS NULL OR kind = ?3)
             AND (?4 IS NULL OR subject_id = ?4)
           ORDER BY created_at",
          RawForm::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![cycle_str, status_str, kind_str, subject_str],
            |row| Ok((RawForm::from_row(row)?, row.get::<_, u64>(17)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut summaries: Vec<FormSummary> = raws
      .into_iter()
      .map(|(raw, item_count)| {
        Ok(FormSummary { form: raw.into_form()?, item_count })
      })
      .collect::<Result<_>>()?;

    // Unit scoping is applied here rather than in SQL so the IN-list
    // does not need dynamic placeholder construction.
    if let Some(scope) = unit_scope {
      summaries.retain(|s| scope.contains(&s.form.unit_id));
    }

    Ok(summaries)
  }

  // ── Items ─────────────────────────────────────────────────────────────────

  async fn list_items(&self, form_id: Uuid) -> Result<Vec<LineItem>> {
    let id_str = encode_uuid(form_id);

    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM line_items
           WHERE form_id = ?1
           ORDER BY CASE category
               WHEN 'strategic_priority' THEN 0
               WHEN 'core_function' THEN 1
               ELSE 2
             END,
             sort_order, item_id",
          RawItem::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn count_items(&self, form_id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(form_id);

    let count: u64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM line_items WHERE form_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count)
  }

  async fn apply_plan(&self, form_id: Uuid, plan: ReconcilePlan) -> Result<bool> {
    let form_id_str = encode_uuid(form_id);
    let now_str     = encode_dt(Utc::now());

    let applied: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The editable gate first: a form that left draft/returned
        // since the engine read it takes no item writes at all.
        let changed = tx.execute(
          "UPDATE forms SET updated_at = ?1
           WHERE form_id = ?2 AND status IN ('draft', 'returned')",
          rusqlite::params![now_str, form_id_str],
        )?;

        if changed == 0 {
          // Dropping the transaction rolls it back.
          return Ok(false);
        }

        for (item_id, draft) in &plan.updates {
          // Scoped to the form so a foreign or stale id is a no-op.
          tx.execute(
            "UPDATE line_items SET
               category = ?1, sort_order = ?2, description = ?3,
               success_indicator = ?4, accountable_party = ?5,
               accomplishment = ?6, remarks = ?7,
               rating_quantity = ?8, rating_efficiency = ?9,
               rating_timeliness = ?10
             WHERE item_id = ?11 AND form_id = ?12",
            rusqlite::params![
              encode_category(draft.category),
              draft.sort_order,
              draft.description,
              draft.success_indicator,
              draft.accountable_party,
              draft.accomplishment,
              draft.remarks,
              draft.rating_quantity,
              draft.rating_efficiency,
              draft.rating_timeliness,
              encode_uuid(*item_id),
              form_id_str,
            ],
          )?;
        }

        for draft in &plan.inserts {
          tx.execute(
            "INSERT INTO line_items (
               item_id, form_id, category, sort_order, description,
               success_indicator, accountable_party, accomplishment,
               remarks, rating_quantity, rating_efficiency,
               rating_timeliness, rating_average
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, NULL)",
            rusqlite::params![
              encode_uuid(Uuid::new_v4()),
              form_id_str,
              encode_category(draft.category),
              draft.sort_order,
              draft.description,
              draft.success_indicator,
              draft.accountable_party,
              draft.accomplishment,
              draft.remarks,
              draft.rating_quantity,
              draft.rating_efficiency,
              draft.rating_timeliness,
            ],
          )?;
        }

        for item_id in &plan.delete_ids {
          tx.execute(
            "DELETE FROM line_items WHERE item_id = ?1 AND form_id = ?2",
            rusqlite::params![encode_uuid(*item_id), form_id_str],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(applied)
  }

  // ── Conditional writes ────────────────────────────────────────────────────

  async fn transition_form(
    &self,
    form_id: Uuid,
    expected: FormStatus,
    patch: FormPatch,
  ) -> Result<bool> {
    let form_id_str  = encode_uuid(form_id);
    let expected_str = encode_status(expected).to_owned();
    let params       = patch_params(&patch);

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          PATCH_SQL,
          rusqlite::params![
            params.status,
            params.updated_at,
            params.reviewer_id,
            params.approver_id,
            params.review_comments,
            params.remarks,
            params.submitted_at,
            params.reviewed_at,
            params.finalized_at,
            params.final_average_rating,
            params.adjectival_rating,
            form_id_str,
            expected_str,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn apply_ratings(
    &self,
    form_id: Uuid,
    expected: FormStatus,
    items: Vec<RatedItem>,
    patch: FormPatch,
  ) -> Result<bool> {
    let form_id_str  = encode_uuid(form_id);
    let expected_str = encode_status(expected).to_owned();
    let params       = patch_params(&patch);

    let won: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The CAS gate first: a lost race means nothing else runs.
        let changed = tx.execute(
          PATCH_SQL,
          rusqlite::params![
            params.status,
            params.updated_at,
            params.reviewer_id,
            params.approver_id,
            params.review_comments,
            params.remarks,
            params.submitted_at,
            params.reviewed_at,
            params.finalized_at,
            params.final_average_rating,
            params.adjectival_rating,
            form_id_str,
            expected_str,
          ],
        )?;

        if changed == 0 {
          // Dropping the transaction rolls it back.
          return Ok(false);
        }

        for item in &items {
          tx.execute(
            "UPDATE line_items SET
               rating_quantity = ?1, rating_efficiency = ?2,
               rating_timeliness = ?3, rating_average = ?4
             WHERE item_id = ?5 AND form_id = ?6",
            rusqlite::params![
              item.quantity,
              item.efficiency,
              item.timeliness,
              item.average,
              encode_uuid(item.item_id),
              form_id_str,
            ],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(won)
  }
}

// ─── Patch encoding ──────────────────────────────────────────────────────────

/// The conditional status update shared by `transition_form` and
/// `apply_ratings`. `COALESCE` leaves fields the patch does not carry
/// untouched; the `status` guard in the WHERE clause is the
/// compare-and-swap.
const PATCH_SQL: &str = "UPDATE forms SET
   status               = ?1,
   updated_at           = ?2,
   reviewer_id          = COALESCE(?3, reviewer_id),
   approver_id          = COALESCE(?4, approver_id),
   review_comments      = COALESCE(?5, review_comments),
   remarks              = COALESCE(?6, remarks),
   submitted_at         = COALESCE(?7, submitted_at),
   reviewed_at          = COALESCE(?8, reviewed_at),
   finalized_at         = COALESCE(?9, finalized_at),
   final_average_rating = COALESCE(?10, final_average_rating),
   adjectival_rating    = COALESCE(?11, adjectival_rating)
 WHERE form_id = ?12 AND status = ?13";

/// The patch's fields pre-encoded to their column representations.
struct PatchParams {
  status:               String,
  updated_at:           String,
  reviewer_id:          Option<String>,
  approver_id:          Option<String>,
  review_comments:      Option<String>,
  remarks:              Option<String>,
  submitted_at:         Option<String>,
  reviewed_at:          Option<String>,
  finalized_at:         Option<String>,
  final_average_rating: Option<f64>,
  adjectival_rating:    Option<String>,
}

fn patch_params(patch: &FormPatch) -> PatchParams {
  PatchParams {
    status:               encode_status(patch.status).to_owned(),
    updated_at:           encode_dt(patch.updated_at),
    reviewer_id:          patch.reviewer_id.map(encode_uuid),
    approver_id:          patch.approver_id.map(encode_uuid),
    review_comments:      patch.review_comments.clone(),
    remarks:              patch.remarks.clone(),
    submitted_at:         patch.submitted_at.map(encode_dt),
    reviewed_at:          patch.reviewed_at.map(encode_dt),
    finalized_at:         patch.finalized_at.map(encode_dt),
    final_average_rating: patch.final_average_rating,
    adjectival_rating:    patch.adjectival_rating.map(|r| encode_adjectival(r).to_owned()),
  }
}
