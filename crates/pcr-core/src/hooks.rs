//! Side-effect ports consumed by the workflow engine.
//!
//! Audit, notification, and read-model invalidation are best-effort
//! collaborators: the engine fires them after a successful mutation
//! and never lets their failure roll back the transition. Delivery
//! mechanics live behind these traits, outside this workspace; the
//! default implementations emit structured tracing events so a bare
//! deployment still has a usable audit trail in its logs.

use std::sync::Arc;

use uuid::Uuid;

// ─── Ports ───────────────────────────────────────────────────────────────────

/// Fire-and-forget audit sink. Implementations own their error
/// handling — the engine does not observe failures.
pub trait AuditSink: Send + Sync {
  fn record(&self, event_type: &str, entity_kind: &str, entity_id: Uuid, detail: &str);
}

/// Best-effort notification dispatcher.
pub trait Notifier: Send + Sync {
  fn notify(&self, recipient: Uuid, template_key: &str, context: &serde_json::Value);
}

/// Read-model/cache invalidation hook, keyed by the affected path.
pub trait CacheInvalidator: Send + Sync {
  fn invalidate(&self, key: &str);
}

// ─── Tracing-backed defaults ─────────────────────────────────────────────────

/// Audit sink that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
  fn record(&self, event_type: &str, entity_kind: &str, entity_id: Uuid, detail: &str) {
    tracing::info!(
      target: "pcr::audit",
      event_type,
      entity_kind,
      %entity_id,
      detail,
      "audit event"
    );
  }
}

/// Notifier that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, recipient: Uuid, template_key: &str, context: &serde_json::Value) {
    tracing::debug!(
      target: "pcr::notify",
      %recipient,
      template_key,
      %context,
      "notification dispatched"
    );
  }
}

/// Invalidator that does nothing beyond a trace event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
  fn invalidate(&self, key: &str) {
    tracing::debug!(target: "pcr::cache", key, "cache invalidated");
  }
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// The engine's side-effect collaborators, bundled for injection.
#[derive(Clone)]
pub struct Hooks {
  pub audit:    Arc<dyn AuditSink>,
  pub notifier: Arc<dyn Notifier>,
  pub cache:    Arc<dyn CacheInvalidator>,
}

impl Default for Hooks {
  fn default() -> Self {
    Self {
      audit:    Arc::new(TracingAudit),
      notifier: Arc::new(TracingNotifier),
      cache:    Arc::new(NoopInvalidator),
    }
  }
}
