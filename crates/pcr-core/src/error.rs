//! The shared error taxonomy for PCR workflow operations.
//!
//! Every public engine operation resolves to exactly one of these
//! variants. The API layer maps each variant to a status code and a
//! short human-readable message; nothing crosses the HTTP boundary as
//! a panic or an uncaught fault.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// No valid actor accompanied the request.
  #[error("no valid actor supplied")]
  Unauthorized,

  /// A valid actor was denied by the authorization guard.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("form not found: {0}")]
  FormNotFound(Uuid),

  /// A form already exists for the requested (subject, cycle) key.
  /// Carries the existing id so callers can redirect instead of retry.
  #[error("a form already exists for this subject and cycle: {existing}")]
  DuplicateForm { existing: Uuid },

  /// The requested transition is not legal from the current status.
  /// Also raised when a conditional status write loses a race and
  /// affects zero rows.
  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("validation failed: {0}")]
  Validation(String),

  /// A store-level failure not covered by the taxonomy above.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error as [`Error::Store`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
