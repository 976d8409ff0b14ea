//! Actor extraction from the `X-Actor` request header.
//!
//! Authentication happens upstream: the portal's identity middleware
//! resolves the session into an [`Actor`] (role plus org-unit facts)
//! and forwards it as a JSON-encoded header. A missing or malformed
//! header is a 401 — the workflow layer never sees such a request.

use axum::{extract::FromRequestParts, http::request::Parts};
use pcr_core::actor::Actor;

use crate::error::ApiError;

/// Header carrying the resolved actor, JSON-encoded.
pub const ACTOR_HEADER: &str = "x-actor";

/// Extractor wrapper around the resolved [`Actor`].
#[derive(Debug, Clone)]
pub struct ActorHeader(pub Actor);

impl<S> FromRequestParts<S> for ActorHeader
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let unauthorized = || ApiError::Workflow(pcr_core::Error::Unauthorized);

    let value = parts.headers.get(ACTOR_HEADER).ok_or_else(unauthorized)?;
    let raw = value.to_str().map_err(|_| unauthorized())?;
    let actor: Actor = serde_json::from_str(raw).map_err(|_| unauthorized())?;
    Ok(Self(actor))
  }
}
