use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::guard::{self, Actor};
use crate::state::AppState;

#[axum::async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        // Route outside the guarded prefixes; resolve on demand.
        let actor = guard::resolve_actor(&parts.headers, state.sessions.as_ref(), state.profiles.as_ref()).await?;
        Ok(actor)
    }
}
