use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::ApiError;
use crate::guard::{self, GuardOutcome};
use crate::state::AppState;

/// Route guard applied to the whole router.
///
/// On continue the resolved [`Actor`](crate::guard::Actor) is inserted into
/// the request extensions for handlers to pick up.
pub async fn route_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let outcome = guard::evaluate(
        &path,
        request.headers(),
        state.sessions.as_ref(),
        state.profiles.as_ref(),
    )
    .await;

    match outcome {
        GuardOutcome::Continue(actor) => {
            if let Some(actor) = actor {
                request.extensions_mut().insert(actor);
            }
            next.run(request).await
        }
        GuardOutcome::Redirect(location) => Redirect::temporary(&location).into_response(),
        GuardOutcome::Reject(err) => ApiError::from(err).into_response(),
    }
}
