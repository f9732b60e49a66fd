//! Request-level access decisions.
//!
//! [`evaluate`] maps a path and the request headers to continue, redirect or
//! reject. It is pure with respect to its collaborators: the same path, headers
//! and store state always produce the same outcome.

mod classify;

pub use classify::{classify, is_static_asset, matches_prefix, Area, RouteClass, Surface};

use axum::http::HeaderMap;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::database::{Profile, ProfileStore};
use crate::error::AccessError;
use crate::permissions::{self, Role};
use crate::session::{Session, SessionProvider};

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// The resolved session and its active profile, attached to guarded requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub session: Session,
    pub profile: Profile,
}

impl Actor {
    pub fn role(&self) -> Option<Role> {
        Some(self.profile.role)
    }

    pub fn id(&self) -> uuid::Uuid {
        self.profile.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Pass to the handler, with the actor when the route required one.
    Continue(Option<Actor>),
    /// 307 to the given location.
    Redirect(String),
    /// JSON error for API routes.
    Reject(AccessError),
}

/// Session, then profile. Sequential: the profile lookup needs the session's
/// identity.
pub async fn resolve_actor(
    headers: &HeaderMap,
    sessions: &dyn SessionProvider,
    profiles: &dyn ProfileStore,
) -> Result<Actor, AccessError> {
    let session = sessions
        .get_session(headers)
        .await
        .map_err(|e| AccessError::Upstream(e.to_string()))?
        .ok_or(AccessError::NoSession)?;

    let profile = profiles
        .find_profile_by_session_id(session.user_id)
        .await
        .map_err(|e| AccessError::Upstream(e.to_string()))?
        .ok_or(AccessError::InvalidSession)?;

    Ok(Actor { session, profile })
}

pub async fn evaluate(
    path: &str,
    headers: &HeaderMap,
    sessions: &dyn SessionProvider,
    profiles: &dyn ProfileStore,
) -> GuardOutcome {
    match classify(path) {
        RouteClass::Excluded | RouteClass::Public | RouteClass::Unguarded => GuardOutcome::Continue(None),
        RouteClass::AuthPage => match sessions.get_session(headers).await {
            Ok(Some(_)) => GuardOutcome::Redirect(DASHBOARD_PATH.to_string()),
            Ok(None) => GuardOutcome::Continue(None),
            Err(e) => {
                // Auth pages are public; a broken provider just means "not signed in".
                warn!("Session lookup failed on {}: {}", path, e);
                GuardOutcome::Continue(None)
            }
        },
        RouteClass::Protected { area, surface } => {
            let decision = resolve_actor(headers, sessions, profiles)
                .await
                .and_then(|actor| authorize(area, actor));

            match decision {
                Ok(actor) => {
                    debug!("Guard allowed {} for profile {}", path, actor.profile.id);
                    GuardOutcome::Continue(Some(actor))
                }
                Err(err) => deny(path, surface, err),
            }
        }
    }
}

fn authorize(area: Area, actor: Actor) -> Result<Actor, AccessError> {
    if area.admin_only() {
        permissions::require_admin(actor.role())?;
    }
    Ok(actor)
}

fn deny(path: &str, surface: Surface, err: AccessError) -> GuardOutcome {
    match (&err, surface) {
        (AccessError::Upstream(detail), _) => {
            tracing::error!("Guard failed closed on {}: {}", path, detail);
            GuardOutcome::Redirect(sign_in_with("error", "session_error"))
        }
        (_, Surface::Api) => {
            debug!("Guard rejected {}: {}", path, err);
            GuardOutcome::Reject(err)
        }
        (AccessError::NoSession, Surface::Page) => GuardOutcome::Redirect(sign_in_with("redirect", path)),
        (AccessError::InvalidSession, Surface::Page) => {
            GuardOutcome::Redirect(sign_in_with("error", "invalid_session"))
        }
        (AccessError::Unauthorized, Surface::Page) | (AccessError::Validation(_), Surface::Page) => {
            GuardOutcome::Redirect(with_query(DASHBOARD_PATH, "error", "unauthorized"))
        }
    }
}

fn sign_in_with(key: &str, value: &str) -> String {
    with_query(SIGN_IN_PATH, key, value)
}

fn with_query(path: &str, key: &str, value: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{}?{}", path, query)
}
