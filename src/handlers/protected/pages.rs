// handlers/protected/pages.rs - View models for the signed-in pages
//
// Pages are served as JSON; rendering happens in the client.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::{Profile, ProfileFilter, School};
use crate::guard::Actor;
use crate::middleware::{ApiResponse, ApiResult};
use crate::permissions::{self, Role};
use crate::session::cookie_value;
use crate::state::AppState;
use crate::ui::{SidebarState, Theme};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Layout {
    pub theme: Theme,
    pub sidebar: SidebarState,
    pub navigation: Vec<NavItem>,
}

fn navigation(role: Option<Role>) -> Vec<NavItem> {
    let mut items = vec![
        NavItem {
            label: "Dashboard",
            href: "/dashboard",
        },
        NavItem {
            label: "Profile",
            href: "/profile",
        },
    ];
    if permissions::is_admin(role) {
        items.push(NavItem {
            label: "Users",
            href: "/users",
        });
    }
    items
}

fn layout(state: &AppState, headers: &HeaderMap, actor: &Actor) -> Layout {
    let theme = cookie_value(headers, &state.config.session.theme_cookie_name)
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();

    Layout {
        theme,
        sidebar: SidebarState::default(),
        navigation: navigation(actor.role()),
    }
}

async fn school_of(state: &AppState, profile: &Profile) -> Option<School> {
    let school_id = profile.school_id?;
    match state.schools.find_school(school_id).await {
        Ok(school) => school,
        Err(e) => {
            // The dashboard still renders without the school card.
            tracing::warn!("Failed to load school {} for dashboard: {}", school_id, e);
            None
        }
    }
}

/// GET /dashboard
pub async fn dashboard_page(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> ApiResult<Value> {
    let school = school_of(&state, &actor.profile).await;

    Ok(ApiResponse::success(json!({
        "page": "dashboard",
        "profile": {
            "id": actor.profile.id,
            "name": actor.profile.name,
            "email": actor.profile.email,
            "role": actor.profile.role,
        },
        "school": school,
        "is_admin": permissions::is_admin(actor.role()),
        "force_password_change": actor.profile.force_password_change,
        "error": query.error,
        "layout": layout(&state, &headers, &actor),
    })))
}

/// GET /profile
pub async fn profile_page(State(state): State<AppState>, actor: Actor, headers: HeaderMap) -> ApiResult<Value> {
    let school = school_of(&state, &actor.profile).await;

    Ok(ApiResponse::success(json!({
        "page": "profile",
        "profile": actor.profile,
        "school": school,
        "layout": layout(&state, &headers, &actor),
    })))
}

/// GET /users - Administrator user list
pub async fn users_page(State(state): State<AppState>, actor: Actor, headers: HeaderMap) -> ApiResult<Value> {
    permissions::require_admin(actor.role())?;

    let users = state.profiles.list_profiles(&ProfileFilter::default()).await?;
    let assignable_roles: Vec<Role> = Role::ALL
        .iter()
        .copied()
        .filter(|role| permissions::can_create_user_with_role(actor.role(), *role))
        .collect();

    Ok(ApiResponse::success(json!({
        "page": "users",
        "users": users,
        "assignable_roles": assignable_roles,
        "layout": layout(&state, &headers, &actor),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_hides_admin_pages() {
        let hrefs = |role| navigation(role).iter().map(|i| i.href).collect::<Vec<_>>();
        assert_eq!(hrefs(Some(Role::User)), vec!["/dashboard", "/profile"]);
        assert_eq!(hrefs(Some(Role::Admin)), vec!["/dashboard", "/profile", "/users"]);
        assert_eq!(hrefs(None), vec!["/dashboard", "/profile"]);
    }
}
