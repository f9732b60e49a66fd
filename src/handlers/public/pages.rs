// handlers/public/pages.rs - Root and auth page view models

use axum::{extract::Query, http::Uri};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct AuthPageQuery {
    pub error: Option<String>,
    pub redirect: Option<String>,
}

/// GET / - Service description
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "CEMSE-IA",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "School incident management",
        "pages": {
            "public": ["/", "/sign-in", "/sign-up", "/forgot-password", "/reset-password", "/verify-email"],
            "signed_in": ["/dashboard", "/profile"],
            "admin": ["/users"],
        },
        "endpoints": {
            "session": "/auth/callback, /auth/sign-out",
            "profile": "/api/profile[/password|/preferences/theme]",
            "users": "/api/users[/:id] (admin)",
            "schools": "/api/schools[/:id]",
            "files": "/api/files, /api/files/evidence/:case_id",
            "audit": "/api/audit (admin)",
        }
    })))
}

/// GET /sign-in, /sign-up, /forgot-password, /reset-password, /verify-email
///
/// Echoes the `error` and `redirect` parameters set by the route guard so the
/// client can show the right message and return after sign-in.
pub async fn auth_page(uri: Uri, Query(query): Query<AuthPageQuery>) -> ApiResult<Value> {
    let page = uri.path().trim_start_matches('/');
    Ok(ApiResponse::success(json!({
        "page": page,
        "error": query.error,
        "redirect": query.redirect,
    })))
}
