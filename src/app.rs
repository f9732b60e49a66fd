use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::route_guard;
use crate::state::AppState;

/// Multipart framing and text fields on top of the file payloads.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        // Public
        .merge(public_routes())
        // Signed-in pages and APIs; the guard decides who gets through
        .merge(page_routes())
        .merge(profile_routes())
        .merge(user_routes())
        .merge(school_routes())
        .merge(file_routes())
        .merge(audit_routes())
        .nest_service("/static", ServeDir::new(&config.server.static_dir))
        .fallback(not_found)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config))
                .layer(DefaultBodyLimit::max(body_limit(&config)))
                .layer(middleware::from_fn_with_state(state.clone(), route_guard)),
        )
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{health, pages, session};

    Router::new()
        .route("/", get(pages::root))
        .route("/health", get(health::health))
        .route("/auth/callback", get(session::callback))
        .route("/auth/sign-out", post(session::sign_out))
        .route("/sign-in", get(pages::auth_page))
        .route("/sign-up", get(pages::auth_page))
        .route("/forgot-password", get(pages::auth_page))
        .route("/reset-password", get(pages::auth_page))
        .route("/verify-email", get(pages::auth_page))
}

fn page_routes() -> Router<AppState> {
    use protected::pages;

    Router::new()
        .route("/dashboard", get(pages::dashboard_page))
        .route("/profile", get(pages::profile_page))
        .route("/users", get(pages::users_page))
}

fn profile_routes() -> Router<AppState> {
    use protected::profile;

    Router::new()
        .route("/api/profile", get(profile::profile_get).patch(profile::profile_patch))
        .route("/api/profile/password", post(profile::password_post))
        .route(
            "/api/profile/preferences/theme",
            get(profile::theme_get).post(profile::theme_post),
        )
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::users_list).post(users::user_create))
        .route(
            "/api/users/:id",
            get(users::user_get)
                .patch(users::user_update)
                .delete(users::user_deactivate),
        )
}

fn school_routes() -> Router<AppState> {
    use protected::schools;

    Router::new()
        .route("/api/schools", get(schools::schools_list).post(schools::school_create))
        .route(
            "/api/schools/:id",
            get(schools::school_get)
                .patch(schools::school_update)
                .delete(schools::school_deactivate),
        )
}

fn file_routes() -> Router<AppState> {
    use protected::files;

    Router::new()
        .route("/api/files", post(files::file_upload).delete(files::file_delete))
        .route(
            "/api/files/evidence/:case_id",
            get(files::evidence_list).post(files::evidence_upload),
        )
}

fn audit_routes() -> Router<AppState> {
    Router::new().route("/api/audit", get(protected::audit::audit_list))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

fn body_limit(config: &AppConfig) -> usize {
    config
        .uploads
        .max_file_bytes
        .saturating_mul(config.uploads.max_batch_files.max(1))
        .saturating_add(BODY_OVERHEAD_BYTES)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
