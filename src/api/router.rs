//! Clinic API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Access log → 2. CORS + security headers → 3. Rate limiter (auth
//! routes) or Auth guard → 4. Role guard

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Request bodies above this are rejected before deserialization.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the clinic API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn clinic_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from a pre-constructed `ApiContext` (custom rate limits).
pub fn clinic_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // Route layers run last-added first: auth, then the role guard.
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let patient = Router::new()
        .route(
            "/profile",
            get(endpoints::patient::profile).put(endpoints::patient::update_profile),
        )
        .route("/doctors", get(endpoints::patient::doctors))
        .route("/appointments/book", post(endpoints::patient::book))
        .route("/appointments", get(endpoints::patient::appointments))
        .route("/appointments/:id/cancel", put(endpoints::patient::cancel))
        .route("/records", get(endpoints::patient::records))
        .route_layer(from_fn(middleware::role::require_patient))
        .route_layer(from_fn(middleware::auth::require_auth));

    let doctor = Router::new()
        .route(
            "/profile",
            get(endpoints::doctor::profile).put(endpoints::doctor::update_profile),
        )
        .route("/appointments", get(endpoints::doctor::appointments))
        .route("/appointments/:id/status", put(endpoints::doctor::set_status))
        .route("/patients/:id", get(endpoints::doctor::patient))
        .route("/records", post(endpoints::doctor::add_record))
        .route_layer(from_fn(middleware::role::require_doctor))
        .route_layer(from_fn(middleware::auth::require_auth));

    let admin = Router::new()
        .route("/users", get(endpoints::admin::users))
        .route("/users/:id", delete(endpoints::admin::delete_user))
        .route("/doctors", post(endpoints::admin::add_doctor))
        .route("/appointments", get(endpoints::admin::appointments))
        .route("/reports", get(endpoints::admin::reports))
        .route_layer(from_fn(middleware::role::require_admin))
        .route_layer(from_fn(middleware::auth::require_auth));

    // Unprotected (rate-limited only)
    let auth = Router::new()
        .route("/register", post(endpoints::auth::register))
        .route("/login", post(endpoints::auth::login))
        .route_layer(from_fn(middleware::rate::limit));

    Router::new()
        .route("/api/health", get(endpoints::health::check))
        .nest("/api/auth", auth)
        .nest("/api/patient", patient)
        .nest("/api/doctor", doctor)
        .nest("/api/admin", admin)
        .with_state(ctx.clone())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(from_fn(middleware::access::log_access))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx))
}
