use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::error;

use crate::web::{
    AppState, admin, auth, landing, rate_limit::limit_requests, responses::expose_error_detail,
    submissions,
};

const ROBOTS_TXT_BODY: &str = include_str!("../../robots.txt");

/// Pages inline their scripts and styles, so both allow 'unsafe-inline'.
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
style-src 'self' 'unsafe-inline'; img-src 'self' data: blob:; connect-src 'self'; \
font-src 'self'; object-src 'none'; media-src 'self'; frame-src 'none'";
const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains";

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().request_body_limit();

    Router::new()
        .route("/", get(landing::landing_page))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .route("/api/submissions", post(submissions::submit_resume))
        .route(
            "/api/submissions/:id/download",
            get(submissions::api_download),
        )
        .route("/api/submissions/:id/view", get(submissions::api_view))
        .route("/admin", get(auth::admin_root))
        .route("/admin/login", get(auth::login_page).post(auth::process_login))
        .route("/admin/logout", post(auth::logout))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/search", get(admin::search))
        .route(
            "/admin/submissions/bulk-download",
            post(admin::bulk_download),
        )
        .route("/admin/submissions/export-excel", post(admin::export_excel))
        .route(
            "/admin/submissions/:id",
            get(admin::submission_detail).delete(admin::delete_submission),
        )
        .route(
            "/admin/submissions/:id/status",
            post(admin::update_status),
        )
        .route(
            "/admin/submissions/:id/download",
            get(admin::admin_download),
        )
        .route("/admin/submissions/:id/view", get(admin::admin_view))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            expose_error_detail,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), limit_requests))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match state.bucket().count().await {
        Ok(files) => (StatusCode::OK, Json(json!({ "status": "ok", "files": files }))),
        Err(err) => {
            error!(?err, "health check could not reach resume storage");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
