//! Router assembly and HTTP serving
//!
//! Flat route table for the analytics and admin families; the source-host
//! family hangs off a `/repos` wildcard and dispatches on segment count.
//! Every route except `/health` sits behind the API-key middleware.

use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::{from_fn_with_state, map_response};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use codetel_shared::HealthResponse;

use crate::error::SimulatorError;
use crate::handlers::{ai_code, by_user, research, source_host, team_analytics, teams};
use crate::state::AppState;
use crate::{admin, auth};

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.store.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        developers: stats.developers,
        events_generated: stats.total_events(),
        uptime: state.uptime_human(),
    })
}

async fn not_found() -> SimulatorError {
    SimulatorError::not_found("no such endpoint")
}

/// Re-render the method router's empty-body 405 through the shared error
/// shape, keeping the `Allow` header it computed.
async fn render_method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut replaced = SimulatorError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        replaced.headers_mut().insert(header::ALLOW, allow);
    }
    replaced
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health (unauthenticated, exempted in the middleware)
        .route("/health", get(health))
        // Teams
        .route("/teams/members", get(teams::members))
        .route("/teams/daily-usage-data", get(teams::daily_usage_data))
        .route("/teams/spend", get(teams::spend))
        .route(
            "/teams/filtered-usage-events",
            get(teams::filtered_usage_events),
        )
        // AI-code tracking
        .route("/analytics/ai-code/commits", get(ai_code::commits))
        .route("/analytics/ai-code/commits.csv", get(ai_code::commits_csv))
        .route("/analytics/ai-code/changes", get(ai_code::changes))
        .route("/analytics/ai-code/changes.csv", get(ai_code::changes_csv))
        // Team-scoped analytics
        .route(
            "/analytics/team/agent-edits",
            get(team_analytics::agent_edits),
        )
        .route("/analytics/team/tabs", get(team_analytics::tabs))
        .route("/analytics/team/dau", get(team_analytics::dau))
        .route("/analytics/team/models", get(team_analytics::models))
        .route(
            "/analytics/team/client-versions",
            get(team_analytics::client_versions),
        )
        .route(
            "/analytics/team/top-file-extensions",
            get(team_analytics::top_file_extensions),
        )
        .route("/analytics/team/mcp", get(team_analytics::mcp))
        .route("/analytics/team/commands", get(team_analytics::commands))
        .route("/analytics/team/plans", get(team_analytics::plans))
        .route("/analytics/team/ask-mode", get(team_analytics::ask_mode))
        .route(
            "/analytics/team/leaderboard",
            get(team_analytics::leaderboard),
        )
        // By-user analytics
        .route("/analytics/by-user/agent-edits", get(by_user::agent_edits))
        .route("/analytics/by-user/tabs", get(by_user::tabs))
        .route("/analytics/by-user/dau", get(by_user::dau))
        .route("/analytics/by-user/models", get(by_user::models))
        .route(
            "/analytics/by-user/client-versions",
            get(by_user::client_versions),
        )
        .route(
            "/analytics/by-user/top-file-extensions",
            get(by_user::top_file_extensions),
        )
        .route("/analytics/by-user/mcp", get(by_user::mcp))
        .route("/analytics/by-user/commands", get(by_user::commands))
        .route("/analytics/by-user/plans", get(by_user::plans))
        .route("/analytics/by-user/ask-mode", get(by_user::ask_mode))
        // Research surface
        .route("/research/dataset", get(research::dataset))
        .route("/research/dataset.csv", get(research::dataset_csv))
        .route("/research/metrics/velocity", get(research::velocity))
        .route("/research/metrics/review-costs", get(research::review_costs))
        .route("/research/metrics/quality", get(research::quality))
        // Source-host family
        .route("/repos", get(source_host::list_repos))
        .route("/repos/*rest", get(source_host::dispatch))
        // Admin plane
        .route("/admin/config", get(admin::config))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/seed", post(admin::upload_seed))
        .route("/admin/seed/presets", get(admin::presets))
        .route("/admin/regenerate", post(admin::regenerate))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    state.config.server.request_timeout_seconds,
                )))
                .layer(from_fn_with_state(state.clone(), auth::require_api_key))
                .layer(CorsLayer::permissive())
                .layer(map_response(render_method_not_allowed)),
        )
        .with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("simulator listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("simulator shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("received terminate signal, shutting down");
        },
    }
}
