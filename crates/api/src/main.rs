use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xtrends_core::domain::counts::{compute_counts, CountsResponse};
use xtrends_core::ingest::{HttpJsonSearchProvider, PostSearchClient};

const INDEX_HTML: &str = include_str!("index.html");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = xtrends_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let search: Option<Arc<dyn PostSearchClient>> =
        match HttpJsonSearchProvider::from_settings(&settings) {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "search provider unavailable; starting API in degraded mode");
                None
            }
        };

    let state = AppState {
        search,
        max_posts: settings.max_posts,
    };

    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, max_posts = settings.max_posts, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/counts", get(get_counts))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    search: Option<Arc<dyn PostSearchClient>>,
    max_posts: usize,
}

#[derive(Debug, Deserialize)]
struct CountsParams {
    q: Option<String>,
}

async fn get_counts(
    State(state): State<AppState>,
    Query(params): Query<CountsParams>,
) -> Result<Json<CountsResponse>, Response> {
    let q = params.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing q").into_response());
    }

    let Some(search) = &state.search else {
        return Err(StatusCode::SERVICE_UNAVAILABLE.into_response());
    };

    let now = chrono::Utc::now();
    let counts = compute_counts(search.as_ref(), q, state.max_posts, now)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(query = %q, error = %format!("{e:#}"), "counts request failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })?;

    Ok(Json(counts))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &xtrends_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
