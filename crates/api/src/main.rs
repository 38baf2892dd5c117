use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oilshock_core::config::{EngineConfig, Settings};
use oilshock_core::engine::{ScenarioCatalog, Simulator};
use oilshock_core::llm::anthropic::AnthropicClient;
use oilshock_core::llm::LlmClient;
use oilshock_core::model::sarimax::SarimaxModel;
use oilshock_core::model::FittedModel;

mod error;
mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let engine_config = EngineConfig::from_settings(&settings)?;
    let simulator = Arc::new(Simulator::new(ScenarioCatalog::builtin(), &engine_config));

    let model: Option<Arc<dyn FittedModel>> = match settings
        .require_model_path()
        .and_then(SarimaxModel::from_path)
    {
        Ok(model) => Some(Arc::new(model) as Arc<dyn FittedModel>),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "model not loaded; starting API in degraded mode");
            None
        }
    };

    let llm: Option<Arc<dyn LlmClient>> =
        match AnthropicClient::from_settings(&settings, simulator.catalog()) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn LlmClient>),
            Err(e) => {
                tracing::warn!(error = %e, "language model not configured; /simulate disabled");
                None
            }
        };

    let state = AppState {
        model,
        simulator,
        llm,
    };

    let app = Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/scenarios", get(routes::list_scenarios))
        .route("/current-price", get(routes::current_price))
        .route("/simulate", post(routes::simulate))
        .route("/simulate-direct", post(routes::simulate_direct))
        .route("/simulate-intent", post(routes::simulate_intent))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
