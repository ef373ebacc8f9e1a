//! LoanVet serving binary.
//!
//! Loads the classifier and its metadata once, then serves scoring requests
//! against immutable shared state. Startup aborts before the listener binds
//! if either artifact is missing or malformed.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loanvet::config::Config;
use loanvet::{handlers, ScoringContext};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loanvet=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!(
        model = %config.model_path,
        metadata = %config.metadata_path,
        "LoanVet scoring server starting"
    );

    // Fatal on failure: the process must not accept requests without a
    // loaded model/spec pair.
    let ctx = match ScoringContext::load(&config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            tracing::error!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}

fn create_router(ctx: Arc<ScoringContext>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ctx)
}
