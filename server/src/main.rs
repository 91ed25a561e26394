mod config;
mod frame;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use config::RelayConfig;
use services::lucky::LuckyNumbers;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    // The relay has nothing to serve without an upstream, so a bad LLM config is fatal.
    let llm = match llm::LlmClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "LLM client not configured");
            std::process::exit(1);
        }
    };

    let config = RelayConfig::from_env();
    let port = config.port;
    tracing::info!(%port, model = llm.model(), dev_mode = config.dev_mode, "fortune relay starting");

    let state = state::AppState::new(Arc::new(llm), Arc::new(LuckyNumbers::default()), config);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "fortune relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
