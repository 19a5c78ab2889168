use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, RelayState, DEFAULT_MAX_BODY_BYTES};
use valuation_core::{core_config_from_lookup, ModelGateway};

/// Main entry point for the valuation relay
///
/// Loads `.env`, resolves the startup configuration once and serves the REST relay
/// (default: 0.0.0.0:3000). The provider credential is read here and never leaves the process.
///
/// # Environment Variables
/// - `GEMINI_API_KEY` (or `API_KEY`): provider credential (required)
/// - `GEMINI_API_BASE`, `VALUATION_MODEL`, `VALUATION_IMAGE_MODEL`: provider endpoint and models
/// - `REQUEST_TIMEOUT_SECS`: timeout for every outbound call (default: 60)
/// - `VALUATION_PRESENT_YEAR`: year the prompts treat as the present (default: current year)
/// - `VALUATION_REST_ADDR`: relay address (default: "0.0.0.0:3000")
/// - `VALUATION_MAX_BODY_BYTES`: request body limit (default: 16 MiB)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is missing or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("valuation=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = core_config_from_lookup(|name| std::env::var(name).ok())?;
    tracing::debug!(?cfg, "configuration resolved");

    let rest_addr =
        std::env::var("VALUATION_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let max_body_bytes =
        max_body_bytes_from_env_value(std::env::var("VALUATION_MAX_BODY_BYTES").ok())?;

    let gateway = ModelGateway::from_config(&cfg)?;
    tracing::info!(
        text_model = gateway.text_model(),
        image_model = gateway.image_model(),
        present_year = gateway.present_year(),
        "-- Starting valuation relay on {}",
        rest_addr
    );

    let app = router(RelayState::new(gateway), max_body_bytes);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn max_body_bytes_from_env_value(value: Option<String>) -> anyhow::Result<usize> {
    let Some(raw) = value else {
        return Ok(DEFAULT_MAX_BODY_BYTES);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_MAX_BODY_BYTES);
    }
    match trimmed.parse::<usize>() {
        Ok(0) | Err(_) => anyhow::bail!(
            "VALUATION_MAX_BODY_BYTES must be a positive number of bytes, got '{trimmed}'"
        ),
        Ok(bytes) => Ok(bytes),
    }
}
