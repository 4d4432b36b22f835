use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ukuvi::{client::client, functions::functions};
use ukuvi_core::{connect, App, Connection};
use ukuvi_http_connection::{HttpConnection, HttpConnectionConfig};

const DEFAULT_SERVICE_NAME: &str = "ukuvi-worker";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing()?;

    tracing::info!("worker: starting");

    let config = HttpConnectionConfig::from_env()?;
    let connection: Arc<dyn Connection> = Arc::new(HttpConnection::new(config));

    let app = App::new(client(), functions())?;

    connect(connection, vec![app]).start().await
}

fn init_tracing() -> anyhow::Result<()> {
    let jaeger_enabled = dotenvy::var("JAEGER_ENABLED")
        .map(|value| value == "true" || value == "1")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer());

    if jaeger_enabled {
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(DEFAULT_SERVICE_NAME)
            .install_simple()?;

        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;
    } else {
        registry.try_init()?;
    }

    Ok(())
}
