use anyhow::Context;
use fondita_infrastructure::ConfigService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fondita_server::telemetry::init_tracing();

    let config_service = ConfigService::from_env();
    let config = config_service
        .load()
        .with_context(|| format!("failed to load {}", config_service.path().display()))?;

    fondita_server::start_server(config).await
}
