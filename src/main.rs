use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = nexusgate::config::Config::from_env()?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "nexusgate",
        "nexusgate starting: RUST_LOG='{}', http_port={}, email_domain='{}', session_ttl_secs={}, external_provider={}",
        rust_log,
        config.http_port,
        config.email_domain,
        config.session_ttl_secs,
        config.external_provider.is_some()
    );

    nexusgate::server::run(config).await
}
