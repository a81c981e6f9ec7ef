use anyhow::Context;

use mailgate::config::Config;
use mailgate::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    eprintln!("📬 mailgate v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Intake: http://{}:{}/inbound-email", config.server.bind, config.server.port);
    eprintln!("   Verify: http://{}:{}/verify-token", config.server.bind, config.server.port);

    // Missing values are not fatal at startup; each request fails closed instead.
    if config.dispatch.endpoint_url.is_none() || config.dispatch.secret.is_none() {
        tracing::error!(
            "Missing configuration: ACTION_ENDPOINT_URL or ACTION_SECRET; all accepted mail will be rejected"
        );
    }
    if config.verifier.signing_secret.is_none() {
        tracing::error!("Missing configuration: JWT_SECRET; every token verification will fail");
    }
    if config.server.intake_token.is_none() {
        tracing::error!("Missing configuration: INTAKE_TOKEN; every intake submission will be refused");
    }

    let app = server::app(&config);
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "mailgate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
