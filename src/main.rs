use anyhow::Result;
use axum::Router;
use tariff_engine::{api, config::Config, state::AppState, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::load()?;
    telemetry::init_tracing(cfg.log.format);

    let app_state = AppState::new(&cfg)?;

    #[allow(unused_mut)]
    let mut app: Router = api::router(app_state, &cfg);

    #[cfg(feature = "swagger")]
    {
        app = api::with_swagger(app);
    }

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("server binding to 0.0.0.0, the estimate API will be reachable from the network");
    }

    info!(%addr, "starting tariff engine");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
