use anyhow::Context;
use seatlock_api::simulation::{run_simulation, DEFAULT_CLIENTS};
use seatlock_api::{app, state::AppState};
use seatlock_store::app_config::Config;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seatlock_api=debug,seatlock_booking=debug,seatlock_store=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        "Starting seat lock service on port {} ({}x{} seats, {}s hold)",
        config.server.port,
        config.venue.rows,
        config.venue.cols,
        config.business_rules.seat_hold_seconds
    );

    let app_state = AppState::new(&config).context("Failed to initialize seat registry")?;
    let app = app(app_state);

    // `simulate` argument or SEATLOCK_SIMULATE=1
    let simulate = std::env::args().nth(1).is_some_and(|arg| arg == "simulate")
        || std::env::var("SEATLOCK_SIMULATE").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if simulate {
        let router = app.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            run_simulation(router, 1, &DEFAULT_CLIENTS).await;
        });
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
