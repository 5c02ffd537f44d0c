use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;
use update_tracker::{build_api_route_filter, handle_rejection, App, Config, InMemoryUserDatabase};
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a local .env is optional; real deployments set the variables directly
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("update_tracker=info,warp=info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let database_connection = Arc::new(Mutex::new(InMemoryUserDatabase::new()));
    let app = App::new(&config, database_connection);

    let routes = build_api_route_filter(&app)
        .recover(handle_rejection)
        .with(warp::trace::request());

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, token_lifetime = ?config.token_lifetime, "server listening");

    warp::serve(routes).run(addr).await;

    Ok(())
}
