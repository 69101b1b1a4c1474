use std::{env, net::SocketAddr, path::Path};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::{self, users::ServerState};
use service::{file::user_records::UserStore, runtime};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load host/port from configs or env vars, with sensible fallbacks
fn load_bind_addr() -> anyhow::Result<SocketAddr> {
    let (host, port) = match configs::load_default() {
        Ok(cfg) => {
            let s = cfg.server;
            (s.host, s.port)
        }
        Err(_) => {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8080);
            (host, port)
        }
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

/// Resolve the store document location: config.toml, then the `USERS_FILE`
/// env var, then the default process-relative path.
fn load_users_file() -> String {
    match configs::load_default() {
        Ok(mut cfg) => {
            cfg.storage.normalize_from_env();
            cfg.storage.users_file
        }
        Err(_) => env::var("USERS_FILE").unwrap_or_else(|_| "data/users.json".to_string()),
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let users_file = load_users_file();
    if let Some(dir) = Path::new(&users_file)
        .parent()
        .and_then(|p| p.to_str())
        .filter(|d| !d.is_empty())
    {
        runtime::ensure_env(dir).await?;
    }

    let users = UserStore::new(users_file.as_str()).await;
    let state = ServerState { users };

    let cors = build_cors();
    let app: Router = routes::build_router(state, cors);

    let addr = load_bind_addr()?;
    info!(%addr, %users_file, "starting user record service");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
