use axum::{routing::{get, post}, Router};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::pg::PgConnection;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;
mod services;

use clutch_shared::middleware::JwtSecret;
use config::AppConfig;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
}

impl JwtSecret for AppState {
    fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clutch_shared::middleware::init_tracing("clutch-auth");

    let config = AppConfig::load()?;
    let port = config.port;

    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let db = Pool::builder().max_size(config.db_pool_size).build(manager)?;

    let state = Arc::new(AppState { db, config });

    let app = Router::new()
        .route("/", get(routes::health::index))
        .route("/health", get(routes::health::health_check))
        .route("/api/register", post(routes::register::register))
        .route("/api/login", post(routes::login::login))
        .route("/api/me", get(routes::me::me))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "clutch-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
