use rust_loan_api::config::Config;
use rust_loan_api::db::Database;
use rust_loan_api::handlers::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rust_loan_api=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let database = Database::new(&config.database_url).await?;
    tracing::info!("Database connected and migrations applied");

    let port = config.port;
    let state = Arc::new(AppState {
        pool: database.pool,
        config,
    });

    let app = rust_loan_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on port {}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
