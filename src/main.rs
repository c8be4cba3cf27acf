use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use budget_tracker::app::{AppState, Repositories, build_router};
use budget_tracker::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("budget_tracker=info,tower_http=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let repositories = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;
            info!("connected to database");

            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("migrations completed");

            Repositories::postgres(pool)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            Repositories::in_memory()
        }
    };

    let addr = config.bind_address();
    let state = AppState::new(repositories, config.jwt_secret, config.admin_email);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "server running");
    info!("API docs at http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
