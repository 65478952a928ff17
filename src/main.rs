use axum::serve;
use pact_broker_rust::config::AppConfig;
use pact_broker_rust::store::InMemoryStore;
use pact_broker_rust::{build_app, seed};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    println!("Pact Broker: compatibility matrix server");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let store = Arc::new(InMemoryStore::new());

    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        println!("Loading seed data...");
        seed::load_seed_data(&store)?;
        println!("Seed data loaded successfully");
    }

    run_server(build_app(store, &config), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Pact Broker server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
