use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use ribbonline_engine::config::Config;
use ribbonline_engine::gateway::{self, AppState};
use ribbonline_engine::producer;
use ribbonline_engine::storage::AnalysisCache;

#[derive(Parser, Debug)]
#[command(
    name = "ribbonline-engine",
    about = "News impact scoring engine: collects RSS headlines and scores them with Gemini"
)]
struct Args {
    /// Listen address (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// SQLite cache path (overrides DATABASE_PATH)
    #[arg(long)]
    db: Option<String>,

    /// Run a single producer pass and exit, for use under an external cron
    #[arg(long)]
    run_once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env before config: the deployment platform used env vars for everything
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(db) = args.db {
        config.database_path = db;
    }
    let config = Arc::new(config);

    let cache = AnalysisCache::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open cache store at {}", config.database_path))?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("ribbonline-engine/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    if args.run_once {
        let outcome = producer::run(&config, &client, &cache).await;
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
        );
        return Ok(());
    }

    // In-process replacement for the platform cron: run the producer on
    // an interval when configured. The first tick fires immediately so a
    // fresh deployment serves data without waiting a full period.
    if config.refresh_interval_minutes > 0 {
        let config = Arc::clone(&config);
        let client = client.clone();
        let cache = cache.clone();
        tokio::spawn(async move {
            let period = Duration::from_secs(config.refresh_interval_minutes * 60);
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                tracing::info!("Scheduled producer run starting");
                producer::run(&config, &client, &cache).await;
            }
        });
    }

    let state = AppState {
        config: Arc::clone(&config),
        cache,
        client,
    };
    let app = gateway::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Engine listening");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
