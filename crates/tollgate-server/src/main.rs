//! tollgate - priced proxy registry with self-updating access prices.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tollgate_feed::HttpPriceFeed;
use tollgate_paygate::PaymentGate;
use tollgate_provision::HttpProvisioner;
use tollgate_registry::RouteStore;
use tollgate_server::{AppConfig, AppState, TranscriptContext};
use tollgate_sync::PriceSyncService;
use tollgate_telemetry::metrics;
use tollgate_transcript::{MarketCatalog, Notifier, TranscriptMatcher};
use tracing::info;

/// Wrap any API behind a dynamically priced paywall.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TOLLGATE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tollgate_telemetry::init_logging()?;
    info!("Starting tollgate v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > TOLLGATE_CONFIG env var > default
    let config = match args.config {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::load()?,
    };
    info!(network = %config.network, port = config.server.port, "Configuration loaded");
    let config = Arc::new(config);

    let store = Arc::new(RouteStore::new());
    hydrate_routes(&store, &config)?;

    let feed = Arc::new(HttpPriceFeed::new(&config.data_api_url, &config.network)?);
    let provisioner = Arc::new(HttpProvisioner::new(
        &config.launch_api_url,
        &config.network,
    )?);
    let gate = Arc::new(PaymentGate::new(&config.network));
    let sync = Arc::new(PriceSyncService::new(
        store.clone(),
        feed,
        provisioner.clone(),
        gate.clone(),
        Duration::from_secs(config.sync.interval_secs),
        config.persistence.routes_file.clone(),
    ));

    // Price hydrated routes before accepting traffic, then hand the
    // cadence to the background loop.
    if !store.is_empty() {
        sync.tick().await;
    }
    tokio::spawn(Arc::clone(&sync).run());

    let mut state = AppState::new(store, gate, sync, provisioner, config.clone())?;
    if config.transcript.enabled {
        state = state.with_transcript(build_transcript_context(&config)?);
        info!(markets_url = %config.transcript.markets_url, "Transcript matching enabled");
    }

    let app = tollgate_server::create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Repopulate the store from the routes file, if configured.
fn hydrate_routes(store: &RouteStore, config: &AppConfig) -> Result<()> {
    let Some(file) = &config.persistence.routes_file else {
        return Ok(());
    };
    let routes = tollgate_registry::load_routes(
        Path::new(file),
        config.pricing.default_multiplier,
    )?;
    for route in routes {
        let path = route.path.clone();
        if let Err(e) = store.insert(route) {
            tracing::warn!(path = %path, error = %e, "Skipping duplicate route from file");
        }
    }
    metrics::ROUTES_REGISTERED.set(store.len() as i64);
    info!(routes = store.len(), file = %file.display(), "Routes hydrated");
    Ok(())
}

fn build_transcript_context(config: &AppConfig) -> Result<TranscriptContext> {
    let api_key = std::env::var("TOLLGATE_CHAT_API_KEY").ok();
    Ok(TranscriptContext {
        catalog: MarketCatalog::new(&config.transcript.markets_url)?,
        matcher: TranscriptMatcher::new(
            &config.transcript.chat_api_url,
            &config.transcript.model,
            api_key,
        )?,
        notifier: Notifier::new(config.transcript.webhook_url.clone())?,
    })
}
