//! Shared application state for axum handlers.

use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tollgate_paygate::PaymentGate;
use tollgate_provision::Provisioner;
use tollgate_registry::RouteStore;
use tollgate_sync::PriceSyncService;
use tollgate_transcript::{MarketCatalog, Notifier, TranscriptMatcher};

/// Transcript demo collaborators, built only when enabled in config.
pub struct TranscriptContext {
    pub catalog: MarketCatalog,
    pub matcher: TranscriptMatcher,
    pub notifier: Notifier,
}

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RouteStore>,
    pub gate: Arc<PaymentGate>,
    pub sync: Arc<PriceSyncService>,
    pub provisioner: Arc<dyn Provisioner>,
    pub config: Arc<AppConfig>,
    /// Client used for forwarding to target APIs, bounded by the
    /// configured proxy timeout.
    pub proxy_client: Client,
    pub transcript: Option<Arc<TranscriptContext>>,
}

impl AppState {
    pub fn new(
        store: Arc<RouteStore>,
        gate: Arc<PaymentGate>,
        sync: Arc<PriceSyncService>,
        provisioner: Arc<dyn Provisioner>,
        config: Arc<AppConfig>,
    ) -> ServerResult<Self> {
        let proxy_client = Client::builder()
            .timeout(Duration::from_secs(config.proxy.timeout_secs))
            .build()
            .map_err(|e| ServerError::HttpClient(format!("Failed to create proxy client: {e}")))?;
        Ok(Self {
            store,
            gate,
            sync,
            provisioner,
            config,
            proxy_client,
            transcript: None,
        })
    }

    pub fn with_transcript(mut self, context: TranscriptContext) -> Self {
        self.transcript = Some(Arc::new(context));
        self
    }
}
