//! Prediction-market title catalog.

use crate::error::{TranscriptError, TranscriptResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CATALOG_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    data: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    question: Option<String>,
}

/// Fetches candidate market titles from the catalog collaborator.
pub struct MarketCatalog {
    client: Client,
    url: String,
}

impl MarketCatalog {
    pub fn new(url: impl Into<String>) -> TranscriptResult<Self> {
        let client = Client::builder()
            .timeout(CATALOG_TIMEOUT)
            .build()
            .map_err(|e| TranscriptError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Fetch all market titles. Entries without a question are skipped.
    pub async fn titles(&self) -> TranscriptResult<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TranscriptError::CatalogUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptError::CatalogUnavailable(format!("HTTP {status}")));
        }

        let parsed: CatalogResponse = response
            .json()
            .await
            .map_err(|e| TranscriptError::CatalogUnavailable(format!("malformed catalog: {e}")))?;

        let titles: Vec<String> = parsed
            .data
            .into_iter()
            .filter_map(|entry| entry.question)
            .collect();
        debug!(count = titles.len(), "Fetched market titles");
        Ok(titles)
    }
}
