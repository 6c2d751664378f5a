//! HTTP client for the asset-launch collaborator.

use crate::error::{ProvisionError, ProvisionResult};
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tollgate_core::RouteConfig;
use tracing::{debug, info};

/// Timeout for launch requests.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for status checks.
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Placeholder asset image, pinned once and reused for every launch.
const DEFAULT_IMAGE_IPFS: &str = "QmX7UbPKJ7Drci3y6p6E8oi5TpUiG7NH3qSzcohPX9Xkvo";

/// Accepted launch request: the job to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchJob {
    pub job_id: String,
    pub queue_position: u32,
}

/// Metadata of a resolved price source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedSource {
    pub source_id: String,
    pub symbol: Option<String>,
    pub token_uri: Option<String>,
    pub tx_hash: Option<String>,
}

/// Result of a job status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchStatus {
    Pending,
    Deployed(DeployedSource),
}

/// Asynchronous price-source provisioning.
///
/// Object-safe; the server and tests hold `Arc<dyn Provisioner>`.
pub trait Provisioner: Send + Sync {
    /// Kick off a launch; returns the job to poll. Never blocks on
    /// deployment.
    fn launch<'a>(&'a self, route: &'a RouteConfig) -> BoxFuture<'a, ProvisionResult<LaunchJob>>;

    /// One status poll for a previously accepted job.
    fn status<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, ProvisionResult<LaunchStatus>>;
}

/// Launch request body, collaborator-defined camelCase.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchRequest {
    name: String,
    symbol: String,
    description: String,
    image_ipfs: String,
    creator_address: String,
    market_cap: String,
    creator_fee_split: String,
    fair_launch_duration: String,
    sniper_protection: bool,
}

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "jobId", default)]
    job_id: Option<String>,
    #[serde(rename = "queueStatus", default)]
    queue_status: Option<QueueStatus>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    #[serde(default)]
    position: u32,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "collectionToken", default)]
    collection_token: Option<CollectionToken>,
    #[serde(rename = "transactionHash", default)]
    transaction_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionToken {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(rename = "tokenURI", default)]
    token_uri: Option<String>,
}

/// Provisioner backed by the launch collaborator's HTTP API.
pub struct HttpProvisioner {
    client: Client,
    base_url: String,
    network: String,
}

impl HttpProvisioner {
    pub fn new(base_url: impl Into<String>, network: impl Into<String>) -> ProvisionResult<Self> {
        let client = Client::builder()
            .timeout(LAUNCH_TIMEOUT)
            .build()
            .map_err(|e| ProvisionError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            network: network.into(),
        })
    }

    fn launch_body(route: &RouteConfig) -> LaunchRequest {
        let symbol = route.derived_symbol();
        LaunchRequest {
            name: format!("{} Token", route.name),
            symbol: symbol.clone(),
            description: format!(
                "Pay with {symbol} to access {}. Token price = API access cost.",
                route.name
            ),
            image_ipfs: DEFAULT_IMAGE_IPFS.to_string(),
            creator_address: route.payout_address.clone(),
            market_cap: route.starting_market_cap.clone(),
            creator_fee_split: "8000".to_string(),
            fair_launch_duration: "0".to_string(),
            sniper_protection: true,
        }
    }

    async fn launch_inner(&self, route: &RouteConfig) -> ProvisionResult<LaunchJob> {
        let url = format!("{}/{}/launch-memecoin", self.base_url, self.network);
        let body = Self::launch_body(route);
        info!(path = %route.path, name = %route.name, "Launching price source");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProvisionError::Unavailable(format!("launch request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProvisionError::Unavailable(format!(
                "HTTP {status}: {text}"
            )));
        }

        let parsed: LaunchResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Unavailable(format!("malformed launch response: {e}")))?;

        if !parsed.success {
            return Err(ProvisionError::Rejected(
                parsed.error.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }
        let job_id = parsed
            .job_id
            .ok_or_else(|| ProvisionError::Rejected("accepted without job id".to_string()))?;

        info!(%job_id, path = %route.path, "Launch queued");
        Ok(LaunchJob {
            job_id,
            queue_position: parsed.queue_status.map(|q| q.position).unwrap_or(0),
        })
    }

    async fn status_inner(&self, job_id: &str) -> ProvisionResult<LaunchStatus> {
        let url = format!("{}/launch-status/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProvisionError::Unavailable(format!("status request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::Unavailable(format!("HTTP {status} from {url}")));
        }

        let parsed: StatusResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::Unavailable(format!("malformed status response: {e}")))?;

        debug!(%job_id, success = parsed.success, "Job status checked");
        Ok(Self::interpret_status(parsed))
    }

    /// A job counts as deployed only once the collaborator reports success
    /// with a resolved asset address; anything else is still pending.
    fn interpret_status(parsed: StatusResponse) -> LaunchStatus {
        if !parsed.success {
            return LaunchStatus::Pending;
        }
        let Some(token) = parsed.collection_token else {
            return LaunchStatus::Pending;
        };
        let Some(address) = token.address else {
            return LaunchStatus::Pending;
        };
        LaunchStatus::Deployed(DeployedSource {
            source_id: address,
            symbol: token.symbol,
            token_uri: token.token_uri,
            tx_hash: parsed.transaction_hash,
        })
    }
}

impl Provisioner for HttpProvisioner {
    fn launch<'a>(&'a self, route: &'a RouteConfig) -> BoxFuture<'a, ProvisionResult<LaunchJob>> {
        Box::pin(self.launch_inner(route))
    }

    fn status<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, ProvisionResult<LaunchStatus>> {
        Box::pin(self.status_inner(job_id))
    }
}
