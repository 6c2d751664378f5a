//! Route identity and configuration records.

use crate::error::{CoreError, Result};
use crate::price::UsdPrice;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public mount point of a wrapped API, normalized to a leading `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutePath(String);

impl RoutePath {
    /// Create a path, normalizing a missing leading slash.
    ///
    /// Rejects empty paths and paths containing whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() || raw == "/" {
            return Err(CoreError::InvalidPath("path must not be empty".into()));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidPath(format!(
                "path must not contain whitespace: {raw:?}"
            )));
        }
        let normalized = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        };
        Ok(Self(normalized))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoutePath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// HTTP method forwarded to the target, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyMethod {
    #[default]
    Get,
    Post,
}

impl ProxyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl FromStr for ProxyMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(CoreError::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for ProxyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a route's external price source.
///
/// `Pending` until the provisioning job resolves to a live price source,
/// then `Deployed` permanently. No reverse transition exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningState {
    #[default]
    Pending,
    Deployed,
}

/// Validate that a target URL is absolute http(s).
pub fn validate_target_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(CoreError::InvalidTargetUrl(format!(
            "target URL must be absolute http(s): {url}"
        )))
    }
}

/// One registered route and its pricing state.
///
/// `current_price` is only meaningful once `provisioning` is `Deployed`;
/// until then the gateway treats the route as unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: RoutePath,
    pub name: String,
    pub target_url: String,
    pub method: ProxyMethod,
    pub payout_address: String,
    /// External price-bearing asset id; `None` until provisioning resolves.
    pub price_source_id: Option<String>,
    /// Asset symbol reported by the provisioning collaborator.
    pub symbol: Option<String>,
    pub token_uri: Option<String>,
    pub tx_hash: Option<String>,
    /// Provisioning job reference while still pending.
    pub job_id: Option<String>,
    pub provisioning: ProvisioningState,
    /// Raw asset price from the last successful fetch.
    pub source_price: Option<UsdPrice>,
    /// Advertised access price; `source_price * price_multiplier`.
    pub current_price: Option<UsdPrice>,
    pub price_multiplier: Decimal,
    /// Starting market cap passed to the provisioning collaborator.
    pub starting_market_cap: String,
    pub volume_24h: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    /// True for routes hydrated from the routes file at startup.
    pub preexisting: bool,
}

impl RouteConfig {
    /// Create a new route in `Pending` state.
    pub fn new(
        path: RoutePath,
        name: impl Into<String>,
        target_url: impl Into<String>,
        method: ProxyMethod,
        payout_address: impl Into<String>,
        price_multiplier: Decimal,
        starting_market_cap: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let target_url = target_url.into();
        let payout_address = payout_address.into();
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("route name must not be empty".into()));
        }
        if payout_address.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "payout address must not be empty".into(),
            ));
        }
        validate_target_url(&target_url)?;
        Ok(Self {
            path,
            name,
            target_url,
            method,
            payout_address,
            price_source_id: None,
            symbol: None,
            token_uri: None,
            tx_hash: None,
            job_id: None,
            provisioning: ProvisioningState::Pending,
            source_price: None,
            current_price: None,
            price_multiplier,
            starting_market_cap: starting_market_cap.into(),
            volume_24h: None,
            created_at: Utc::now(),
            preexisting: false,
        })
    }

    #[inline]
    pub fn is_deployed(&self) -> bool {
        self.provisioning == ProvisioningState::Deployed
    }

    /// Derive the asset symbol the provisioning collaborator is asked for.
    pub fn derived_symbol(&self) -> String {
        let prefix: String = self
            .name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_ascii_uppercase();
        format!("{prefix}API")
    }
}
