//! Price feed client for tollgate.
//!
//! Fetches a price source's current price and trading volume from the
//! remote data API. The client performs one outbound call per fetch; retry
//! policy belongs to the sync loop.

pub mod client;
pub mod error;

pub use client::{HttpPriceFeed, PriceFeed, PriceSnapshot};
pub use error::{FeedError, FeedResult};
