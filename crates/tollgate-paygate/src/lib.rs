//! Payment-gate collaborator surface.
//!
//! Payment verification itself is delegated to an external facilitator;
//! the core's only obligation is to push every `current_price` change into
//! this gate so the price a caller is charged is never stale. The gate
//! keeps the advertised-price table the proxy consults and renders the
//! machine-readable requirements returned with `402 Payment Required`.

pub mod gate;

pub use gate::{AdvertisedPrice, PaymentGate, PaymentRequirements, PAYMENT_HEADER};
