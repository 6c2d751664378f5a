//! Transcript-to-market matching demo.
//!
//! Unrelated to the paywall proxy: takes a free-text transcript, asks an
//! LLM collaborator to loosely match it against prediction-market titles,
//! and notifies a messaging collaborator about each match. The LLM's
//! output is parsed as strict JSON with a safe fallback to an empty match
//! list; model text is never evaluated.

pub mod error;
pub mod markets;
pub mod matcher;
pub mod notify;

pub use error::{TranscriptError, TranscriptResult};
pub use markets::MarketCatalog;
pub use matcher::{MarketMatch, MatchOutcome, Position, TranscriptMatcher};
pub use notify::Notifier;
