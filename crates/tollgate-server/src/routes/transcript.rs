//! Transcript-to-market matching endpoint.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tollgate_transcript::MatchOutcome;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub transcript: String,
}

/// `POST /transcript/match`
///
/// Fetches the current market titles, asks the matcher, and notifies the
/// webhook about each match. Notification failures never affect the
/// response.
pub async fn match_transcript(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchOutcome>, ApiError> {
    let Some(context) = &state.transcript else {
        return Err(ApiError::Unavailable(
            "Transcript matching is not enabled".to_string(),
        ));
    };

    let titles = context
        .catalog
        .titles()
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    let outcome = context.matcher.match_transcript(&req.transcript, &titles).await;
    info!(matches = outcome.matches.len(), "Transcript matched");

    for matched in &outcome.matches {
        let text = format!(
            "Market match: {} [{}] {}",
            matched.market_title,
            matched.recommended_position.as_str(),
            matched.reasoning
        );
        context.notifier.send(&text).await;
    }

    Ok(Json(outcome))
}
