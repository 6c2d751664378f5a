//! LLM transcript matcher.
//!
//! Asks a chat-completions collaborator to connect transcript statements
//! to market titles. The model is instructed to answer with strict JSON;
//! anything that does not parse cleanly yields an empty match list.

use crate::error::TranscriptError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Recommended side on a matched market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Yes,
    No,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

/// One matched market with the model's reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMatch {
    pub market_title: String,
    pub reasoning: String,
    pub recommended_position: Position,
}

/// The matcher's structured result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchOutcome {
    #[serde(default)]
    pub matches: Vec<MarketMatch>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Strip a markdown code fence if the model wrapped its JSON in one.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Parse model output into a structured outcome.
///
/// Returns `None` for anything that is not the expected JSON shape; the
/// caller falls back to an empty match list. Model text is never
/// evaluated or interpreted beyond this parse.
pub fn parse_matches(content: &str) -> Option<MatchOutcome> {
    serde_json::from_str(strip_fences(content)).ok()
}

fn build_prompt(transcript: &str, titles: &[String]) -> String {
    let joined: String = titles
        .iter()
        .map(|t| format!("- {t}\n"))
        .collect();
    format!(
        "You are a semantic matcher. Connect anything the speaker says to any \
         relevant prediction market, stretching meaning aggressively.\n\n\
         Transcript:\n\"{transcript}\"\n\n\
         Markets:\n{joined}\n\
         Output STRICT JSON only, in this shape:\n\
         {{\"matches\": [{{\"market_title\": \"...\", \"reasoning\": \"...\", \
         \"recommended_position\": \"YES or NO\"}}]}}"
    )
}

/// Chat-completions client for transcript matching.
pub struct TranscriptMatcher {
    client: Client,
    chat_url: String,
    model: String,
    api_key: Option<String>,
}

impl TranscriptMatcher {
    pub fn new(
        chat_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, TranscriptError> {
        let client = Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(|e| TranscriptError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            chat_url: chat_url.into(),
            model: model.into(),
            api_key,
        })
    }

    /// Match a transcript against candidate titles.
    ///
    /// Infallible by contract: collaborator failures and malformed model
    /// output are logged and produce an empty match list.
    pub async fn match_transcript(&self, transcript: &str, titles: &[String]) -> MatchOutcome {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(transcript, titles),
            }],
        };

        let mut call = self.client.post(&self.chat_url).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = match call.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Matcher collaborator unreachable, returning no matches");
                return MatchOutcome::default();
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "Matcher collaborator error, returning no matches");
            return MatchOutcome::default();
        }
        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Malformed chat response, returning no matches");
                return MatchOutcome::default();
            }
        };

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();
        match parse_matches(content) {
            Some(outcome) => {
                debug!(matches = outcome.matches.len(), "Transcript matched");
                outcome
            }
            None => {
                warn!("Model output was not the expected JSON, returning no matches");
                MatchOutcome::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strict_json() {
        let content = r#"{"matches": [{"market_title": "Hottest year on record?",
            "reasoning": "speaker complained about heat",
            "recommended_position": "YES"}]}"#;
        let outcome = parse_matches(content).unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].recommended_position, Position::Yes);
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "```json\n{\"matches\": []}\n```";
        let outcome = parse_matches(content).unwrap();
        assert!(outcome.matches.is_empty());
    }

    #[test]
    fn test_malformed_output_is_none() {
        assert!(parse_matches("I think you should bet YES on everything").is_none());
        assert!(parse_matches("{\"matches\": [{\"market_title\": 42}]}").is_none());
        assert!(parse_matches("").is_none());
    }

    #[test]
    fn test_position_rejects_unknown_values() {
        let content = r#"{"matches": [{"market_title": "x", "reasoning": "y",
            "recommended_position": "MAYBE"}]}"#;
        assert!(parse_matches(content).is_none());
    }

    #[test]
    fn test_prompt_lists_titles() {
        let prompt = build_prompt("it is hot", &["Hottest year?".to_string()]);
        assert!(prompt.contains("- Hottest year?"));
        assert!(prompt.contains("it is hot"));
    }
}
