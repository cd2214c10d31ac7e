use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of the optional message text, in characters.
pub const MAX_TEXT_CHARS: usize = 4096;

/// Aggregated validation failure for a webhook payload.
///
/// Collects every failed constraint rather than stopping at the first, so
/// the caller gets one structured error per payload.
#[derive(Debug, Error)]
#[error("{}", failures.join("; "))]
pub struct ValidationError {
    pub failures: Vec<String>,
}

/// Inbound webhook payload after parsing and validation.
///
/// Field shapes follow the provider contract: `from`/`to` are E.164-like
/// (`+` followed by digits), `ts` is an ISO-8601 UTC string kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub message_id: String,
    #[serde(rename = "from")]
    pub from_msisdn: String,
    #[serde(rename = "to")]
    pub to_msisdn: String,
    pub ts: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookMessage {
    /// Parses raw JSON bytes into a validated message.
    ///
    /// Malformed JSON and constraint violations both surface as
    /// `ValidationError`; this function performs no I/O.
    pub fn parse(raw: &[u8]) -> Result<Self, ValidationError> {
        let msg: WebhookMessage = serde_json::from_slice(raw).map_err(|e| ValidationError {
            failures: vec![format!("malformed payload: {e}")],
        })?;
        msg.validate()?;
        Ok(msg)
    }

    /// Applies the field constraints to an already-parsed message.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut failures = Vec::new();

        if self.message_id.is_empty() {
            failures.push("message_id must be non-empty".to_string());
        }
        if !is_e164_like(&self.from_msisdn) {
            failures.push("'from' must be '+' followed by digits".to_string());
        }
        if !is_e164_like(&self.to_msisdn) {
            failures.push("'to' must be '+' followed by digits".to_string());
        }
        // Intentionally no calendar parsing: ordering relies on consistent
        // string formatting, not chronological correctness.
        if !self.ts.ends_with('Z') {
            failures.push("ts must be an ISO-8601 UTC string ending in 'Z'".to_string());
        }
        if let Some(text) = &self.text {
            if text.chars().count() > MAX_TEXT_CHARS {
                failures.push(format!("text must be at most {MAX_TEXT_CHARS} characters"));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { failures })
        }
    }
}

fn is_e164_like(s: &str) -> bool {
    match s.strip_prefix('+') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A stored message as returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageOut {
    pub message_id: String,
    #[serde(rename = "from")]
    pub from_msisdn: String,
    #[serde(rename = "to")]
    pub to_msisdn: String,
    pub ts: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub data: Vec<MessageOut>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SenderCount {
    #[serde(rename = "from")]
    pub from_msisdn: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_messages: i64,
    pub senders_count: i64,
    pub messages_per_sender: Vec<SenderCount>,
    pub first_message_ts: Option<String>,
    pub last_message_ts: Option<String>,
}
