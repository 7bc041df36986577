//! Client for the generative extraction endpoint
//!
//! Network failures are retried by the shared [`RequestClient`]. Once a
//! response arrives, a missing or malformed candidate is final for that
//! posting and is never retried.

use crate::config::{Credential, ExtractionConfig};
use crate::extract::schema::{response_schema, ExtractedSignals};
use crate::extract::ExtractionError;
use crate::http::RequestClient;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";

const INSTRUCTION: &str = "\
You read job advertisements and report their contract terms.
Answer only from the advertisement text below.
- durationSpecified: true only if a concrete length (e.g. \"6 month contract\") or an end date is stated.
- durationMonths: that length in whole months, rounding weeks up; 0 when not stated.
- renewalMentioned: true if extension, renewal, or possible permanency is mentioned.
- startSpecified: true if any start timing is given, including \"ASAP\" or \"immediate start\".
- startIso: the first calendar day the start timing implies, as YYYY-MM-DD; empty if none.
- startDescriptor: a short phrase quoting or summarising the start timing; \"not specified\" if none.";

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response envelope; only the fields the extractor reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
    pub block_reason_message: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated; None if blank
    pub fn candidate_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Upstream diagnostics worth surfacing in an error, if any
    pub fn feedback(&self) -> Option<String> {
        let mut notes = Vec::new();

        if let Some(feedback) = &self.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                notes.push(format!("blockReason={}", reason));
            }
            if let Some(message) = &feedback.block_reason_message {
                notes.push(format!("blockReasonMessage={}", message));
            }
        }

        if let Some(reason) = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            if reason != "STOP" {
                notes.push(format!("finishReason={}", reason));
            }
        }

        if notes.is_empty() {
            None
        } else {
            Some(notes.join(", "))
        }
    }

    /// Turns a response into validated signals
    pub fn into_signals(self) -> Result<ExtractedSignals, ExtractionError> {
        let feedback = self.feedback();
        let text = self
            .candidate_text()
            .ok_or_else(|| ExtractionError::NoCandidate {
                feedback: feedback.clone(),
            })?;

        ExtractedSignals::from_candidate(&text)
            .map_err(|reason| ExtractionError::InvalidOutput { reason, feedback })
    }
}

/// Builds the prompt for one description
///
/// `today` anchors relative start phrases such as "next Monday".
pub fn build_prompt(text: &str, today: NaiveDate) -> String {
    format!(
        "{}\nToday's date is {}.\n\nAdvertisement:\n{}",
        INSTRUCTION,
        today.format("%Y-%m-%d"),
        text
    )
}

/// Sends descriptions to the extraction endpoint
#[derive(Debug, Clone)]
pub struct Extractor {
    client: RequestClient,
    url: Url,
    headers: HeaderMap,
}

impl Extractor {
    pub fn new(
        client: RequestClient,
        config: &ExtractionConfig,
        credential: &Credential,
    ) -> Result<Self, ExtractionError> {
        let url = Url::parse(&format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        ))
        .map_err(|e| ExtractionError::Endpoint(e.to_string()))?;

        let mut key = HeaderValue::from_str(credential.expose()).map_err(|e| {
            ExtractionError::Endpoint(format!("credential is not a valid header: {}", e))
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        Ok(Self {
            client,
            url,
            headers,
        })
    }

    /// Extracts contract signals from normalized text
    ///
    /// Temperature is fixed at 0 so the same text yields the same answer.
    pub async fn extract(&self, text: &str) -> Result<ExtractedSignals, ExtractionError> {
        let today = chrono::Utc::now().date_naive();
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_prompt(text, today)),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };
        let body = serde_json::to_value(&request).map_err(|e| ExtractionError::InvalidOutput {
            reason: format!("could not encode request: {}", e),
            feedback: None,
        })?;

        let response = self
            .client
            .send(Method::POST, &self.url, &self.headers, Some(&body))
            .await?;

        let envelope: GenerateResponse =
            response.json().map_err(|e| ExtractionError::InvalidOutput {
                reason: format!("malformed response envelope: {}", e),
                feedback: None,
            })?;

        envelope.into_signals()
    }
}
