//! AI-backed analysis of symptom and inventory data
//!
//! Both calls are best-effort: any transport, provider or parsing error is
//! logged and converted into a fixed message the caller can display as-is.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{Pharmacy, PharmwatchError, PredictedDemand, Result, SymptomLogRecord};

pub const ANALYSIS_FAILED_MESSAGE: &str =
    "An error occurred while analyzing the data. Please check the logs for more details.";

pub const PREDICTION_FAILED_MESSAGE: &str =
    "Failed to predict medicine demand. The model may have returned an invalid response.";

pub const DEFAULT_QUERY: &str = "Identify unusual symptom clusters and their locations.";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Text generation backend
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Generate a completion. With `response_schema`, the provider is asked for
    /// JSON conforming to that schema.
    async fn generate(&self, prompt: &str, response_schema: Option<Value>) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════
// Gemini
// ═══════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: &str, timeout_secs: u64) -> Result<Self> {
        if api_key.is_none() {
            tracing::warn!("Gemini API key not set; AI calls will fail");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PharmwatchError::Http(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            api_key,
            model: model.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            client,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn generate(&self, prompt: &str, response_schema: Option<Value>) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PharmwatchError::Ai("API key not configured".into()))?;

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: response_schema.map(|schema| GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "calling Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PharmwatchError::Ai("request timed out".into())
                } else {
                    PharmwatchError::Ai(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PharmwatchError::Ai(format!(
                "Gemini returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PharmwatchError::Ai(format!("invalid response body: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(PharmwatchError::Ai("empty response".into()));
        }
        Ok(text)
    }
}

// ═══════════════════════════════════════════════════════════
// InsightService
// ═══════════════════════════════════════════════════════════

pub struct InsightService<C> {
    client: C,
    /// Maximum number of symptom logs included in a prompt
    sample_size: usize,
    tracked_medicines: Vec<String>,
    forecast_days: u32,
}

impl<C: AnalysisClient> InsightService<C> {
    pub fn new(
        client: C,
        sample_size: usize,
        tracked_medicines: Vec<String>,
        forecast_days: u32,
    ) -> Self {
        Self {
            client,
            sample_size,
            tracked_medicines,
            forecast_days,
        }
    }

    /// Free-text analysis of recent symptom reports.
    /// Never fails: errors become [`ANALYSIS_FAILED_MESSAGE`].
    pub async fn analyze_symptom_data(&self, logs: &[SymptomLogRecord], query: &str) -> String {
        let result = async {
            let prompt = build_analysis_prompt(self.sample(logs), query)?;
            self.client.generate(&prompt, None).await
        }
        .await;

        match result {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::error!(error = %e, "symptom analysis failed");
                ANALYSIS_FAILED_MESSAGE.to_string()
            }
        }
    }

    /// Structured demand forecast for the tracked medicines.
    /// Errors become [`PREDICTION_FAILED_MESSAGE`].
    pub async fn predict_medicine_demand(
        &self,
        logs: &[SymptomLogRecord],
        pharmacies: &[Pharmacy],
    ) -> std::result::Result<Vec<PredictedDemand>, String> {
        let result = async {
            let prompt = build_demand_prompt(
                self.sample(logs),
                pharmacies,
                &self.tracked_medicines,
                self.forecast_days,
            )?;
            let text = self.client.generate(&prompt, Some(demand_schema())).await?;
            parse_predictions(&text)
        }
        .await;

        result.map_err(|e| {
            tracing::error!(error = %e, "demand prediction failed");
            PREDICTION_FAILED_MESSAGE.to_string()
        })
    }

    fn sample<'a>(&self, logs: &'a [SymptomLogRecord]) -> &'a [SymptomLogRecord] {
        &logs[..logs.len().min(self.sample_size)]
    }
}

#[derive(Serialize)]
struct PromptInventoryItem<'a> {
    name: &'a str,
    stock: i64,
}

#[derive(Serialize)]
struct PromptPharmacy<'a> {
    name: &'a str,
    address: &'a str,
    inventory: Vec<PromptInventoryItem<'a>>,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| PharmwatchError::Parse(e.to_string()))
}

pub fn build_analysis_prompt(logs: &[SymptomLogRecord], query: &str) -> Result<String> {
    Ok(format!(
        "You are a public health data analyst. Using the community symptom reports below, \
         look for signs of emerging outbreaks and answer the question.\n\
         Keep the answer short and focused on actions health officials can take.\n\n\
         Question: \"{}\"\n\n\
         Symptom reports (most recent {}):\n{}\n",
        query.trim(),
        logs.len(),
        to_json(logs)?
    ))
}

pub fn build_demand_prompt(
    logs: &[SymptomLogRecord],
    pharmacies: &[Pharmacy],
    tracked_medicines: &[String],
    forecast_days: u32,
) -> Result<String> {
    let inventory: Vec<PromptPharmacy<'_>> = pharmacies
        .iter()
        .map(|p| PromptPharmacy {
            name: &p.name,
            address: &p.address,
            inventory: p
                .inventory
                .iter()
                .map(|i| PromptInventoryItem {
                    name: &i.medicine.name,
                    stock: i.quantity,
                })
                .collect(),
        })
        .collect();

    Ok(format!(
        "Given current pharmacy stock and recent symptom reports, forecast demand for {} \
         over the next {} days. Return one entry per medicine.\n\n\
         Symptom reports (most recent {}):\n{}\n\n\
         Pharmacy inventory:\n{}\n",
        tracked_medicines.join(", "),
        forecast_days,
        logs.len(),
        to_json(logs)?,
        to_json(&inventory)?
    ))
}

/// Response schema for the demand forecast (Gemini OpenAPI subset)
pub fn demand_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "medicineName": {
                    "type": "STRING",
                    "description": "The name of the medicine."
                },
                "predictedDemandChange": {
                    "type": "STRING",
                    "description": "Percentage or qualitative change, e.g. \"+25%\" or \"Stable\"."
                },
                "reasoning": {
                    "type": "STRING",
                    "description": "Short justification grounded in the data."
                }
            },
            "required": ["medicineName", "predictedDemandChange", "reasoning"]
        }
    })
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Parse the model's JSON array, tolerating a surrounding markdown code fence
pub fn parse_predictions(text: &str) -> Result<Vec<PredictedDemand>> {
    let trimmed = text.trim();
    let json_str = fence_regex()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    serde_json::from_str(json_str)
        .map_err(|e| PharmwatchError::Ai(format!("response does not match schema: {}", e)))
}
