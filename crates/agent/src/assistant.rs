//! The conversational assistant.
//!
//! Answers a question about the farm by sending the sensor briefing and
//! the question to the LLM. Every outcome is a reply string: provider
//! errors become short explanations, and anything else falls back to
//! the raw latest readings.

use chrono::{DateTime, Local};
use myplant_core::error::{ProviderError, StoreError};
use myplant_core::message::Message;
use myplant_core::provider::{Provider, ProviderRequest};
use myplant_core::record::Reading;
use myplant_core::store::{Readings, RecentQuery};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::context::{Briefing, ContextAssembler, ContextRequest, TimeRange};

pub const DEFAULT_PROMPT: &str = "Hello, how can you help me?";

const QUOTA_REPLY: &str = "AI service is currently unavailable due to billing issues. \
Please check your OpenAI account billing settings.";
const BUSY_REPLY: &str = "AI service is busy right now. Please try again in a moment.";
const CONFIG_REPLY: &str = "AI service configuration error. Please contact administrator.";
const APOLOGY_REPLY: &str = "Sorry, I'm having trouble responding right now. Please try again later.";
const FALLBACK_PREFIX: &str = "I'm currently having issues with my AI service. Here are the latest readings: ";

/// `queryAgent` input. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantRequest {
    pub prompt: Option<String>,
    pub device_id: Option<String>,
    pub time_range: Option<String>,
}

impl AssistantRequest {
    /// Read the callable payload. Non-string and empty values count as absent.
    pub fn from_value(data: &Value) -> Self {
        let text = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            prompt: text("prompt"),
            device_id: text("deviceId"),
            time_range: text("timeRange"),
        }
    }

    fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
    }

    fn context_request(&self) -> ContextRequest {
        ContextRequest {
            device_id: self.device_id.clone(),
            time_range: TimeRange::parse(self.time_range.as_deref().unwrap_or_default()),
        }
    }
}

/// `queryAgent` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantReply {
    pub reply: String,
}

impl AssistantReply {
    fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

/// Model parameters for each completion.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            max_tokens: 600,
            temperature: 1.0,
        }
    }
}

/// Why an answer could not be produced.
#[derive(Debug)]
enum Failure {
    Store(StoreError),
    Provider(ProviderError),
}

impl From<StoreError> for Failure {
    fn from(e: StoreError) -> Self {
        Failure::Store(e)
    }
}

impl From<ProviderError> for Failure {
    fn from(e: ProviderError) -> Self {
        Failure::Provider(e)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Store(e) => write!(f, "{e}"),
            Failure::Provider(e) => write!(f, "{e}"),
        }
    }
}

/// One entry of the degraded reply.
#[derive(Debug, Serialize)]
struct FallbackReading {
    device: String,
    temperature: Value,
    humidity: Value,
    #[serde(rename = "soilMoisture")]
    soil_moisture: Value,
}

/// A number as JSON, or `"unknown"` when missing or zero.
/// Whole numbers are written without a fractional part.
fn known_number(values: &[Option<f64>]) -> Value {
    let Some(n) = values.iter().flatten().copied().find(|n| *n != 0.0 && !n.is_nan()) else {
        return Value::from("unknown");
    };
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or_else(|| Value::from("unknown"), Value::Number)
    }
}

impl FallbackReading {
    fn from_reading(r: &Reading) -> Self {
        Self {
            device: r
                .device_id
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "unknown".into()),
            temperature: known_number(&[r.temperature, r.temp]),
            humidity: known_number(&[r.humidity]),
            soil_moisture: known_number(&[r.soil_moisture, r.moisture]),
        }
    }
}

/// Answers `queryAgent` calls.
pub struct AssistantQuery {
    assembler: ContextAssembler,
    readings: Arc<dyn Readings>,
    provider: Arc<dyn Provider>,
    settings: AssistantSettings,
}

impl AssistantQuery {
    pub fn new(
        assembler: ContextAssembler,
        readings: Arc<dyn Readings>,
        provider: Arc<dyn Provider>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            assembler,
            readings,
            provider,
            settings,
        }
    }

    pub async fn answer(&self, request: &AssistantRequest) -> AssistantReply {
        self.answer_at(request, Local::now()).await
    }

    /// Answer as of `now`. Never fails.
    pub async fn answer_at(&self, request: &AssistantRequest, now: DateTime<Local>) -> AssistantReply {
        match self.try_answer(request, now).await {
            Ok(reply) => reply,
            Err(failure) => {
                error!(error = %failure, "Assistant query failed");
                self.recover(failure, request.device_id.as_deref()).await
            }
        }
    }

    async fn try_answer(
        &self,
        request: &AssistantRequest,
        now: DateTime<Local>,
    ) -> Result<AssistantReply, Failure> {
        let briefing = match self.assembler.assemble_at(&request.context_request(), now).await? {
            Briefing::NoData(message) => return Ok(AssistantReply::new(message)),
            Briefing::Context { text, .. } => text,
        };

        let completion = self
            .provider
            .complete(ProviderRequest {
                model: self.settings.model.clone(),
                messages: vec![Message::system(briefing), Message::user(request.prompt())],
                temperature: self.settings.temperature,
                max_tokens: Some(self.settings.max_tokens),
            })
            .await?;

        info!(
            provider = self.provider.name(),
            model = %completion.model,
            total_tokens = completion.usage.as_ref().map(|u| u.total_tokens),
            "Assistant reply generated"
        );
        Ok(AssistantReply::new(completion.message.content))
    }

    async fn recover(&self, failure: Failure, device: Option<&str>) -> AssistantReply {
        match &failure {
            Failure::Provider(e) if e.is_quota_exhausted() => return AssistantReply::new(QUOTA_REPLY),
            Failure::Provider(ProviderError::RateLimited { .. }) => return AssistantReply::new(BUSY_REPLY),
            Failure::Provider(ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_)) => {
                return AssistantReply::new(CONFIG_REPLY);
            }
            _ => {}
        }

        let limit = if device.is_some() { 1 } else { 3 };
        match self.readings.query_recent(&RecentQuery::for_device(device, limit)).await {
            Ok(readings) if !readings.is_empty() => {
                let latest: Vec<FallbackReading> = readings.iter().map(FallbackReading::from_reading).collect();
                match serde_json::to_string(&latest) {
                    Ok(json) => return AssistantReply::new(format!("{FALLBACK_PREFIX}{json}")),
                    Err(e) => error!(error = %e, "Could not encode fallback readings"),
                }
            }
            Ok(_) => warn!("Fallback found no readings"),
            Err(e) => error!(error = %e, "Fallback readings query failed"),
        }

        AssistantReply::new(APOLOGY_REPLY)
    }
}
