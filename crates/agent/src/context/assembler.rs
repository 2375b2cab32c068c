//! Sensor briefing assembly.
//!
//! Builds the system instruction the assistant answers from:
//!
//! 1. **Devices** (status, last seen), best effort
//! 2. **Readings** (latest or a historical window), required
//! 3. **Events** (recent alerts), best effort, appended last
//!
//! Readings with clock-reset timestamps are dropped before anything is
//! rendered. When nothing valid is left the assembler returns a fixed
//! no-data reply instead of a briefing, and the LLM is not called.
//!
//! # Determinism
//!
//! Assembly takes `now` as a parameter: identical store contents and
//! `now` always produce identical text.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use myplant_core::error::StoreError;
use myplant_core::record::{DeviceRecord, EventRecord, Reading};
use myplant_core::store::{Devices, Events, FetchPolicy, Readings, RecentQuery};
use myplant_core::timestamp::{is_valid_timestamp, parse_timestamp};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::context::format::{format_events, format_reading, time_ago};
use crate::context::time_range::TimeRange;

// ── Limits ────────────────────────────────────────────────────────────────

/// Readings fetched for `latest` with / without a device filter.
const LATEST_FETCH_DEVICE: usize = 10;
const LATEST_FETCH_ALL: usize = 20;
/// Valid readings kept for `latest` with / without a device filter.
const LATEST_KEEP_DEVICE: usize = 1;
const LATEST_KEEP_ALL: usize = 5;

const HISTORY_FETCH: usize = 100;
const HISTORY_KEEP: usize = 50;

const EVENTS_FETCH: usize = 15;
const EVENTS_KEEP: usize = 10;

// ── Fixed text ────────────────────────────────────────────────────────────

const PERSONA: &str = "You are an IoT assistant for a smart agriculture system called myPlant.";

const SENSOR_GUIDE: &str = "SENSOR INTERPRETATION GUIDE:
- moisture: Higher values (4000+) = drier soil, Lower values = wetter soil
- rain: 1 = raining, 0 = not raining
- humidity: Percentage (0-100%)
- temperature: Celsius
- lightDigital: Higher values = brighter light";

const SINGLE_DEVICE_GUIDANCE: &str = "Answer the user's question naturally and helpfully using this data.
If the user asks about sensor readings, explain what the values mean for plant health.
Be concise but friendly in your responses. Point out any concerning readings.";

const ALL_DEVICES_GUIDANCE: &str = "When answering questions:
- Specify which device's data you're referring to
- Compare readings between devices if relevant
- Help identify any devices that might need attention
- Explain what sensor values mean for plant health
- Be concise but friendly in your responses.";

const HISTORY_GUIDANCE: &str = "When answering questions about historical data:
- Identify trends and patterns over time
- Note any anomalies or concerning readings
- Provide insights about plant health and environmental conditions
- Compare current vs historical performance if relevant
- Explain what the data means for plant care
- Be concise but analytical in your responses.";

const NO_READINGS: &str = "No sensor readings found. Please check if your devices are connected.";
const NO_VALID_READINGS: &str = "No valid recent sensor readings found. Devices may be syncing.";

// ── Types ─────────────────────────────────────────────────────────────────

/// What the caller asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextRequest {
    /// Only this device's readings; `None` means all devices.
    pub device_id: Option<String>,
    pub time_range: TimeRange,
}

/// Counts logged after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub valid_readings: usize,
    pub events: usize,
    pub devices: usize,
    pub device_filter: Option<String>,
    pub time_range: String,
}

/// Result of assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Briefing {
    /// A briefing to send as the system instruction.
    Context { text: String, summary: ContextSummary },
    /// Nothing usable; this text is the final reply.
    NoData(String),
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// Reads devices, readings and events and renders the briefing.
pub struct ContextAssembler {
    devices: Arc<dyn Devices>,
    readings: Arc<dyn Readings>,
    events: Arc<dyn Events>,
}

impl ContextAssembler {
    pub fn new(devices: Arc<dyn Devices>, readings: Arc<dyn Readings>, events: Arc<dyn Events>) -> Self {
        Self {
            devices,
            readings,
            events,
        }
    }

    /// Assemble against the current time.
    pub async fn assemble(&self, request: &ContextRequest) -> Result<Briefing, StoreError> {
        self.assemble_at(request, Local::now()).await
    }

    /// Assemble as of `now`. Only a failed readings query is an error.
    pub async fn assemble_at(
        &self,
        request: &ContextRequest,
        now: DateTime<Local>,
    ) -> Result<Briefing, StoreError> {
        let devices = FetchPolicy::BestEffort.apply("devices", self.devices.list().await)?;
        let device = request.device_id.as_deref();
        let now_utc = now.with_timezone(&Utc);

        let (mut text, valid_readings) = match &request.time_range {
            TimeRange::Latest => {
                let fetch = if device.is_some() { LATEST_FETCH_DEVICE } else { LATEST_FETCH_ALL };
                let keep = if device.is_some() { LATEST_KEEP_DEVICE } else { LATEST_KEEP_ALL };

                let fetched = self.fetch_readings(device, fetch).await?;
                if fetched.is_empty() {
                    return Ok(Briefing::NoData(NO_READINGS.into()));
                }

                let valid: Vec<Reading> = fetched
                    .into_iter()
                    .filter(|r| is_valid_timestamp(r.timestamp.as_ref()))
                    .take(keep)
                    .collect();
                if valid.is_empty() {
                    return Ok(Briefing::NoData(NO_VALID_READINGS.into()));
                }

                let text = match device {
                    Some(device_id) => render_device_latest(device_id, &valid[0], &devices, now_utc),
                    None => render_all_latest(&valid, &devices, now_utc),
                };
                (text, valid.len())
            }
            range => {
                let floor = range.floor(now);

                let fetched = self.fetch_readings(device, HISTORY_FETCH).await?;
                if fetched.is_empty() {
                    return Ok(Briefing::NoData(format!(
                        "No historical data found for the specified time range ({range})."
                    )));
                }

                let valid: Vec<Reading> = fetched
                    .into_iter()
                    .filter(|r| is_valid_timestamp(r.timestamp.as_ref()))
                    .filter(|r| {
                        r.timestamp
                            .as_ref()
                            .and_then(parse_timestamp)
                            .is_some_and(|t| t >= floor)
                    })
                    .take(HISTORY_KEEP)
                    .collect();
                if valid.is_empty() {
                    return Ok(Briefing::NoData(format!(
                        "No valid historical data found for the {range} period."
                    )));
                }

                (render_history(range, device, &valid, &devices, now_utc), valid.len())
            }
        };

        let events = self.recent_events().await?;
        if !events.is_empty() {
            text.push_str("\n\nRecent System Events (last 10 valid events):\n");
            text.push_str(&format_events(&events));
        }

        let summary = ContextSummary {
            valid_readings,
            events: events.len(),
            devices: devices.len(),
            device_filter: request.device_id.clone(),
            time_range: request.time_range.to_string(),
        };
        info!(
            valid_readings = summary.valid_readings,
            events = summary.events,
            devices = summary.devices,
            device_filter = ?summary.device_filter,
            time_range = %summary.time_range,
            "Sensor context assembled"
        );

        Ok(Briefing::Context { text, summary })
    }

    async fn fetch_readings(&self, device: Option<&str>, limit: usize) -> Result<Vec<Reading>, StoreError> {
        let query = RecentQuery::for_device(device, limit);
        FetchPolicy::Required.apply("readings", self.readings.query_recent(&query).await)
    }

    async fn recent_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let fetched = FetchPolicy::BestEffort.apply(
            "events",
            self.events.query_recent(&RecentQuery::latest(EVENTS_FETCH)).await,
        )?;
        Ok(fetched
            .into_iter()
            .filter(|e| is_valid_timestamp(e.timestamp.as_ref()))
            .take(EVENTS_KEEP)
            .collect())
    }
}

// ── Renderers ─────────────────────────────────────────────────────────────

fn iso(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn device_label(device: &DeviceRecord) -> &str {
    device.name.as_deref().unwrap_or(&device.device_id)
}

fn device_status(device: &DeviceRecord) -> &str {
    device.status.as_deref().unwrap_or("unknown")
}

fn reading_timestamp(reading: &Reading) -> String {
    reading
        .timestamp
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_default()
}

fn reading_device(reading: &Reading) -> &str {
    reading.device_id.as_deref().unwrap_or("unknown")
}

fn render_device_latest(
    device_id: &str,
    reading: &Reading,
    devices: &[DeviceRecord],
    now: DateTime<Utc>,
) -> String {
    let status = match devices.iter().find(|d| d.device_id == device_id) {
        Some(d) => format!(
            "Status: {}, Last Seen: {}",
            device_status(d),
            time_ago(d.last_seen.as_ref(), now)
        ),
        None => "Status: Unknown".to_string(),
    };

    format!(
        "{PERSONA}
Current time: {now}

DEVICE INFORMATION:
- Device: {device_id}
- {status}

LATEST SENSOR READING (timestamp: {timestamp}):
{reading}

{SENSOR_GUIDE}

{SINGLE_DEVICE_GUIDANCE}",
        now = iso(now),
        timestamp = reading_timestamp(reading),
        reading = format_reading(reading),
    )
}

fn render_all_latest(readings: &[Reading], devices: &[DeviceRecord], now: DateTime<Utc>) -> String {
    let summary = devices
        .iter()
        .map(|d| {
            format!(
                "- {}: {}, Last: {}",
                device_label(d),
                device_status(d),
                time_ago(d.last_seen.as_ref(), now)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let blocks = readings
        .iter()
        .map(|r| {
            format!(
                "Device {} ({}):\n{}",
                reading_device(r),
                time_ago(r.timestamp.as_ref(), now),
                format_reading(r)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{PERSONA}
Current time: {now}

DEVICES SUMMARY:
{summary}

LATEST READINGS FROM ALL DEVICES:
{blocks}

{SENSOR_GUIDE}

{ALL_DEVICES_GUIDANCE}",
        now = iso(now),
    )
}

fn render_history(
    range: &TimeRange,
    device: Option<&str>,
    readings: &[Reading],
    devices: &[DeviceRecord],
    now: DateTime<Utc>,
) -> String {
    let scope = match device {
        Some(device_id) => format!(" from device: {device_id}"),
        None => " from all devices".to_string(),
    };

    let status = devices
        .iter()
        .map(|d| {
            format!(
                "- {}: {}, Last Seen: {}",
                device_label(d),
                device_status(d),
                time_ago(d.last_seen.as_ref(), now)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let blocks = readings
        .iter()
        .map(|r| {
            format!(
                "[{}] Device {}:\n{}",
                reading_timestamp(r),
                reading_device(r),
                format_reading(r)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{PERSONA}
Analyzing historical data{scope} for the {range} period.

DEVICE STATUS:
{status}

HISTORICAL SENSOR READINGS ({count} valid data points):
{blocks}

{SENSOR_GUIDE}

{HISTORY_GUIDANCE}",
        count = readings.len(),
    )
}
