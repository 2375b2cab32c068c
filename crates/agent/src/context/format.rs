//! Text rendering for readings, events, and relative ages.

use chrono::{DateTime, Utc};
use myplant_core::record::{EventRecord, RawTimestamp, Reading};
use myplant_core::timestamp::{is_valid_timestamp, parse_timestamp};

/// One reading as a comma-joined line of its present fields.
pub fn format_reading(reading: &Reading) -> String {
    let mut fields = Vec::new();
    if let Some(t) = reading.temperature {
        fields.push(format!("Temperature: {t}°C"));
    }
    if let Some(h) = reading.humidity {
        fields.push(format!("Humidity: {h}%"));
    }
    if let Some(m) = reading.moisture {
        fields.push(format!("Soil Moisture: {m} (lower=wetter)"));
    }
    if let Some(rain) = reading.rain {
        let raining = if rain == 1.0 { "Yes" } else { "No" };
        fields.push(format!("Rain: {raining}"));
    }
    if let Some(s) = reading.sound {
        fields.push(format!("Sound: {s}"));
    }
    if let Some(a) = reading.light_analog {
        fields.push(format!("Light Analog: {a}"));
    }
    if let Some(d) = reading.light_digital {
        fields.push(format!("Light Digital: {d}"));
    }
    fields.join(", ")
}

fn text_or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unknown")
}

/// One line per event, in the given order.
pub fn format_events(events: &[EventRecord]) -> String {
    events
        .iter()
        .map(|e| {
            format!(
                "[{}] {}: {} - {} ({} priority)",
                e.timestamp_text(),
                text_or_unknown(&e.device_id),
                text_or_unknown(&e.kind),
                text_or_unknown(&e.message),
                text_or_unknown(&e.priority),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Coarse relative age: minutes under an hour, hours under a day, else days.
pub fn time_ago(timestamp: Option<&RawTimestamp>, now: DateTime<Utc>) -> String {
    if !is_valid_timestamp(timestamp) {
        return "invalid time".into();
    }
    let Some(then) = timestamp.and_then(parse_timestamp) else {
        return "invalid time".into();
    };

    let elapsed_ms = (now - then).num_milliseconds();
    let minutes = elapsed_ms.div_euclid(60_000);
    let hours = elapsed_ms.div_euclid(3_600_000);
    let days = elapsed_ms.div_euclid(86_400_000);

    if minutes < 60 {
        format!("{minutes} minutes ago")
    } else if hours < 24 {
        format!("{hours} hours ago")
    } else {
        format!("{days} days ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn ts(s: &str) -> RawTimestamp {
        RawTimestamp::from(s)
    }

    #[test]
    fn reading_line_has_fields_in_order() {
        let reading = Reading {
            temperature: Some(24.5),
            humidity: Some(61.0),
            moisture: Some(3100.0),
            rain: Some(0.0),
            sound: Some(12.0),
            light_analog: Some(530.0),
            light_digital: Some(1.0),
            ..Reading::default()
        };
        assert_eq!(
            format_reading(&reading),
            "Temperature: 24.5°C, Humidity: 61%, Soil Moisture: 3100 (lower=wetter), Rain: No, \
             Sound: 12, Light Analog: 530, Light Digital: 1"
        );
    }

    #[test]
    fn reading_line_skips_missing_fields() {
        let reading = Reading {
            humidity: Some(40.0),
            rain: Some(1.0),
            ..Reading::default()
        };
        assert_eq!(format_reading(&reading), "Humidity: 40%, Rain: Yes");
        assert_eq!(format_reading(&Reading::default()), "");
    }

    #[test]
    fn event_lines() {
        let events = vec![
            EventRecord {
                device_id: Some("esp32-a".into()),
                timestamp: Some(ts("2024-05-01T10:00:00Z")),
                kind: Some("alert".into()),
                message: Some("Soil too dry".into()),
                priority: Some("high".into()),
                value: None,
            },
            EventRecord {
                timestamp: Some(ts("2024-05-01T09:00:00Z")),
                ..EventRecord::default()
            },
        ];
        assert_eq!(
            format_events(&events),
            "[2024-05-01T10:00:00Z] esp32-a: alert - Soil too dry (high priority)\n\
             [2024-05-01T09:00:00Z] unknown: unknown - unknown (unknown priority)"
        );
    }

    #[test]
    fn time_ago_buckets() {
        assert_eq!(time_ago(Some(&ts("2024-05-01T11:59:30Z")), now()), "0 minutes ago");
        assert_eq!(time_ago(Some(&ts("2024-05-01T11:01:00Z")), now()), "59 minutes ago");
        assert_eq!(time_ago(Some(&ts("2024-05-01T11:00:00Z")), now()), "1 hours ago");
        assert_eq!(time_ago(Some(&ts("2024-04-30T12:00:01Z")), now()), "23 hours ago");
        assert_eq!(time_ago(Some(&ts("2024-04-28T11:00:00Z")), now()), "3 days ago");
    }

    #[test]
    fn time_ago_invalid() {
        assert_eq!(time_ago(None, now()), "invalid time");
        assert_eq!(time_ago(Some(&ts("51651")), now()), "invalid time");
        assert_eq!(time_ago(Some(&ts("1970-01-01T00:00:00Z")), now()), "invalid time");
    }
}
