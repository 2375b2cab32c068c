//! Time windows a question can ask about.

use chrono::{DateTime, Duration, Local, Months, TimeZone, Utc};
use myplant_core::timestamp::validity_floor;

/// `latest`, or a historical window ending now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeRange {
    #[default]
    Latest,
    Today,
    Week,
    Month,
    /// Any other name: historical, from the validity floor.
    Other(String),
}

impl TimeRange {
    /// Parse a request value; empty means `latest`.
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "latest" => TimeRange::Latest,
            "today" => TimeRange::Today,
            "week" => TimeRange::Week,
            "month" => TimeRange::Month,
            other => TimeRange::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TimeRange::Latest => "latest",
            TimeRange::Today => "today",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Other(name) => name,
        }
    }

    /// Earliest timestamp a historical window includes.
    ///
    /// `today` starts at local midnight; `Latest` has no floor of its own
    /// and shares the validity floor with unknown names.
    pub fn floor(&self, now: DateTime<Local>) -> DateTime<Utc> {
        let floor = match self {
            TimeRange::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| Local.from_local_datetime(&midnight).earliest()),
            TimeRange::Week => Some(now - Duration::days(7)),
            TimeRange::Month => now.checked_sub_months(Months::new(1)),
            TimeRange::Latest | TimeRange::Other(_) => None,
        };
        floor.map_or_else(validity_floor, |dt| dt.with_timezone(&Utc))
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
