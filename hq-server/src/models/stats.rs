//! Dashboard analytics

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{AppType, Application};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_agents: i64,
    pub online_agents: i64,
    pub threats_blocked: i64,
    pub total_events: i64,
    pub active_policies: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Hour label, `HH:00`
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    #[serde(rename = "sanctionedCount")]
    pub sanctioned_count: usize,
    #[serde(rename = "unsanctionedCount")]
    pub unsanctioned_count: usize,
    #[serde(rename = "avgCCI")]
    pub avg_cci: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub stats: Stats,
    pub chart: Vec<ChartPoint>,
    pub discovery: Discovery,
}

/// Alert counts per hour of day over the 24 hours ending at `now`, oldest first
pub fn hourly_chart(alert_timestamps_ms: &[i64], now: DateTime<Utc>) -> Vec<ChartPoint> {
    let window_start = (now - Duration::hours(24)).timestamp_millis();
    let mut counts = [0i64; 24];

    for ts in alert_timestamps_ms.iter().filter(|ts| **ts > window_start) {
        if let Some(at) = DateTime::<Utc>::from_timestamp_millis(*ts) {
            counts[at.hour() as usize] += 1;
        }
    }

    (0..24)
        .rev()
        .map(|back| {
            let hour = (now - Duration::hours(back)).hour();
            ChartPoint {
                name: format!("{:02}:00", hour),
                value: counts[hour as usize],
            }
        })
        .collect()
}

pub fn discovery(apps: &[Application]) -> Discovery {
    let sanctioned_count = apps.iter().filter(|a| a.app_type == AppType::Sanctioned).count();
    let unsanctioned_count = apps.iter().filter(|a| a.app_type == AppType::Unsanctioned).count();
    let avg_cci = if apps.is_empty() {
        0
    } else {
        let total: i64 = apps.iter().map(|a| a.cci).sum();
        (total as f64 / apps.len() as f64).round() as i64
    };

    Discovery {
        sanctioned_count,
        unsanctioned_count,
        avg_cci,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::initial_apps;
    use chrono::TimeZone;

    #[test]
    fn chart_has_24_points_ending_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap();
        let chart = hourly_chart(&[], now);

        assert_eq!(chart.len(), 24);
        assert_eq!(chart.last().unwrap().name, "14:00");
        assert_eq!(chart.first().unwrap().name, "15:00");
        assert!(chart.iter().all(|p| p.value == 0));
    }

    #[test]
    fn chart_buckets_recent_alerts_by_hour() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap();
        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap().timestamp_millis();
        let stale = (now - Duration::hours(30)).timestamp_millis();

        let chart = hourly_chart(&[at(14, 5), at(14, 10), at(9, 0), stale], now);

        let value_at = |label: &str| chart.iter().find(|p| p.name == label).unwrap().value;
        assert_eq!(value_at("14:00"), 2);
        assert_eq!(value_at("09:00"), 1);
        assert_eq!(chart.iter().map(|p| p.value).sum::<i64>(), 3);
    }

    #[test]
    fn discovery_metrics() {
        let d = discovery(&initial_apps());
        assert_eq!(d.sanctioned_count, 3);
        assert_eq!(d.unsanctioned_count, 2);
        // (98 + 92 + 45 + 85 + 30) / 5 = 70
        assert_eq!(d.avg_cci, 70);

        assert_eq!(discovery(&[]).avg_cci, 0);
    }
}
