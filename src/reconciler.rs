use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::initialization::Config;
use crate::manager_forecast::{ForecastError, run_forecast};
use crate::models::{ForecastRequest, ForecastResponse, PowerReading, Prediction};

const KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Produces the response for one forecast request
///
/// The baseline forecast is always computed, also for sites carrying an
/// inverter type, so the caller gets the live corrected and the pure model
/// series side by side in a single result.
///
/// # Arguments
///
/// * 'config' - process configuration
/// * 'request' - the inbound request
pub async fn reconcile(
    config: &Config,
    request: &ForecastRequest,
) -> Result<ForecastResponse, ForecastError> {
    let ts = effective_timestamp(request.timestamp.as_deref())?;

    let site_no_live = request.site.without_inverter();
    let baseline = run_forecast(&site_no_live, ts, config).await?;

    let predictions = if request.site.inverter_type.is_none() {
        baseline_only(&baseline)
    } else {
        let live = run_forecast(&request.site, ts, config).await?;

        merge(&live, &baseline)
    };

    Ok(ForecastResponse { timestamp: ts, predictions })
}

/// Resolves the timestamp to forecast from, defaulting to the time of
/// request receipt. Always truncated to whole seconds.
///
/// # Arguments
///
/// * 'raw' - timestamp string from the request, if any
pub fn effective_timestamp(raw: Option<&str>) -> Result<NaiveDateTime, ForecastError> {
    let ts = match raw {
        None => Utc::now().naive_utc(),
        Some(raw) => parse_timestamp(raw)?,
    };

    Ok(ts.with_nanosecond(0).unwrap_or(ts))
}

/// Accepts RFC 3339 (any offset, normalized to UTC) and naive timestamp forms
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ForecastError> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date_time.naive_utc());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, KEY_FORMAT))
        .map_err(|e| ForecastError(format!("malformed timestamp '{}': {}", raw, e)))
}

/// Renders a baseline series on its own, the no live sibling field stays absent
fn baseline_only(baseline: &[PowerReading]) -> BTreeMap<String, Prediction> {
    baseline
        .iter()
        .map(|r| {
            let prediction = Prediction { power_kw: r.power_kw, power_kw_no_live_pv: None };

            (r.timestamp.format(KEY_FORMAT).to_string(), prediction)
        })
        .collect()
}

/// Merges the two series into one result keyed by the live series'
/// timestamps, with the baseline power attached as a sibling field
///
/// # Arguments
///
/// * 'live' - the live corrected series
/// * 'baseline' - the pure model series
fn merge(live: &[PowerReading], baseline: &[PowerReading]) -> BTreeMap<String, Prediction> {
    let baseline_by_ts: HashMap<NaiveDateTime, f64> =
        baseline.iter().map(|r| (r.timestamp, r.power_kw)).collect();

    live.iter()
        .map(|r| {
            let prediction = Prediction {
                power_kw: r.power_kw,
                power_kw_no_live_pv: baseline_by_ts.get(&r.timestamp).copied(),
            };

            (r.timestamp.format(KEY_FORMAT).to_string(), prediction)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::models::PVSite;

    fn ts(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn effective_timestamp_drops_the_utc_offset() {
        let ts = effective_timestamp(Some("2024-01-01T12:00:00Z")).unwrap();
        assert_eq!(ts, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap());

        let shifted = effective_timestamp(Some("2024-01-01T14:00:00+02:00")).unwrap();
        assert_eq!(shifted, ts);
    }

    #[test]
    fn effective_timestamp_accepts_naive_forms() {
        assert!(effective_timestamp(Some("2024-01-01T12:00:00")).is_ok());
        assert!(effective_timestamp(Some("2024-01-01 12:00:00")).is_ok());
        assert!(effective_timestamp(Some("not a timestamp")).is_err());
    }

    #[test]
    fn missing_timestamp_defaults_to_now_at_second_precision() {
        let before = Utc::now().naive_utc();
        let ts = effective_timestamp(None).unwrap();
        let after = Utc::now().naive_utc();

        assert_eq!(ts.nanosecond(), 0);
        assert!(ts >= before.with_nanosecond(0).unwrap());
        assert!(ts <= after);
    }

    #[test]
    fn merge_keys_follow_the_live_series() {
        let live = vec![
            PowerReading { timestamp: ts(12, 0), power_kw: 3.0 },
            PowerReading { timestamp: ts(12, 15), power_kw: 4.0 },
        ];
        let baseline = vec![
            PowerReading { timestamp: ts(12, 0), power_kw: 2.0 },
            PowerReading { timestamp: ts(12, 15), power_kw: 2.5 },
        ];

        let merged = merge(&live, &baseline);

        assert_eq!(merged.len(), 2);
        let first = &merged["2024-01-01 12:00:00"];
        assert_eq!(first.power_kw, 3.0);
        assert_eq!(first.power_kw_no_live_pv, Some(2.0));

        let second = &merged["2024-01-01 12:15:00"];
        assert_eq!(second.power_kw, 4.0);
        assert_eq!(second.power_kw_no_live_pv, Some(2.5));
    }

    #[test]
    fn baseline_only_serializes_without_the_no_live_field() {
        let baseline = vec![PowerReading { timestamp: ts(12, 0), power_kw: 2.0 }];

        let rendered = serde_json::to_value(baseline_only(&baseline)).unwrap();
        let entry = &rendered["2024-01-01 12:00:00"];

        assert_eq!(entry["power_kw"], 2.0);
        assert!(entry.get("power_kw_no_live_pv").is_none());
    }

    #[tokio::test]
    async fn reconcile_produces_a_baseline_response() {
        let request = ForecastRequest {
            site: PVSite { latitude: 51.5, longitude: -0.1, capacity_kwp: 4.0, inverter_type: None },
            timestamp: Some("2024-01-01T12:00:00Z".to_string()),
        };

        let response = reconcile(&Config::default(), &request).await.unwrap();

        assert_eq!(response.timestamp, ts(12, 0));
        assert_eq!(response.predictions.len(), 192);
        assert!(response.predictions.contains_key("2024-01-01 12:00:00"));
        assert!(response.predictions.values().all(|p| p.power_kw_no_live_pv.is_none()));
    }

    #[tokio::test]
    async fn reconcile_rejects_a_bad_site() {
        let request = ForecastRequest {
            site: PVSite { latitude: 95.0, longitude: -0.1, capacity_kwp: 4.0, inverter_type: None },
            timestamp: None,
        };

        let result = reconcile(&Config::default(), &request).await;

        assert!(result.unwrap_err().to_string().contains("latitude"));
    }
}
