use std::fmt;
use std::fmt::Formatter;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::initialization::Config;
use crate::manager_victron::Victron;
use crate::models::PowerReading;

/// Inverter vendors with a live telemetry integration.
/// Adding a vendor means adding a variant and an adapter, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InverterType {
    Victron,
}

impl InverterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Victron => "victron",
        }
    }

    pub fn all() -> &'static [InverterType] {
        &[Self::Victron]
    }
}

impl fmt::Display for InverterType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InverterType {
    type Err = InverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "victron" => Ok(Self::Victron),
            _ => Err(InverterError::Configuration(format!(
                "unknown inverter type '{}', supported types: {}",
                s,
                Self::all().iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }
}

/// The one operation every inverter integration must support
#[async_trait]
pub trait Inverter: Send + Sync {
    /// Returns an ordered series of timestamped power readings covering the
    /// integration's telemetry window
    ///
    /// # Arguments
    ///
    /// * 'ts' - the timestamp the forecast is being produced for
    async fn get_data(&self, ts: NaiveDateTime) -> Result<Vec<PowerReading>, InverterError>;
}

/// Returns the adapter registered for the given inverter type, constructed
/// from the process configuration
///
/// # Arguments
///
/// * 'inverter_type' - which vendor integration to construct
/// * 'config' - process configuration carrying vendor credentials
pub async fn from_type(
    inverter_type: InverterType,
    config: &Config,
) -> Result<Box<dyn Inverter>, InverterError> {
    match inverter_type {
        InverterType::Victron => {
            let settings = config.victron.as_ref().ok_or_else(|| {
                InverterError::Configuration(
                    "victron credentials not configured, set VICTRON_USER and VICTRON_PASS".to_string(),
                )
            })?;

            Ok(Box::new(Victron::from_settings(settings).await?))
        }
    }
}

/// Failure taxonomy shared by all inverter integrations. Lower level
/// failures are wrapped into Runtime at the adapter boundary so callers only
/// ever observe these four classes.
#[derive(Debug)]
pub enum InverterError {
    Configuration(String),
    Connection(String),
    DataUnavailable(String),
    Runtime(String),
}

impl fmt::Display for InverterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InverterError::Configuration(e)   => write!(f, "InverterError::Configuration: {}", e),
            InverterError::Connection(e)      => write!(f, "InverterError::Connection: {}", e),
            InverterError::DataUnavailable(e) => write!(f, "InverterError::DataUnavailable: {}", e),
            InverterError::Runtime(e)         => write!(f, "InverterError::Runtime: {}", e),
        }
    }
}
impl From<String> for InverterError {
    fn from(e: String) -> Self { InverterError::Runtime(e) }
}
impl From<&str> for InverterError {
    fn from(e: &str) -> Self { InverterError::Runtime(e.to_string()) }
}
impl From<reqwest::Error> for InverterError {
    fn from(e: reqwest::Error) -> Self { InverterError::Runtime(e.to_string()) }
}
impl From<serde_json::Error> for InverterError {
    fn from(e: serde_json::Error) -> Self { InverterError::Runtime(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct FixedInverter {
        readings: Vec<PowerReading>,
    }

    #[async_trait]
    impl Inverter for FixedInverter {
        async fn get_data(&self, _ts: NaiveDateTime) -> Result<Vec<PowerReading>, InverterError> {
            Ok(self.readings.clone())
        }
    }

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn inverter_type_round_trips_through_strings() {
        assert_eq!("victron".parse::<InverterType>().unwrap(), InverterType::Victron);
        assert_eq!(InverterType::Victron.to_string(), "victron");
        assert!("acme".parse::<InverterType>().is_err());
    }

    #[tokio::test]
    async fn trait_objects_preserve_series_order_and_values() {
        let adapter: Box<dyn Inverter> = Box::new(FixedInverter {
            readings: vec![
                PowerReading { timestamp: ts(10), power_kw: 5.0 },
                PowerReading { timestamp: ts(11), power_kw: 6.0 },
            ],
        });

        let series = adapter.get_data(ts(12)).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0], PowerReading { timestamp: ts(10), power_kw: 5.0 });
        assert_eq!(series[1], PowerReading { timestamp: ts(11), power_kw: 6.0 });
        assert!(series[0].timestamp < series[1].timestamp);
    }

    #[tokio::test]
    async fn dispatch_without_credentials_fails_fast() {
        let config = Config::default();
        let result = from_type(InverterType::Victron, &config).await;

        assert!(matches!(result, Err(InverterError::Configuration(_))));
    }
}
