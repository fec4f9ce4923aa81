use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Formatter;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::inverter::InverterType;
use crate::serialize_timestamp;

/// A photovoltaic site as described by the caller.
/// Immutable once constructed, one instance per request.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PVSite {
    pub latitude: f64,
    pub longitude: f64,
    pub capacity_kwp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverter_type: Option<InverterType>,
}

impl PVSite {
    /// Checks the site against the ranges a forecast can be produced for
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError(format!("latitude {} out of range -90..90", self.latitude)));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError(format!("longitude {} out of range -180..180", self.longitude)));
        }
        if !self.capacity_kwp.is_finite() || self.capacity_kwp <= 0.0 {
            return Err(ValidationError(format!("capacity_kwp {} must be greater than zero", self.capacity_kwp)));
        }

        Ok(())
    }

    /// Returns a copy of the site with any inverter identity stripped
    pub fn without_inverter(&self) -> PVSite {
        PVSite { inverter_type: None, ..self.clone() }
    }
}

#[derive(Deserialize)]
pub struct ForecastRequest {
    pub site: PVSite,
    pub timestamp: Option<String>,
}

/// One timestamped power value in kW
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerReading {
    pub timestamp: NaiveDateTime,
    pub power_kw: f64,
}

/// Predicted power at one timestamp. The no live sibling is only present
/// when a live corrected and a baseline series were both computed.
#[derive(Serialize, Debug)]
pub struct Prediction {
    pub power_kw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_kw_no_live_pv: Option<f64>,
}

#[derive(Serialize, Debug)]
pub struct ForecastResponse {
    #[serde(with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    pub predictions: BTreeMap<String, Prediction>,
}

#[derive(Debug)]
pub struct ValidationError(pub String);
impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ValidationError: {}", self.0)
    }
}
impl From<&str> for ValidationError {
    fn from(e: &str) -> Self { ValidationError(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> PVSite {
        PVSite { latitude: 51.5, longitude: -0.1, capacity_kwp: 4.0, inverter_type: None }
    }

    #[test]
    fn accepts_a_plain_site() {
        assert!(site().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut bad = site();
        bad.latitude = 91.0;
        assert!(bad.validate().is_err());

        let mut bad = site();
        bad.longitude = -200.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_capacity() {
        let mut bad = site();
        bad.capacity_kwp = 0.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn inverter_type_parses_from_snake_case_json() {
        let parsed: PVSite = serde_json::from_str(
            r#"{"latitude": 51.5, "longitude": -0.1, "capacity_kwp": 4.0, "inverter_type": "victron"}"#,
        )
        .unwrap();

        assert_eq!(parsed.inverter_type, Some(InverterType::Victron));
        assert_eq!(parsed.without_inverter().inverter_type, None);
    }

    #[test]
    fn unknown_inverter_type_is_a_deserialize_error() {
        let result = serde_json::from_str::<PVSite>(
            r#"{"latitude": 51.5, "longitude": -0.1, "capacity_kwp": 4.0, "inverter_type": "acme"}"#,
        );
        assert!(result.is_err());
    }
}
