use std::fmt;
use std::fmt::Formatter;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};

use crate::initialization::Config;
use crate::inverter;
use crate::inverter::InverterError;
use crate::models::{PVSite, PowerReading, ValidationError};

const HORIZON_HOURS: i64 = 48;
const STEP_MINUTES: i64 = 15;

/// Runs the forecast for a site from the given timestamp
///
/// The returned series covers a 48 hour horizon at 15 minute steps. Sites
/// carrying an inverter type get the modeled series calibrated against live
/// telemetry pulled through the matching adapter, looked up from the process
/// configuration.
///
/// # Arguments
///
/// * 'site' - the site to forecast for
/// * 'ts' - first timestamp of the series
/// * 'config' - process configuration used for adapter lookup
pub async fn run_forecast(
    site: &PVSite,
    ts: NaiveDateTime,
    config: &Config,
) -> Result<Vec<PowerReading>, ForecastError> {
    site.validate()?;

    let baseline = model_series(site, ts);

    match site.inverter_type {
        None => Ok(baseline),
        Some(inverter_type) => {
            let adapter = inverter::from_type(inverter_type, config).await?;
            let telemetry = adapter.get_data(ts).await?;

            Ok(apply_live_correction(baseline, &telemetry, site))
        }
    }
}

/// Produces the modeled power series over the forecast horizon
///
/// # Arguments
///
/// * 'site' - the site to model
/// * 'ts' - first timestamp of the series
fn model_series(site: &PVSite, ts: NaiveDateTime) -> Vec<PowerReading> {
    (0..HORIZON_HOURS * 60 / STEP_MINUTES)
        .map(|step| {
            let timestamp = ts + TimeDelta::minutes(step * STEP_MINUTES);

            PowerReading { timestamp, power_kw: clear_sky_power(site, timestamp) }
        })
        .collect()
}

/// Clear sky power for a site at one point in time
fn clear_sky_power(site: &PVSite, timestamp: NaiveDateTime) -> f64 {
    let elevation = solar_elevation(site.latitude, site.longitude, timestamp);
    if elevation <= 0.0 {
        return 0.0;
    }

    let zenith = (90.0 - elevation).clamp(0.0, 90.0);

    site.capacity_kwp * air_mass_effect(zenith) * elevation.to_radians().sin()
}

/// Returns the sun elevation over the horizon in degrees at the given naive
/// UTC time and position
///
/// # Arguments
///
/// * 'latitude' - site latitude in degrees
/// * 'longitude' - site longitude in degrees
/// * 'timestamp' - naive UTC point in time
fn solar_elevation(latitude: f64, longitude: f64, timestamp: NaiveDateTime) -> f64 {
    let day_of_year = timestamp.ordinal() as f64;
    let hour = timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0;

    let declination =
        23.45f64.to_radians() * ((360.0 / 365.25) * (day_of_year + 284.0)).to_radians().sin();

    // Solar time from UTC, one hour per 15 degrees of longitude
    let solar_hour = hour + longitude / 15.0;
    let hour_angle = ((solar_hour - 12.0) * 15.0).to_radians();

    let lat = latitude.to_radians();
    let sin_elevation =
        lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();

    sin_elevation.asin().to_degrees()
}

/// Returns percentage of sun intensity in relation to intensity external to the earth's atmosphere.
///
/// # Arguments
///
/// * 'zenith_angle' - sun angle in relation to sun zenith
fn air_mass_effect(zenith_angle: f64) -> f64 {
    const R: f64 = 708.0;

    // Intensity external to the earths atmosphere
    const I_0: f64 = 1353.0;

    let zenith_cos = zenith_angle.to_radians().cos();
    let enumerator = 2.0 * R + 1.0;
    let denominator = ((R * zenith_cos).powf(2.0) + 2.0 * R + 1.0).sqrt() + R * zenith_cos;

    let am = enumerator / denominator;
    let intensity = 1.1 * I_0 * 0.7f64.powf(am.powf(0.678));

    intensity / I_0
}

/// Scales the modeled series by the ratio of observed to modeled power over
/// the telemetry window, bounded so a noisy window cannot dominate the model
///
/// # Arguments
///
/// * 'baseline' - the modeled series to correct
/// * 'telemetry' - readings pulled from the inverter
/// * 'site' - the site the model was produced for
fn apply_live_correction(
    baseline: Vec<PowerReading>,
    telemetry: &[PowerReading],
    site: &PVSite,
) -> Vec<PowerReading> {
    let observed: f64 = telemetry.iter().map(|r| r.power_kw).sum();
    let modeled: f64 = telemetry.iter().map(|r| clear_sky_power(site, r.timestamp)).sum();

    if telemetry.is_empty() || modeled <= f64::EPSILON {
        return baseline;
    }

    let factor = (observed / modeled).clamp(0.5, 1.5);

    baseline
        .into_iter()
        .map(|r| PowerReading { power_kw: r.power_kw * factor, ..r })
        .collect()
}

#[derive(Debug)]
pub struct ForecastError(pub String);
impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ForecastError: {}", self.0)
    }
}
impl From<ValidationError> for ForecastError {
    fn from(e: ValidationError) -> Self { ForecastError(e.to_string()) }
}
impl From<InverterError> for ForecastError {
    fn from(e: InverterError) -> Self { ForecastError(e.to_string()) }
}
impl From<chrono::ParseError> for ForecastError {
    fn from(e: chrono::ParseError) -> Self { ForecastError(e.to_string()) }
}
