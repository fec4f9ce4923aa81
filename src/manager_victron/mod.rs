mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::initialization::VictronConfig;
use crate::inverter::{Inverter, InverterError};
use crate::manager_victron::models::{InstallationsResponse, LoginRequest, LoginResponse, StatsResponse};
use crate::models::PowerReading;

const REQUEST_DOMAIN: &str = "https://vrmapi.victronenergy.com";
const WINDOW_DAYS: i64 = 7;
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Victron VRM cloud adapter
pub struct Victron {
    client: Client,
    base_url: String,
    token: String,
    id_user: i64,
    site_override: Option<i64>,
    // The telemetry window is fixed when the adapter is constructed, not per
    // get_data call
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
}

impl Victron {
    /// Returns a new instance authenticated against the VRM production API
    ///
    /// # Arguments
    ///
    /// * 'config' - credentials and the optional installation override
    pub async fn from_settings(config: &VictronConfig) -> Result<Self, InverterError> {
        let base_url = config.api_url.as_deref().unwrap_or(REQUEST_DOMAIN);

        Self::connect(base_url, config).await
    }

    /// Authenticates against a VRM API instance at the given base url and
    /// returns the adapter on success
    ///
    /// # Arguments
    ///
    /// * 'base_url' - scheme and host of the VRM API
    /// * 'config' - credentials and the optional installation override
    pub async fn connect(base_url: &str, config: &VictronConfig) -> Result<Self, InverterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| InverterError::Configuration(e.to_string()))?;

        let login = LoginRequest {
            username: config.username.clone(),
            password: config.password.clone(),
        };

        let req = client
            .post(format!("{}/v2/auth/login", base_url))
            .json(&login)
            .send()
            .await
            .map_err(|e| InverterError::Connection(e.to_string()))?;

        let status = req.status();
        if !status.is_success() {
            return Err(InverterError::Connection(format!("login rejected: {:?}", status)));
        }

        let login_res: LoginResponse = req
            .json()
            .await
            .map_err(|e| InverterError::Connection(e.to_string()))?;

        let window_end = Utc::now();
        let window_start = window_end - TimeDelta::days(WINDOW_DAYS);

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token: login_res.token,
            id_user: login_res.id_user,
            site_override: config.site_id,
            window_start,
            window_end,
        })
    }

    /// Returns the installation to pull statistics for, either the
    /// configured override or the first installation registered to the user
    async fn resolve_site(&self) -> Result<i64, InverterError> {
        if let Some(id) = self.site_override {
            return Ok(id);
        }

        let installations: InstallationsResponse = self
            .get_request(&format!("/v2/users/{}/installations", self.id_user))
            .await?;

        // No disambiguation by location, the first record wins
        let first = installations.records.first().ok_or_else(|| {
            InverterError::DataUnavailable("no installations registered for user".to_string())
        })?;

        first.id_site.ok_or_else(|| {
            InverterError::DataUnavailable("installation record carries no idSite".to_string())
        })
    }

    /// Sends a GET and decodes the json body, retrying transient transport
    /// failures with exponential backoff
    ///
    /// # Arguments
    ///
    /// * 'path' - the API path excluding the domain
    async fn get_request<T: DeserializeOwned>(&self, path: &str) -> Result<T, InverterError> {
        let url = format!("{}{}", self.base_url, path);

        let mut attempt: u32 = 0;
        let response = loop {
            let result = self
                .client
                .get(&url)
                .header("x-authorization", format!("Bearer {}", self.token))
                .send()
                .await;

            match result {
                Ok(response) => break response,
                Err(e) if attempt + 1 < MAX_RETRIES && (e.is_timeout() || e.is_connect()) => {
                    debug!("request to {} failed ({}), retrying", path, e);
                    tokio::time::sleep(RETRY_DELAY * 2u32.pow(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(InverterError::DataUnavailable(format!("{:?} from {}", status, path)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| InverterError::DataUnavailable(e.to_string()))
    }
}

#[async_trait]
impl Inverter for Victron {
    async fn get_data(&self, _ts: NaiveDateTime) -> Result<Vec<PowerReading>, InverterError> {
        let site_id = self.resolve_site().await?;

        let path = format!(
            "/v2/installations/{}/stats?type=kwh&start={}&end={}",
            site_id,
            self.window_start.timestamp(),
            self.window_end.timestamp(),
        );
        let stats: StatsResponse = self.get_request(&path).await?;

        let kwh = stats
            .records
            .and_then(|r| r.kwh)
            .ok_or_else(|| InverterError::DataUnavailable("no kwh statistics in response".to_string()))?;

        transform_kwh_stats(kwh)
    }
}

/// Normalizes raw [epoch-ms, value] statistic rows into an ordered series of
/// naive timestamped power readings
///
/// # Arguments
///
/// * 'input' - the rows to transform
fn transform_kwh_stats(input: Vec<Vec<Value>>) -> Result<Vec<PowerReading>, InverterError> {
    let mut result: Vec<PowerReading> = Vec::with_capacity(input.len());

    for row in &input {
        if row.len() < 2 {
            return Err(InverterError::DataUnavailable(format!(
                "expected [timestamp, value] rows, got {} columns",
                row.len()
            )));
        }

        let millis = row[0]
            .as_i64()
            .or_else(|| row[0].as_f64().map(|f| f as i64))
            .ok_or_else(|| InverterError::DataUnavailable("non-numeric timestamp column".to_string()))?;

        let timestamp = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| InverterError::DataUnavailable(format!("timestamp {} out of range", millis)))?
            .naive_utc();

        // Values occasionally arrive as strings in scientific notation
        let power_kw = row[1]
            .as_f64()
            .or_else(|| row[1].as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| InverterError::DataUnavailable("non-numeric value column".to_string()))?;

        result.push(PowerReading { timestamp, power_kw });
    }

    result.sort_by_key(|r| r.timestamp);

    Ok(result)
}
