use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "idUser")]
    pub id_user: i64,
}

#[derive(Deserialize)]
pub struct InstallationsResponse {
    #[serde(default)]
    pub records: Vec<SiteRecord>,
}

#[derive(Deserialize)]
pub struct SiteRecord {
    #[serde(rename = "idSite")]
    pub id_site: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatsResponse {
    pub records: Option<StatsRecords>,
}

/// Statistic rows come as loosely typed [epoch-ms, value] pairs
#[derive(Deserialize)]
pub struct StatsRecords {
    pub kwh: Option<Vec<Vec<Value>>>,
}
