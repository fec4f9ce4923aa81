use chrono::NaiveDateTime;
use serde::de::Error;
use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serializer for serde with to render a naive timestamp in the
/// `YYYY-MM-DD HH:MM:SS` form the response body uses.
/// This function is not used directly but rather from struct fields with a serde with attribute
/// pointing to this module
///
/// # Arguments
///
/// * 'date_time' - the date time object
/// * 'serializer' - serializer given from serde
pub fn serialize<S>(
    date_time: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    date_time.format(FORMAT).to_string().serialize(serializer)
}

pub fn deserialize<'de, D>(d: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;

    NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(D::Error::custom)
}
