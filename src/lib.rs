pub mod errors;
pub mod handlers;
pub mod initialization;
pub mod inverter;
pub mod logging;
pub mod manager_forecast;
pub mod manager_victron;
pub mod models;
pub mod reconciler;
pub mod serialize_timestamp;
