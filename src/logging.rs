use env_logger::Builder;

use crate::errors::UnrecoverableError;

/// Initializes the process wide logger
///
/// # Arguments
///
/// * 'level' - filter directive, e.g. "info" or "pv_forecast=debug"
pub fn setup_logging(level: &str) -> Result<(), UnrecoverableError> {
    Builder::new()
        .parse_filters(level)
        .format_timestamp_millis()
        .try_init()?;

    Ok(())
}
