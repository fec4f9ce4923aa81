use std::fmt;
use std::fmt::Formatter;

/// Errors the process cannot start or keep running with
#[derive(Debug)]
pub enum UnrecoverableError {
    Config(String),
    Web(String),
}

impl fmt::Display for UnrecoverableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnrecoverableError::Config(e) => write!(f, "UnrecoverableError::Config: {}", e),
            UnrecoverableError::Web(e)    => write!(f, "UnrecoverableError::Web: {}", e),
        }
    }
}
impl From<std::io::Error> for UnrecoverableError {
    fn from(e: std::io::Error) -> Self { UnrecoverableError::Web(e.to_string()) }
}
impl From<toml::de::Error> for UnrecoverableError {
    fn from(e: toml::de::Error) -> Self { UnrecoverableError::Config(e.to_string()) }
}
impl From<log::SetLoggerError> for UnrecoverableError {
    fn from(e: log::SetLoggerError) -> Self { UnrecoverableError::Config(e.to_string()) }
}
