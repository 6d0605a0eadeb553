use std::string::FromUtf8Error;

/// When things go awry
#[derive(Debug)]
pub enum GoatM2mError {
    /// The endpoint URL didn't survive parsing, reason attached
    UrlParse(String),
    InvalidValue(String),
    /// Allocation or scheduler-capacity style failures
    Resource(String),
    /// Transport-level failure; the engine suspends the connection and lets
    /// the scheduler's backoff control re-entry timing
    Network(String),
    /// The server lost our registration and rejected the Update
    UpdateRejected,
    /// Any other protocol-level failure reported by a server
    Protocol(String),
    /// The SSID doesn't resolve to an active server
    NotActive(crate::Ssid),
    /// The client is offline, no new jobs may be scheduled
    Offline,
    IoError(std::io::Error),
    Utf8Error(FromUtf8Error),
    Generic(String),
}

impl GoatM2mError {
    /// The one error class the Update job must never retry by itself
    pub fn is_network(&self) -> bool {
        matches!(self, GoatM2mError::Network(_) | GoatM2mError::IoError(_))
    }
}

impl From<std::io::Error> for GoatM2mError {
    fn from(error: std::io::Error) -> Self {
        GoatM2mError::IoError(error)
    }
}

impl From<FromUtf8Error> for GoatM2mError {
    fn from(error: FromUtf8Error) -> Self {
        GoatM2mError::Utf8Error(error)
    }
}

impl From<GoatM2mError> for std::io::Error {
    fn from(error: GoatM2mError) -> Self {
        match error {
            GoatM2mError::IoError(err) => err,
            GoatM2mError::UrlParse(err) => std::io::Error::new(std::io::ErrorKind::InvalidInput, err),
            GoatM2mError::Network(err) => std::io::Error::new(std::io::ErrorKind::NotConnected, err),
            GoatM2mError::Offline => {
                std::io::Error::new(std::io::ErrorKind::NotConnected, "client is offline")
            }
            _ => std::io::Error::other(format!("{:?}", error)),
        }
    }
}
