use std::fmt;

/// Failure classes for the daily fetch. The quote API reports its own errors
/// inside a 200 body, so transport and API failures are distinct cases.
#[derive(Debug, Clone)]
pub enum FetchError {
    Transport(String),
    Api(String),
    MissingSeries,
    Malformed(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(detail) => write!(f, "transport error: {detail}"),
            FetchError::Api(detail) => write!(f, "quote API error: {detail}"),
            FetchError::MissingSeries => write!(f, "daily time series missing from response"),
            FetchError::Malformed(detail) => write!(f, "malformed payload: {detail}"),
        }
    }
}

impl std::error::Error for FetchError {}
