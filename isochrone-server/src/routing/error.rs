//! Routing client error types.

use std::fmt;

/// Errors from the external routing API.
#[derive(Debug)]
pub enum RoutingError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// XML response could not be decoded
    Xml {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    ApiError { status: u16, message: String },

    /// Rate limited by the API (HTTP 429)
    RateLimited,

    /// Invalid API key or unauthorized
    Unauthorized,

    /// The API found no trip between the endpoints
    NoTripFound,

    /// Client not configured (missing API key, bad base URL)
    NotConfigured(String),
}

impl RoutingError {
    /// Whether retrying after a pause may succeed.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RoutingError::RateLimited)
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::Http(e) => write!(f, "HTTP error: {e}"),
            RoutingError::Xml { message, body } => {
                write!(f, "XML parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            RoutingError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            RoutingError::RateLimited => write!(f, "rate limited by routing API"),
            RoutingError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
            RoutingError::NoTripFound => write!(f, "no trip found"),
            RoutingError::NotConfigured(msg) => write!(f, "not configured: {msg}"),
        }
    }
}

impl std::error::Error for RoutingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoutingError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(err: reqwest::Error) -> Self {
        RoutingError::Http(err)
    }
}

impl From<quick_xml::Error> for RoutingError {
    fn from(err: quick_xml::Error) -> Self {
        RoutingError::Xml {
            message: err.to_string(),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RoutingError::ApiError {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "API error 500: Internal Server Error");

        let err = RoutingError::Xml {
            message: "unexpected end of file".into(),
            body: Some("<OJP>".into()),
        };
        assert!(err.to_string().contains("XML parse error"));
        assert!(err.to_string().contains("<OJP>"));

        assert_eq!(RoutingError::NoTripFound.to_string(), "no trip found");
        assert!(RoutingError::RateLimited.is_rate_limited());
        assert!(!RoutingError::Unauthorized.is_rate_limited());
    }
}
