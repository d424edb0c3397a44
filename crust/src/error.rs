use hyper::http;
use std::fmt::Display;

#[derive(Debug)]
pub enum Error {
    /// A check or a mocked-route expectation failed. `detail` names the field
    /// or value that did not match.
    Assertion { label: String, detail: String },
    /// Connection or timeout failure while talking to the target service.
    Network(String),
    /// The scenario or mock definition is malformed; raised before any step
    /// executes.
    Configuration(String),
    /// A `${name}` reference in a URL or body template has no captured value.
    UnknownVariable(String),
    InvalidHeaderName,
    InvalidHeaderValue,
    Json(serde_json::Error),
    HyperError(hyper::Error),
    HttpError(http::Error),
}

impl Error {
    pub fn assertion<L: Into<String>, D: Into<String>>(label: L, detail: D) -> Self {
        Error::Assertion {
            label: label.into(),
            detail: detail.into(),
        }
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Assertion { label, detail } => {
                write!(f, "Assertion '{}' failed: {}", label, detail)
            }
            Error::Network(e) => write!(f, "Network error: {}", e),
            Error::Configuration(e) => write!(f, "Configuration error: {}", e),
            Error::UnknownVariable(name) => {
                write!(f, "No captured value for variable '{}'", name)
            }
            Error::InvalidHeaderName => write!(f, "Invalid header name"),
            Error::InvalidHeaderValue => write!(f, "Invalid header value"),
            Error::Json(e) => write!(f, "Json error: {}", e),
            Error::HyperError(e) => write!(f, "Hyper error: {}", e),
            Error::HttpError(e) => write!(f, "Http Error: {}", e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::HyperError(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::HttpError(e)
    }
}
