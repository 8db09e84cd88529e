//! Error types for the in-process browser.

use thiserror::Error;

use crate::publisher::PublishError;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The command line of a request was not `METHOD PATH PROTOCOL`.
    #[error("Malformed request line: {0:?}")]
    MalformedRequest(String),

    /// A header line did not match `<token>: <value>`.
    #[error("Malformed header line: {0:?}")]
    HeaderParse(String),

    /// The application answered with a status code missing from the reason table.
    #[error("Unknown HTTP status code: {0}")]
    UnknownStatus(u16),

    #[error("URL scheme not supported: {0}")]
    SchemeNotSupported(String),

    /// The application raised while error handling was turned off.
    #[error("Publisher error: {0}")]
    Publish(#[from] PublishError),

    /// `get_response` was called before anything was sent.
    #[error("No request has been sent on this connection")]
    NoResponse,

    #[error("HTTP Error {status}: {reason} ({url})")]
    HttpError {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No link found matching {0:?}")]
    LinkNotFound(String),

    #[error("No form found matching {0:?}")]
    FormNotFound(String),

    #[error("Redirect limit of {0} exceeded")]
    TooManyRedirects(usize),

    /// No page has been loaded yet.
    #[error("Browser has no current page")]
    NoPage,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Layer error: {0}")]
    Layer(String),
}
