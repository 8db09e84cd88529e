//! The contract between the harness and the application under test.
//!
//! An [`Application`] receives a [`PublishRequest`] (the dispatch
//! environment, a body stream, an error stream and the debug flag) and fills
//! in a [`Response`]. It runs synchronously on the calling thread and may
//! change the ambient [`state`] freely; the caller restores it afterwards.

pub mod environ;
pub mod responses;
pub mod state;

use std::io::{Cursor, Read};

use thiserror::Error;

use crate::http::response::Response;
pub use environ::Environ;

/// Failure raised by an application while publishing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct PublishError {
    /// Status used when the caller renders the failure as a response.
    pub status: u16,
    pub message: String,
}

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(500, message)
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

pub struct PublishRequest {
    pub environ: Environ,
    pub stdin: Cursor<Vec<u8>>,
    pub stderr: Vec<u8>,
    /// Set when errors should propagate instead of becoming error pages.
    pub debug: bool,
}

impl PublishRequest {
    pub fn new(environ: Environ, body: Vec<u8>, debug: bool) -> Self {
        Self {
            environ,
            stdin: Cursor::new(body),
            stderr: Vec::new(),
            debug,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.environ.get(key).map(String::as_str)
    }

    /// Reads the remaining request body.
    pub fn read_body(&mut self) -> std::io::Result<Vec<u8>> {
        let mut body = Vec::new();
        self.stdin.read_to_end(&mut body)?;
        Ok(body)
    }
}

pub trait Application {
    fn publish(&self, request: &mut PublishRequest, response: &mut Response) -> Result<(), PublishError>;

    /// Brings pending storage changes into view for the next call.
    fn sync(&self) {}
}
