//! Protocol handling between the browser and a [`ConnectionFactory`].
//!
//! [`HttpHandler::open`] accepts `http` URLs only, completes the request
//! headers a client library would add, runs the request over a fresh
//! connection and parses the wire response back into a [`Page`].

pub mod cookies;
pub mod middleware;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::http::headers::HttpHeaders;
use crate::http::request::Request;
use crate::http::response::WireResponse;
use crate::net::connection::ConnectionFactory;

/// A response as seen by the browser.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: u16,
    pub reason: String,
    /// Response headers without the synthetic `Status` entry.
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl Page {
    pub fn from_wire(url: Url, wire: WireResponse) -> Result<Self> {
        let mut headers = wire.header_pairs()?;
        headers.remove("Status");
        Ok(Self {
            url,
            status: wire.status,
            reason: wire.reason,
            headers,
            body: wire.content,
        })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    pub fn is_html(&self) -> bool {
        self.content_type().is_some_and(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("text/html") || ct.starts_with("application/xhtml+xml")
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct HttpHandler<F: ConnectionFactory> {
    factory: F,
}

impl<F: ConnectionFactory> HttpHandler<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn open(&self, req: &Request) -> Result<Page> {
        if req.url.scheme() != "http" {
            return Err(Error::SchemeNotSupported(req.url.scheme().to_string()));
        }

        let host = req.host();
        let mut headers = req.headers.clone();
        if !headers.contains("Host") {
            headers.set("Host", &host);
        }
        if !req.body.is_empty() {
            if !headers.contains("Content-Type") {
                headers.set("Content-Type", "application/x-www-form-urlencoded");
            }
            if !headers.contains("Content-Length") {
                headers.set("Content-Length", &req.body.len().to_string());
            }
        }

        let mut conn = self.factory.connect(&host);
        conn.request(req.method.as_str(), &req.selector(), &req.body, &headers)?;
        let wire = conn.get_response()?;

        debug!(url = %req.url, status = wire.status, "opened");
        Page::from_wire(req.url.clone(), wire)
    }
}
