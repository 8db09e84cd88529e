use url::Url;

use crate::http::HttpMethod;
use crate::http::headers::HttpHeaders;

/// A raw request broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    /// URL-decoded path portion of the command line.
    pub path_info: String,
    /// Everything after the first `?` of the decoded path, verbatim.
    pub query_string: Option<String>,
    pub protocol: String,
    /// Header pairs in arrival order, duplicates included.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A request issued by the browser before it is rendered as text.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HttpHeaders::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: Url, body: impl Into<Vec<u8>>, content_type: &str) -> Self {
        let mut req = Self::new(HttpMethod::Post, url);
        req.body = body.into();
        req.headers.set("Content-Type", content_type);
        req
    }

    /// Path plus query, as sent on the command line.
    pub fn selector(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{}", self.url.path(), q),
            None => self.url.path().to_string(),
        }
    }

    /// `host[:port]` for the `Host` header.
    pub fn host(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}
