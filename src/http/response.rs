use indexmap::IndexMap;

use crate::error::Result;
use crate::http::codec::split_response_header;
use crate::http::headers::HttpHeaders;

/// Cookie staged on a [`Response`] by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub value: String,
    /// Attribute pairs such as `("Path", "/")`; an empty value renders as a flag.
    pub attrs: Vec<(String, String)>,
}

/// The response object an [`Application`](crate::publisher::Application)
/// fills in during publishing.
///
/// Header names are lowercased on insertion unless set literally, so the
/// connection camel-cases them again before handing them to the browser.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: IndexMap<String, String>,
    cookies: IndexMap<String, Cookie>,
    body: Vec<u8>,
    stdout: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: IndexMap::new(),
            cookies: IndexMap::new(),
            body: Vec::new(),
            stdout: Vec::new(),
        }
    }

    pub fn get_status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_lowercase(), value.to_string());
    }

    /// Sets a header whose name must reach the client byte for byte.
    pub fn set_header_literal(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| self.headers.get(&name.to_lowercase()))
            .map(String::as_str)
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn set_cookie(&mut self, name: &str, value: &str, attrs: &[(&str, &str)]) {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.cookies.insert(
            name.to_string(),
            Cookie {
                value: value.to_string(),
                attrs,
            },
        );
    }

    /// Tells the client to drop a cookie.
    pub fn expire_cookie(&mut self, name: &str, path: &str) {
        self.set_cookie(
            name,
            "deleted",
            &[
                ("Path", path),
                ("Max-Age", "0"),
                ("Expires", "Wed, 31 Dec 1997 23:59:59 GMT"),
            ],
        );
    }

    pub fn cookies(&self) -> &IndexMap<String, Cookie> {
        &self.cookies
    }

    /// Cookies rendered as raw `Set-Cookie: name="value"; Attr=...` strings.
    ///
    /// The `Set-Cookie: ` prefix is fixed width; the connection relies on it
    /// when slicing these strings into header pairs.
    pub fn cookie_list(&self) -> Vec<String> {
        self.cookies
            .iter()
            .map(|(name, cookie)| {
                let mut raw = format!("Set-Cookie: {}=\"{}\"", name, cookie.value);
                for (key, value) in &cookie.attrs {
                    if value.is_empty() {
                        raw.push_str(&format!("; {key}"));
                    } else {
                        raw.push_str(&format!("; {key}={value}"));
                    }
                }
                raw
            })
            .collect()
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn get_body(&self) -> &[u8] {
        &self.body
    }

    /// Appends to the captured output stream.
    pub fn write(&mut self, data: &[u8]) {
        self.stdout.extend_from_slice(data);
    }

    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }
}

/// A response laid out exactly as it would arrive over a socket, with the
/// status line folded into a leading `Status` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub content: Vec<u8>,
    /// Header lines joined with CRLF, without a terminating blank line.
    pub headers: String,
    pub status: u16,
    pub reason: String,
}

impl WireResponse {
    /// Re-parses the header block. Empty values are accepted here even though
    /// request header lines reject them.
    pub fn header_pairs(&self) -> Result<HttpHeaders> {
        let mut headers = HttpHeaders::new();
        for line in self.headers.split("\r\n").filter(|l| !l.is_empty()) {
            let (name, value) = split_response_header(line)?;
            headers.append(&name, &value);
        }
        Ok(headers)
    }

    /// Header block, blank line, body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.headers.len() + 4 + self.content.len());
        out.extend_from_slice(self.headers.as_bytes());
        out.extend_from_slice(b"\r\n\r\n");
        out.extend_from_slice(&self.content);
        out
    }
}
