use std::rc::Rc;

use tracing::debug;

use crate::config::{HarnessConfig, config};
use crate::error::{Error, Result};
use crate::http::codec::{camel_case, split_cookie};
use crate::http::headers::HttpHeaders;
use crate::http::response::{Response, WireResponse};
use crate::http::status;
use crate::net::caller::Caller;
use crate::publisher::Application;

/// Request header that turns error handling off for one call. It is
/// consumed by the connection and never reaches the application.
pub const HANDLE_ERRORS_HEADER: &str = "X-Handle-Errors";

/// The socket-shaped surface the protocol handler talks to.
pub trait HttpConnection {
    /// Sends a complete raw request.
    fn send(&mut self, request: &[u8]) -> Result<()>;

    /// Assembles a raw request from its parts and sends it.
    fn request(&mut self, method: &str, selector: &str, body: &[u8], headers: &HttpHeaders) -> Result<()>;

    fn get_response(&mut self) -> Result<WireResponse>;
}

/// Opens connections for a host.
pub trait ConnectionFactory {
    fn connect(&self, host: &str) -> Box<dyn HttpConnection>;
}

/// A connection whose far end is an in-process [`Application`].
pub struct PublisherConnection<A: Application> {
    caller: Caller<A>,
    host: String,
    handle_errors: bool,
    response: Option<Response>,
}

impl<A: Application> PublisherConnection<A> {
    pub fn new(caller: Caller<A>, host: &str) -> Self {
        Self {
            caller,
            host: host.to_string(),
            handle_errors: true,
            response: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_handle_errors(&mut self, handle_errors: bool) {
        self.handle_errors = handle_errors;
    }
}

impl<A: Application> HttpConnection for PublisherConnection<A> {
    fn send(&mut self, request: &[u8]) -> Result<()> {
        self.response = None;
        self.response = Some(self.caller.call(request, self.handle_errors)?);
        Ok(())
    }

    fn request(&mut self, method: &str, selector: &str, body: &[u8], headers: &HttpHeaders) -> Result<()> {
        let mut headers = headers.clone();
        if let Some(flag) = headers.remove(HANDLE_ERRORS_HEADER) {
            self.handle_errors = flag != "False";
        }

        let mut raw = format!("{method} {selector} HTTP/1.1\r\n{}\r\n", headers.stringify()).into_bytes();
        raw.extend_from_slice(body);

        debug!(host = %self.host, method, selector, handle_errors = self.handle_errors, "sending request");
        self.send(&raw)
    }

    fn get_response(&mut self) -> Result<WireResponse> {
        let response = self.response.as_ref().ok_or(Error::NoResponse)?;
        format_response(response)
    }
}

/// Lays a [`Response`] out as socket output: a leading `Status` header, then
/// the camel-cased headers and cookies sorted as pairs.
pub fn format_response(response: &Response) -> Result<WireResponse> {
    let status = response.get_status();
    let reason = status::reason(status)?;

    let mut headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| (camel_case(name), value.clone()))
        .collect();

    headers.extend(response.cookie_list().iter().map(|c| split_cookie(c)));
    headers.sort();
    headers.insert(0, ("Status".to_string(), format!("{status} {reason}")));

    let headers = headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\r\n");

    Ok(WireResponse {
        content: response.get_body().to_vec(),
        headers,
        status,
        reason: reason.to_string(),
    })
}

/// Builds [`PublisherConnection`]s bound to one application root.
pub struct PublisherConnectionFactory<A: Application> {
    app: Rc<A>,
    config: HarnessConfig,
}

impl<A: Application> PublisherConnectionFactory<A> {
    pub fn new(app: Rc<A>) -> Self {
        Self::with_config(app, config().clone())
    }

    pub fn with_config(app: Rc<A>, config: HarnessConfig) -> Self {
        Self { app, config }
    }
}

impl<A: Application + 'static> ConnectionFactory for PublisherConnectionFactory<A> {
    fn connect(&self, host: &str) -> Box<dyn HttpConnection> {
        let caller = Caller::with_config(Rc::clone(&self.app), self.config.clone());
        let mut conn = PublisherConnection::new(caller, host);
        conn.set_handle_errors(self.config.handle_errors);
        Box::new(conn)
    }
}
