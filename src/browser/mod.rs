//! A test browser that talks to an in-process application.
//!
//! ```ignore
//! let mut browser = Browser::new(Rc::new(app));
//! browser.open("http://localhost/")?;
//! browser.follow_link("Log in")?;
//! let mut form = browser.get_form("login")?;
//! form.set("user", "admin").set("password", "secret");
//! browser.submit(&form, Some("submit"))?;
//! assert!(browser.contents()?.contains("Welcome"));
//! ```
//!
//! Each navigation builds a [`Request`], decorates it with extra headers,
//! the referer and stored cookies, and hands it to the [`HttpHandler`].
//! Responses are decoded, `http-equiv` meta tags are merged into the
//! headers, cookies are stored, and redirects, refreshes and Basic or
//! Digest auth challenges are followed before the page becomes current.

pub mod html;

use std::rc::Rc;

use rand::Rng;
use tracing::debug;
use url::Url;

use crate::config::{HarnessConfig, config};
use crate::error::{Error, Result};
use crate::handler::cookies::CookieJar;
use crate::handler::middleware::{
    basic_challenge, decode_content, digest_challenge, redirect_request, refresh_target, with_basic_auth,
    with_digest_auth,
};
use crate::handler::{HttpHandler, Page};
use crate::http::HttpMethod;
use crate::http::headers::HttpHeaders;
use crate::http::request::Request;
use crate::net::connection::{ConnectionFactory, HANDLE_ERRORS_HEADER, PublisherConnectionFactory};
use crate::publisher::Application;
pub use html::{Form, Link};

pub struct Browser<F: ConnectionFactory> {
    handler: HttpHandler<F>,
    config: HarnessConfig,
    cookies: CookieJar,
    extra_headers: HttpHeaders,
    credentials: Option<(String, String)>,
    handle_errors: bool,
    raise_http_errors: bool,
    current: Option<(Request, Page)>,
    history: Vec<(Request, Page)>,
}

impl<A: Application + 'static> Browser<PublisherConnectionFactory<A>> {
    pub fn new(app: Rc<A>) -> Self {
        Self::with_config(app, config().clone())
    }

    pub fn with_config(app: Rc<A>, config: HarnessConfig) -> Self {
        let factory = PublisherConnectionFactory::with_config(app, config.clone());
        Self::with_factory(factory, config)
    }
}

impl<F: ConnectionFactory> Browser<F> {
    pub fn with_factory(factory: F, config: HarnessConfig) -> Self {
        Self {
            handler: HttpHandler::new(factory),
            handle_errors: config.handle_errors,
            raise_http_errors: config.raise_http_errors,
            config,
            cookies: CookieJar::new(),
            extra_headers: HttpHeaders::new(),
            credentials: None,
            current: None,
            history: Vec::new(),
        }
    }

    /// Sends `value` as header `name` on every later request.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.extra_headers.set(name, value);
    }

    /// Credentials offered when the application answers with a Basic challenge.
    pub fn add_password(&mut self, user: &str, password: &str) {
        self.credentials = Some((user.to_string(), password.to_string()));
    }

    /// With error handling off, application errors surface as
    /// [`Error::Publish`] instead of error pages.
    pub fn set_handle_errors(&mut self, handle_errors: bool) {
        self.handle_errors = handle_errors;
    }

    pub fn set_raise_http_errors(&mut self, raise: bool) {
        self.raise_http_errors = raise;
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    pub fn open(&mut self, url: &str) -> Result<()> {
        let url = self.resolve(url)?;
        self.navigate(Request::get(url))
    }

    pub fn post(&mut self, url: &str, body: impl Into<Vec<u8>>, content_type: &str) -> Result<()> {
        let url = self.resolve(url)?;
        self.navigate(Request::post(url, body, content_type))
    }

    /// Repeats the request that produced the current page.
    pub fn reload(&mut self) -> Result<()> {
        let (req, _) = self.current.as_ref().ok_or(Error::NoPage)?;
        let req = req.clone();
        let (req, page) = self.fetch(req)?;
        self.current = Some((req, page));
        self.check_status()
    }

    /// Returns to the previous page without contacting the application.
    pub fn go_back(&mut self) -> Result<()> {
        let previous = self.history.pop().ok_or(Error::NoPage)?;
        self.current = Some(previous);
        Ok(())
    }

    pub fn url(&self) -> Result<&Url> {
        Ok(&self.page()?.url)
    }

    pub fn status(&self) -> Result<u16> {
        Ok(self.page()?.status)
    }

    pub fn reason(&self) -> Result<&str> {
        Ok(&self.page()?.reason)
    }

    pub fn headers(&self) -> Result<&HttpHeaders> {
        Ok(&self.page()?.headers)
    }

    pub fn header(&self, name: &str) -> Result<Option<&str>> {
        Ok(self.page()?.headers.get(name))
    }

    pub fn contents(&self) -> Result<String> {
        Ok(self.page()?.text())
    }

    pub fn is_html(&self) -> Result<bool> {
        Ok(self.page()?.is_html())
    }

    pub fn links(&self) -> Result<Vec<Link>> {
        Ok(html::links(&self.page()?.text()))
    }

    /// First link whose text contains `text`.
    pub fn get_link(&self, text: &str) -> Result<Link> {
        self.links()?
            .into_iter()
            .find(|link| link.text.contains(text))
            .ok_or_else(|| Error::LinkNotFound(text.to_string()))
    }

    pub fn follow_link(&mut self, text: &str) -> Result<()> {
        let link = self.get_link(text)?;
        self.open(&link.href)
    }

    /// Form whose name or id is `key`, or the form at that index.
    pub fn get_form(&self, key: &str) -> Result<Form> {
        let forms = html::forms(&self.page()?.text());
        let by_index = key.parse::<usize>().ok().and_then(|i| forms.get(i).cloned());
        forms
            .iter()
            .find(|f| f.name.as_deref() == Some(key) || f.id.as_deref() == Some(key))
            .cloned()
            .or(by_index)
            .ok_or_else(|| Error::FormNotFound(key.to_string()))
    }

    /// Submits `form`, including the named submit button when given.
    pub fn submit(&mut self, form: &Form, button: Option<&str>) -> Result<()> {
        let mut url = self.resolve(&form.action)?;
        let data = form.encode(button);

        let req = match form.method {
            HttpMethod::Post => Request::post(url, data, "application/x-www-form-urlencoded"),
            _ => {
                url.set_query(if data.is_empty() { None } else { Some(data.as_str()) });
                Request::get(url)
            }
        };
        self.navigate(req)
    }

    fn page(&self) -> Result<&Page> {
        self.current.as_ref().map(|(_, page)| page).ok_or(Error::NoPage)
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        match &self.current {
            Some((_, page)) => Ok(page.url.join(url)?),
            None => Ok(Url::parse(url)?),
        }
    }

    fn navigate(&mut self, req: Request) -> Result<()> {
        let (req, page) = self.fetch(req)?;
        if let Some(previous) = self.current.replace((req, page)) {
            self.history.push(previous);
        }
        self.check_status()
    }

    fn check_status(&self) -> Result<()> {
        let page = self.page()?;
        if self.raise_http_errors && page.status >= 400 {
            return Err(Error::HttpError {
                status: page.status,
                reason: page.reason.clone(),
                url: page.url.to_string(),
            });
        }
        Ok(())
    }

    /// Runs `req` and every follow-up it triggers; returns the final
    /// request together with its page.
    fn fetch(&mut self, mut req: Request) -> Result<(Request, Page)> {
        let referer = self.current.as_ref().map(|(_, page)| page.url.to_string());
        if let Some(referer) = referer {
            if !req.headers.contains("Referer") {
                req.headers.set("Referer", &referer);
            }
        }

        let mut hops = 0;
        let mut auth_tried = false;
        loop {
            let page = self.exchange(&req)?;

            if !auth_tried {
                if let Some((user, password)) = &self.credentials {
                    if let Some(challenge) = digest_challenge(&page) {
                        debug!(realm = %challenge.realm, %user, "answering digest auth challenge");
                        let cnonce = format!("{:016x}", rand::rng().random::<u64>());
                        req = with_digest_auth(&req, &challenge, user, password, &cnonce);
                        auth_tried = true;
                        continue;
                    }
                    if let Some(realm) = basic_challenge(&page) {
                        debug!(%realm, %user, "answering basic auth challenge");
                        req = with_basic_auth(&req, user, password);
                        auth_tried = true;
                        continue;
                    }
                }
            }

            let next = if self.config.follow_redirects {
                redirect_request(&req, &page)
            } else {
                None
            };
            let next = next.or_else(|| {
                if !self.config.follow_refresh {
                    return None;
                }
                refresh_target(&page, self.config.max_refresh_delay).map(|url| {
                    let mut refresh = Request::get(url);
                    refresh.headers = req.headers.clone();
                    refresh.headers.remove("Content-Type");
                    refresh.headers.remove("Content-Length");
                    refresh
                })
            });

            match next {
                Some(next) => {
                    hops += 1;
                    if hops > self.config.max_redirects {
                        return Err(Error::TooManyRedirects(self.config.max_redirects));
                    }
                    debug!(from = %page.url, to = %next.url, status = page.status, "following");
                    req = next;
                }
                None => return Ok((req, page)),
            }
        }
    }

    /// One round trip: decorate, open, post-process.
    fn exchange(&mut self, req: &Request) -> Result<Page> {
        let mut sent = req.clone();
        for (name, value) in self.extra_headers.iter() {
            if !sent.headers.contains(name) {
                sent.headers.append(name, value);
            }
        }
        if let Some(cookie) = self.cookies.header_for(&sent.url) {
            sent.headers.set("Cookie", &cookie);
        }
        let handle_errors = if self.handle_errors { "True" } else { "False" };
        sent.headers.set(HANDLE_ERRORS_HEADER, handle_errors);

        let mut page = self.handler.open(&sent)?;

        if self.config.decode_content {
            decode_content(&mut page);
        }
        if page.is_html() {
            for (name, value) in html::meta_equiv(&page.text()) {
                page.headers.append(&name, &value);
            }
        }
        let set_cookies: Vec<String> = page.headers.get_all("Set-Cookie").map(str::to_string).collect();
        for set_cookie in set_cookies {
            self.cookies.store(&page.url, &set_cookie);
        }

        Ok(page)
    }
}
