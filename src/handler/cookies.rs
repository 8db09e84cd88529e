use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    /// Set when the cookie carried a `Domain` attribute and matches subdomains.
    pub include_subdomains: bool,
    pub path: String,
    pub expires: Option<SystemTime>,
    pub secure: bool,
}

impl StoredCookie {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    fn matches(&self, url: &Url, now: SystemTime) -> bool {
        if self.is_expired(now) || (self.secure && url.scheme() != "https") {
            return false;
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let domain_ok = host == self.domain
            || (self.include_subdomains && host.ends_with(&format!(".{}", self.domain)));

        domain_ok && path_matches(url.path(), &self.path)
    }
}

/// Cookies received from the application, replayed on later requests.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: IndexMap<(String, String, String), StoredCookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, url: &Url, set_cookie: &str) {
        self.store_at(url, set_cookie, SystemTime::now());
    }

    /// Records one `Set-Cookie` value received for `url`. Expired cookies
    /// delete any stored cookie with the same name, domain and path.
    pub fn store_at(&mut self, url: &Url, set_cookie: &str, now: SystemTime) {
        let Some(cookie) = parse_set_cookie(url, set_cookie, now) else {
            warn!(%url, set_cookie, "ignoring malformed cookie");
            return;
        };

        let key = (cookie.domain.clone(), cookie.path.clone(), cookie.name.clone());
        if cookie.is_expired(now) {
            self.cookies.shift_remove(&key);
        } else {
            self.cookies.insert(key, cookie);
        }
    }

    pub fn header_for(&self, url: &Url) -> Option<String> {
        self.header_for_at(url, SystemTime::now())
    }

    /// `Cookie` header value for a request to `url`, longest paths first.
    pub fn header_for_at(&self, url: &Url, now: SystemTime) -> Option<String> {
        let mut matching: Vec<&StoredCookie> = self
            .cookies
            .values()
            .filter(|c| c.matches(url, now))
            .collect();
        if matching.is_empty() {
            return None;
        }

        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Value of the first stored cookie called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .values()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredCookie> {
        self.cookies.values()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}

fn parse_set_cookie(url: &Url, raw: &str, now: SystemTime) -> Option<StoredCookie> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = StoredCookie {
        name: name.to_string(),
        value: unquote(value.trim()).to_string(),
        domain: url.host_str().unwrap_or_default().to_ascii_lowercase(),
        include_subdomains: false,
        path: default_path(url.path()),
        expires: None,
        secure: false,
    };

    let mut max_age = None;
    for attr in parts {
        let (key, value) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "path" if value.starts_with('/') => cookie.path = value.to_string(),
            "domain" if !value.is_empty() => {
                cookie.domain = value.trim_start_matches('.').to_ascii_lowercase();
                cookie.include_subdomains = true;
            }
            "expires" => cookie.expires = httpdate::parse_http_date(value).ok(),
            "max-age" => max_age = value.parse::<i64>().ok(),
            "secure" => cookie.secure = true,
            _ => {}
        }
    }

    // Max-Age takes precedence over Expires
    if let Some(secs) = max_age {
        cookie.expires = Some(if secs <= 0 {
            SystemTime::UNIX_EPOCH
        } else {
            now + Duration::from_secs(secs as u64)
        });
    }

    Some(cookie)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/')))
}
