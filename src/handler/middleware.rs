//! Request and response processors wrapped around each exchange with the
//! application: content decoding, redirects, refresh and Basic or Digest
//! auth challenges. Cookie and referer handling live with the browser state they
//! read from.

use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::{DeflateDecoder, GzDecoder};
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::handler::Page;
use crate::http::request::Request;
use crate::http::status::is_redirect;

static AUTH_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z-]+)\s*=\s*(?:"([^"]*)"|([^,\s]+))"#).expect("valid regex"));

/// Nonce count sent with every Digest answer; each challenge is answered once.
const DIGEST_NONCE_COUNT: &str = "00000001";

/// Content codings the browser can undo, as named in `Content-Encoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    Deflate,
    Identity,
}

impl ContentEncoding {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Some(ContentEncoding::Gzip),
            "deflate" => Some(ContentEncoding::Deflate),
            "identity" | "" => Some(ContentEncoding::Identity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Identity => "identity",
        }
    }
}

/// Replaces a compressed body with its decoded form and drops the
/// `Content-Encoding` header. Bodies that fail to decode are left as is.
pub fn decode_content(page: &mut Page) {
    let Some(value) = page.headers.get("Content-Encoding").map(str::to_string) else {
        return;
    };
    let encoding = match ContentEncoding::parse(&value) {
        Some(ContentEncoding::Identity) | None => return,
        Some(encoding) => encoding,
    };

    let mut decoded = Vec::new();
    let result = match encoding {
        ContentEncoding::Gzip => GzDecoder::new(page.body.as_slice()).read_to_end(&mut decoded),
        ContentEncoding::Deflate => DeflateDecoder::new(page.body.as_slice()).read_to_end(&mut decoded),
        ContentEncoding::Identity => return,
    };

    match result {
        Ok(_) => {
            debug!(encoding = encoding.as_str(), size = decoded.len(), "decoded response body");
            page.body = decoded;
            page.headers.remove("Content-Encoding");
            page.headers.set("Content-Length", &page.body.len().to_string());
        }
        Err(err) => warn!(encoding = encoding.as_str(), %err, "failed to decode response body"),
    }
}

/// Follow-up request for a redirect response, if any.
///
/// 301, 302 and 303 turn into a bodiless GET; 307 and 308 repeat the
/// original method and body.
pub fn redirect_request(req: &Request, page: &Page) -> Option<Request> {
    if !is_redirect(page.status) {
        return None;
    }
    let location = page.headers.get("Location")?;
    let url = page.url.join(location.trim()).ok()?;

    let mut next = match page.status {
        307 | 308 => {
            let mut next = req.clone();
            next.url = url;
            next
        }
        _ => {
            let mut next = Request::get(url);
            next.headers = req.headers.clone();
            next.headers.remove("Content-Type");
            next.headers.remove("Content-Length");
            next
        }
    };
    next.headers.remove("Cookie");
    next.headers.remove("Host");
    Some(next)
}

/// Target of a `Refresh` header such as `0; url=/next`, when its delay is
/// at most `max_delay` seconds. The delay itself is never waited for; a
/// refresh without a URL reloads the current page.
pub fn refresh_target(page: &Page, max_delay: u64) -> Option<Url> {
    let value = page.headers.get("Refresh")?;
    let (delay, rest) = match value.split_once(';') {
        Some((delay, rest)) => (delay, Some(rest)),
        None => (value, None),
    };
    let delay = delay.trim().parse::<f64>().ok()?;
    if delay > max_delay as f64 {
        return None;
    }

    match rest {
        None => Some(page.url.clone()),
        Some(rest) => {
            let rest = rest.trim();
            let target = match rest.split_once('=') {
                Some((key, target)) if key.trim().eq_ignore_ascii_case("url") => target,
                _ => rest,
            };
            let target = target.trim().trim_matches(|c| c == '"' || c == '\'');
            page.url.join(target).ok()
        }
    }
}

/// `WWW-Authenticate` challenges of a 401 page using `scheme`, as the
/// parameter text after the scheme name.
fn challenges<'a>(page: &'a Page, scheme: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    page.headers
        .get_all("WWW-Authenticate")
        .filter(move |_| page.status == 401)
        .filter_map(move |challenge| {
            let challenge = challenge.trim();
            let (name, params) = challenge.split_once(' ').unwrap_or((challenge, ""));
            name.eq_ignore_ascii_case(scheme).then_some(params)
        })
}

fn auth_param(params: &str, key: &str) -> Option<String> {
    AUTH_PARAM_RE
        .captures_iter(params)
        .find(|c| c[1].eq_ignore_ascii_case(key))
        .map(|c| c.get(2).or(c.get(3)).map_or("", |m| m.as_str()).to_string())
}

/// Realm named by a `WWW-Authenticate: Basic realm="..."` challenge.
pub fn basic_challenge(page: &Page) -> Option<String> {
    challenges(page, "basic")
        .next()
        .map(|params| auth_param(params, "realm").unwrap_or_default())
}

/// Hash variants of RFC 2617 Digest authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Md5Sess,
}

impl DigestAlgorithm {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "MD5" => Some(DigestAlgorithm::Md5),
            "MD5-SESS" => Some(DigestAlgorithm::Md5Sess),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Md5Sess => "MD5-sess",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    /// `auth` when the server offered it; `None` for RFC 2069 style challenges.
    pub qop: Option<String>,
    pub opaque: Option<String>,
    /// `None` when the challenge named no algorithm, which means MD5.
    pub algorithm: Option<DigestAlgorithm>,
}

/// The first Digest challenge on a 401 page that can be answered: it must
/// carry a nonce, use MD5 or MD5-sess, and offer `auth` if it names a qop.
pub fn digest_challenge(page: &Page) -> Option<DigestChallenge> {
    challenges(page, "digest").find_map(|params| {
        let nonce = auth_param(params, "nonce")?;
        let algorithm = match auth_param(params, "algorithm") {
            Some(name) => match DigestAlgorithm::parse(&name) {
                Some(algorithm) => Some(algorithm),
                None => {
                    warn!(algorithm = %name, "unsupported digest algorithm");
                    return None;
                }
            },
            None => None,
        };
        let qop = match auth_param(params, "qop") {
            Some(offered) if offered.split(',').any(|q| q.trim() == "auth") => Some("auth".to_string()),
            Some(offered) => {
                warn!(qop = %offered, "unsupported digest qop");
                return None;
            }
            None => None,
        };

        Some(DigestChallenge {
            realm: auth_param(params, "realm").unwrap_or_default(),
            nonce,
            qop,
            opaque: auth_param(params, "opaque"),
            algorithm,
        })
    })
}

fn md5_hex(data: &str) -> String {
    hex::encode(Md5::digest(data.as_bytes()))
}

/// The `response` value of a Digest answer.
pub fn digest_response(
    challenge: &DigestChallenge,
    method: &str,
    uri: &str,
    user: &str,
    password: &str,
    cnonce: &str,
) -> String {
    let mut ha1 = md5_hex(&format!("{user}:{}:{password}", challenge.realm));
    if challenge.algorithm == Some(DigestAlgorithm::Md5Sess) {
        ha1 = md5_hex(&format!("{ha1}:{}:{cnonce}", challenge.nonce));
    }
    let ha2 = md5_hex(&format!("{method}:{uri}"));

    match &challenge.qop {
        Some(qop) => md5_hex(&format!(
            "{ha1}:{}:{DIGEST_NONCE_COUNT}:{cnonce}:{qop}:{ha2}",
            challenge.nonce
        )),
        None => md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce)),
    }
}

/// Repeats `req` with a Digest answer to `challenge` attached.
pub fn with_digest_auth(
    req: &Request,
    challenge: &DigestChallenge,
    user: &str,
    password: &str,
    cnonce: &str,
) -> Request {
    let uri = req.selector();
    let response = digest_response(challenge, req.method.as_str(), &uri, user, password, cnonce);

    let mut value = format!(
        "Digest username=\"{user}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\"",
        challenge.realm, challenge.nonce
    );
    if let Some(algorithm) = challenge.algorithm {
        value.push_str(&format!(", algorithm=\"{}\"", algorithm.as_str()));
    }
    if let Some(opaque) = &challenge.opaque {
        value.push_str(&format!(", opaque=\"{opaque}\""));
    }
    if let Some(qop) = &challenge.qop {
        value.push_str(&format!(", qop={qop}, nc={DIGEST_NONCE_COUNT}, cnonce=\"{cnonce}\""));
    }

    let mut next = req.clone();
    next.headers.set("Authorization", &value);
    next
}

/// Repeats `req` with Basic credentials attached.
pub fn with_basic_auth(req: &Request, user: &str, password: &str) -> Request {
    let mut next = req.clone();
    let token = STANDARD.encode(format!("{user}:{password}"));
    next.headers.set("Authorization", &format!("Basic {token}"));
    next
}
