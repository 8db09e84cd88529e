#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use inproc_browser::publisher::state::{Principal, Site, set_principal, set_site};
use inproc_browser::{Application, PublishError, PublishRequest, Response};

const HOME: &str = r#"<html><body>
<h1>Portal</h1>
<a href="/items">All items</a>
<a href="login">Log in</a>
<form name="add" action="/add" method="post">
  <input type="text" name="title" value="">
  <input type="submit" name="save" value="Save">
</form>
<form id="search" action="/search">
  <input type="text" name="q" value="default">
</form>
</body></html>"#;

const LOGIN: &str = r#"<html><body>
<form name="login" action="/login" method="post">
  <input type="text" name="user">
  <input type="password" name="password">
  <input type="submit" name="submit" value="Log in">
</form>
</body></html>"#;

const DIGEST_REALM: &str = "Portal";
const DIGEST_NONCE: &str = "5f1c2a";

static DIGEST_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([a-z]+)=(?:"([^"]*)"|([^,\s]+))"#).unwrap());

fn md5_hex(data: &str) -> String {
    hex::encode(Md5::digest(data.as_bytes()))
}

/// Checks an `Authorization: Digest ...` value for admin:secret, the way a
/// server holding the password would.
fn digest_valid(method: &str, header: &str) -> bool {
    let Some(params) = header.strip_prefix("Digest ") else {
        return false;
    };
    let param = |key: &str| {
        DIGEST_PARAM_RE
            .captures_iter(params)
            .find(|c| &c[1] == key)
            .map(|c| c.get(2).or(c.get(3)).map_or("", |m| m.as_str()).to_string())
            .unwrap_or_default()
    };
    if param("username") != "admin" || param("nonce") != DIGEST_NONCE || param("opaque") != "op4que" {
        return false;
    }
    let ha1 = md5_hex(&format!("admin:{DIGEST_REALM}:secret"));
    let ha2 = md5_hex(&format!("{method}:{}", param("uri")));
    let expected = md5_hex(&format!(
        "{ha1}:{DIGEST_NONCE}:{}:{}:{}:{ha2}",
        param("nc"),
        param("cnonce"),
        param("qop")
    ));
    param("response") == expected
}

/// A small site used as the application under test.
#[derive(Default)]
pub struct Portal {
    /// Items visible to requests.
    pub items: RefCell<Vec<String>>,
    /// Items written by the last request, visible after `sync`.
    pending: RefCell<Vec<String>>,
    pub syncs: Cell<usize>,
    pub last_environ: RefCell<Vec<(String, String)>>,
    pub last_body: RefCell<Vec<u8>>,
}

impl Portal {
    pub fn env(&self, key: &str) -> Option<String> {
        self.last_environ
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

fn html(res: &mut Response, body: &str) {
    res.set_header("Content-Type", "text/html; charset=utf-8");
    res.set_body(body);
}

fn form_value(body: &[u8], name: &str) -> Option<String> {
    String::from_utf8_lossy(body).split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| urlencoding::decode(v).map(|v| v.into_owned()).unwrap_or_default())
    })
}

impl Application for Portal {
    fn publish(&self, req: &mut PublishRequest, res: &mut Response) -> Result<(), PublishError> {
        *self.last_environ.borrow_mut() = req.environ.clone().into_iter().collect();
        let method = req.get("REQUEST_METHOD").unwrap_or_default().to_string();
        let path = req.get("PATH_INFO").unwrap_or_default().to_string();
        let cookie = req.get("HTTP_COOKIE").unwrap_or_default().to_string();

        match (method.as_str(), path.as_str()) {
            ("GET", "/") => html(res, HOME),
            ("GET", "/foo") => res.set_body("hello"),
            ("GET", "/login") => html(res, LOGIN),
            ("POST", "/login") => {
                let body = req.read_body().map_err(|e| PublishError::new(e.to_string()))?;
                let user = form_value(&body, "user").unwrap_or_default();
                if form_value(&body, "password").as_deref() != Some("secret") {
                    return Err(PublishError::with_status(403, "bad credentials"));
                }
                res.set_cookie("session", &user, &[("Path", "/")]);
                res.set_status(302);
                res.set_header("Location", "/home");
            }
            ("GET", "/home") => match cookie.strip_prefix("session=") {
                Some(user) => html(res, &format!("<p>Welcome {user}</p>")),
                None => {
                    res.set_status(302);
                    res.set_header("Location", "/login");
                }
            },
            ("GET", "/logout") => {
                res.expire_cookie("session", "/");
                html(res, "<p>Bye</p>");
            }
            ("GET", "/protected") => {
                let expected = format!("Basic {}", STANDARD.encode("admin:secret"));
                if req.get("HTTP_AUTHORIZATION") == Some(expected.as_str()) {
                    res.set_body("top secret");
                } else {
                    res.set_status(401);
                    res.set_header("WWW-Authenticate", "Basic realm=\"Portal\"");
                }
            }
            ("GET", "/digest") => {
                let auth = req.get("HTTP_AUTHORIZATION").unwrap_or_default();
                if digest_valid("GET", auth) {
                    res.set_body("digest secret");
                } else {
                    res.set_status(401);
                    res.set_header(
                        "WWW-Authenticate",
                        &format!("Digest realm=\"{DIGEST_REALM}\", qop=\"auth\", nonce=\"{DIGEST_NONCE}\", opaque=\"op4que\""),
                    );
                }
            }
            ("POST", "/upload") => {
                let body = req.read_body().map_err(|e| PublishError::new(e.to_string()))?;
                res.set_body(format!("received {} bytes", body.len()));
                *self.last_body.borrow_mut() = body;
            }
            ("GET", "/empty") => {
                res.set_header("x-empty", "");
                res.set_body("nothing to see");
            }
            ("POST", "/add") => {
                let body = req.read_body().map_err(|e| PublishError::new(e.to_string()))?;
                let title = form_value(&body, "title").unwrap_or_default();
                self.pending.borrow_mut().push(title);
                res.set_status(303);
                res.set_header("Location", "/items");
            }
            ("GET", "/items") => {
                let items = self.items.borrow().join(",");
                html(res, &format!("<ul>{items}</ul>"));
            }
            ("GET", "/search") => {
                let query = req.get("QUERY_STRING").unwrap_or_default().to_string();
                res.set_body(format!("search: {query}"));
            }
            ("GET", "/gzip") => {
                let mut e = GzEncoder::new(Vec::new(), Compression::default());
                e.write_all(b"inflated body").map_err(|e| PublishError::new(e.to_string()))?;
                res.set_header("Content-Encoding", "gzip");
                res.set_body(e.finish().map_err(|e| PublishError::new(e.to_string()))?);
            }
            ("GET", "/meta-refresh") => html(
                res,
                r#"<html><head><meta http-equiv="refresh" content="0; url=/foo"></head></html>"#,
            ),
            ("GET", "/slow-refresh") => {
                res.set_header("Refresh", "30; url=/foo");
                res.set_body("wait");
            }
            ("GET", "/loop") => {
                res.set_status(302);
                res.set_header("Location", "/loop");
            }
            ("GET", "/weird") => res.set_status(299),
            ("GET", "/error") => return Err(PublishError::new("kaboom")),
            ("GET", "/impersonate") => {
                set_principal(Some(Principal("Manager".into())));
                set_site(Some(Site("/plone".into())));
                return Err(PublishError::new("failed after switching user"));
            }
            _ => return Err(PublishError::with_status(404, format!("{path} not found"))),
        }
        Ok(())
    }

    fn sync(&self) {
        self.syncs.set(self.syncs.get() + 1);
        let pending: Vec<String> = self.pending.borrow_mut().drain(..).collect();
        self.items.borrow_mut().extend(pending);
    }
}
