//! Header text helpers used on both sides of the in-process transport.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\S+): (.+)$").expect("valid regex"));
static BASIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Basic (.+)?:(.+)?$").expect("valid regex"));

/// Width of the name slice taken from a raw cookie string.
pub const COOKIE_NAME_WIDTH: usize = 10;
/// Offset of the value slice: the name plus the `": "` separator.
pub const COOKIE_VALUE_OFFSET: usize = 12;

/// Splits one `Name: value` header line.
///
/// A single trailing line terminator is ignored. The value keeps everything
/// after the first `": "` that follows a whitespace-free name.
pub fn split_header(line: &str) -> Result<(String, String)> {
    let trimmed = line
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line);

    let caps = HEADER_RE
        .captures(trimmed)
        .ok_or_else(|| Error::HeaderParse(line.to_string()))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

/// Splits one response header line the way a client library reads them:
/// on the first `:`, with the value's leading whitespace dropped. Empty
/// values are allowed; a line without a name or colon is not.
pub fn split_response_header(line: &str) -> Result<(String, String)> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim_start().to_string()))
        }
        _ => Err(Error::HeaderParse(line.to_string())),
    }
}

/// Capitalizes an all-lowercase header name (`content-type` becomes
/// `Content-Type`). Any name containing an uppercase letter is returned as is.
pub fn camel_case(name: &str) -> String {
    if name.to_lowercase() != name {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper_next = c == '-';
    }
    out
}

/// Re-encodes plain `Basic user:password` credentials as base64.
///
/// Either side may be empty. Values that are not plain Basic credentials are
/// returned unchanged.
pub fn auth_header(value: &str) -> String {
    match BASIC_RE.captures(value) {
        Some(caps) => {
            let user = caps.get(1).map_or("", |m| m.as_str());
            let password = caps.get(2).map_or("", |m| m.as_str());
            format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
        }
        None => value.to_string(),
    }
}

/// Splits a raw `Set-Cookie: ...` string from
/// [`Response::cookie_list`](crate::http::response::Response::cookie_list)
/// into a header pair by fixed character offsets.
pub fn split_cookie(raw: &str) -> (String, String) {
    let name = raw.chars().take(COOKIE_NAME_WIDTH).collect();
    let value = raw.chars().skip(COOKIE_VALUE_OFFSET).collect();
    (name, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Host: localhost", "Host", "localhost")]
    #[test_case("Content-Type: text/html\r\n", "Content-Type", "text/html")]
    #[test_case("X-Pair: a: b", "X-Pair", "a: b")]
    #[test_case("Cookie: a=1; b=2\n", "Cookie", "a=1; b=2")]
    fn splits_valid_lines(line: &str, name: &str, value: &str) {
        assert_eq!(split_header(line).unwrap(), (name.to_string(), value.to_string()));
    }

    #[test_case("no colon here")]
    #[test_case("Empty: ")]
    #[test_case("Missing:space")]
    #[test_case(" Indented: value")]
    #[test_case("")]
    fn rejects_invalid_lines(line: &str) {
        assert!(matches!(split_header(line), Err(Error::HeaderParse(_))));
    }

    #[test_case("X-Empty: ", "X-Empty", "")]
    #[test_case("X-Empty:", "X-Empty", "")]
    #[test_case("Location:/home", "Location", "/home")]
    #[test_case("Refresh: 0; url=http://h/x", "Refresh", "0; url=http://h/x")]
    fn response_lines_are_read_leniently(line: &str, name: &str, value: &str) {
        assert_eq!(split_response_header(line).unwrap(), (name.to_string(), value.to_string()));
    }

    #[test_case("no colon here")]
    #[test_case(": value")]
    fn response_lines_still_need_a_name(line: &str) {
        assert!(matches!(split_response_header(line), Err(Error::HeaderParse(_))));
    }

    #[test]
    fn header_block_keeps_duplicates_and_order() {
        let block = "Accept: text/html\nX-A: 1\nAccept: */*\n";
        let pairs: Vec<_> = block.lines().map(|l| split_header(l).unwrap()).collect();
        assert_eq!(
            pairs,
            vec![
                ("Accept".to_string(), "text/html".to_string()),
                ("X-A".to_string(), "1".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
            ]
        );
    }

    #[test_case("content-type", "Content-Type")]
    #[test_case("x-foo-bar", "X-Foo-Bar")]
    #[test_case("etag", "Etag")]
    #[test_case("X-custom", "X-custom")]
    #[test_case("WWW-Authenticate", "WWW-Authenticate")]
    #[test_case("trailing-", "Trailing-")]
    fn camel_cases_lowercase_names(name: &str, expected: &str) {
        assert_eq!(camel_case(name), expected);
    }

    #[test]
    fn camel_case_is_idempotent() {
        for name in ["content-type", "x-a-b", "ALLCAPS", "mixed-Case", "123"] {
            let once = camel_case(name);
            assert_eq!(camel_case(&once), once);
        }
    }

    #[test]
    fn auth_header_encodes_credentials() {
        assert_eq!(auth_header("Basic u:p"), "Basic dTpw");
        assert_eq!(auth_header("Basic mgr:mgrpw"), format!("Basic {}", STANDARD.encode("mgr:mgrpw")));
        assert_eq!(auth_header("Basic :p"), "Basic OnA=");
        assert_eq!(auth_header("Basic u:"), "Basic dTo=");
        assert_eq!(auth_header("Basic :"), "Basic Og==");
    }

    #[test]
    fn auth_header_never_adds_newline() {
        let long = format!("Basic {}:{}", "u".repeat(60), "p".repeat(60));
        assert!(!auth_header(&long).contains('\n'));
    }

    #[test_case("Basic dTpw")]
    #[test_case("Bearer token")]
    #[test_case("Digest username=\"u\"")]
    fn auth_header_passes_through(value: &str) {
        assert_eq!(auth_header(value), value);
    }

    #[test]
    fn cookie_slicing_follows_fixed_offsets() {
        let (name, value) = split_cookie("Set-Cookie: sid=\"abc\"; Path=/");
        assert_eq!(name, "Set-Cookie");
        assert_eq!(value, "sid=\"abc\"; Path=/");
        assert_eq!(split_cookie("short"), ("short".to_string(), String::new()));
    }
}
