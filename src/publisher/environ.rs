use indexmap::IndexMap;
use tracing::trace;

use crate::config::HarnessConfig;
use crate::http::codec::auth_header;
use crate::http::request::ParsedRequest;

/// CGI-style variables handed to the application, built fresh per call.
pub type Environ = IndexMap<String, String>;

/// Headers that keep their bare CGI name instead of gaining `HTTP_`.
const UNPREFIXED: [&str; 2] = ["CONTENT_TYPE", "CONTENT_LENGTH"];

pub fn build_environ(req: &ParsedRequest, cfg: &HarnessConfig) -> Environ {
    let mut env = Environ::new();
    env.insert("HTTP_HOST".to_string(), cfg.host.clone());
    env.insert("HTTP_REFERER".to_string(), cfg.referer.clone());
    env.insert("REQUEST_METHOD".to_string(), req.method.clone());
    env.insert("SERVER_PROTOCOL".to_string(), req.protocol.clone());
    env.insert("PATH_INFO".to_string(), req.path_info.clone());
    if let Some(query) = &req.query_string {
        env.insert("QUERY_STRING".to_string(), query.clone());
    }

    for (name, value) in &req.headers {
        env.insert(cgi_name(name), value.trim_end().to_string());
    }

    if let Some(auth) = env.get_mut("HTTP_AUTHORIZATION") {
        *auth = auth_header(auth);
    }

    trace!(?env, "built dispatch environment");
    env
}

/// `Content-Type` -> `CONTENT_TYPE`, `X-Forwarded-For` -> `HTTP_X_FORWARDED_FOR`.
pub fn cgi_name(header: &str) -> String {
    let name = header.to_uppercase().replace('-', "_");
    if UNPREFIXED.contains(&name.as_str()) {
        name
    } else {
        format!("HTTP_{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::parser::parse_request;

    fn environ(text: &str) -> Environ {
        build_environ(&parse_request(text.as_bytes()).unwrap(), &HarnessConfig::default())
    }

    #[test]
    fn defaults_and_request_line() {
        let env = environ("GET /foo?x=1 HTTP/1.0\n\n");
        assert_eq!(env["HTTP_HOST"], "localhost");
        assert_eq!(env["HTTP_REFERER"], "localhost");
        assert_eq!(env["REQUEST_METHOD"], "GET");
        assert_eq!(env["SERVER_PROTOCOL"], "HTTP/1.0");
        assert_eq!(env["PATH_INFO"], "/foo");
        assert_eq!(env["QUERY_STRING"], "x=1");
    }

    #[test]
    fn query_string_absent_without_question_mark() {
        let env = environ("GET /foo HTTP/1.0\n\n");
        assert!(!env.contains_key("QUERY_STRING"));
    }

    #[test]
    fn headers_become_cgi_variables() {
        let env = environ(
            "POST /f HTTP/1.1\nHost: example.org\nContent-Type: text/plain\nContent-Length: 2\nX-Forwarded-For: 10.0.0.1  \n\nhi",
        );
        assert_eq!(env["HTTP_HOST"], "example.org");
        assert_eq!(env["CONTENT_TYPE"], "text/plain");
        assert_eq!(env["CONTENT_LENGTH"], "2");
        assert_eq!(env["HTTP_X_FORWARDED_FOR"], "10.0.0.1");
        assert!(!env.contains_key("HTTP_CONTENT_TYPE"));
    }

    #[test]
    fn later_duplicate_header_wins() {
        let env = environ("GET / HTTP/1.0\nX-A: 1\nX-A: 2\n\n");
        assert_eq!(env["HTTP_X_A"], "2");
    }

    #[test]
    fn authorization_is_normalized() {
        let env = environ("GET / HTTP/1.0\nAuthorization: Basic mgr:secret\n\n");
        assert_eq!(env["HTTP_AUTHORIZATION"], auth_header("Basic mgr:secret"));
        assert!(env["HTTP_AUTHORIZATION"].starts_with("Basic bWdy"));
    }
}
