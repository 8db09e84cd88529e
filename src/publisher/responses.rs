use crate::http::response::Response;
use crate::http::status::reason_phrase;
use crate::publisher::PublishError;

/// Renders an application failure as an HTML error page.
pub fn error_page(err: &PublishError) -> Response {
    let mut res = Response::new();
    res.set_status(err.status);

    let title = match reason_phrase(err.status) {
        Some(reason) => format!("{} {}", err.status, reason),
        None => err.status.to_string(),
    };
    let body = format!("<h1>{}</h1>\n<p>{}</p>", title, escape(&err.message)).into_bytes();

    res.set_header("Content-Length", &body.len().to_string());
    res.set_header("Content-Type", "text/html; charset=utf-8");

    res.set_body(body);
    res
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
