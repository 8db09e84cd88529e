mod common;

use std::rc::Rc;

use common::Portal;
use inproc_browser::net::connection::{HttpConnection, PublisherConnection};
use inproc_browser::publisher::state::{Principal, Site, current_principal, current_site, set_principal, set_site};
use inproc_browser::{Caller, Error, HarnessConfig};

fn connection() -> (Rc<Portal>, PublisherConnection<Portal>) {
    let app = Rc::new(Portal::default());
    let caller = Caller::with_config(Rc::clone(&app), HarnessConfig::default());
    (app, PublisherConnection::new(caller, "localhost"))
}

#[test]
fn get_with_query_string_end_to_end() {
    let (app, mut conn) = connection();
    conn.send(b"GET /foo?x=1 HTTP/1.0\nHost: localhost\n\n").unwrap();

    assert_eq!(app.env("PATH_INFO").as_deref(), Some("/foo"));
    assert_eq!(app.env("QUERY_STRING").as_deref(), Some("x=1"));
    assert_eq!(app.env("HTTP_HOST").as_deref(), Some("localhost"));
    assert_eq!(app.env("SERVER_PROTOCOL").as_deref(), Some("HTTP/1.0"));

    let wire = conn.get_response().unwrap();
    assert!(wire.headers.starts_with("Status: 200 OK"));
    assert_eq!(wire.content, b"hello");

    let bytes = wire.to_bytes();
    assert!(bytes.starts_with(b"Status: 200 OK"));
    assert!(bytes.ends_with(b"\r\n\r\nhello"));
}

#[test]
fn indented_request_text_is_accepted() {
    let (app, mut conn) = connection();
    conn.send(
        b"
        GET /foo HTTP/1.1
Referer: http://localhost/previous

",
    )
    .unwrap();
    assert_eq!(app.env("HTTP_REFERER").as_deref(), Some("http://localhost/previous"));
    assert_eq!(conn.get_response().unwrap().status, 200);
}

#[test]
fn application_errors_render_as_error_pages() {
    let (_, mut conn) = connection();
    conn.send(b"GET /error HTTP/1.0\n\n").unwrap();
    let wire = conn.get_response().unwrap();
    assert_eq!(wire.status, 500);
    assert!(wire.headers.starts_with("Status: 500 Internal Server Error\r\n"));
    assert!(String::from_utf8_lossy(&wire.content).contains("kaboom"));

    conn.send(b"GET /nowhere HTTP/1.0\n\n").unwrap();
    assert_eq!(conn.get_response().unwrap().reason, "Not Found");
}

#[test]
fn debug_mode_raises_application_errors() {
    let (app, _) = connection();
    let caller = Caller::with_config(Rc::clone(&app), HarnessConfig::default());
    let err = caller.call(b"GET /error HTTP/1.0\n\n", false).unwrap_err();
    assert!(matches!(err, Error::Publish(ref e) if e.message == "kaboom"));
}

#[test]
fn ambient_state_is_restored_around_each_call() {
    set_principal(Some(Principal("Anonymous".into())));
    set_site(Some(Site("/".into())));

    let (app, mut conn) = connection();
    conn.send(b"GET /impersonate HTTP/1.0\n\n").unwrap();
    assert_eq!(current_principal(), Some(Principal("Anonymous".into())));
    assert_eq!(current_site(), Some(Site("/".into())));

    let caller = Caller::with_config(app, HarnessConfig::default());
    assert!(caller.call(b"GET /impersonate HTTP/1.0\n\n", false).is_err());
    assert_eq!(current_principal(), Some(Principal("Anonymous".into())));
    assert_eq!(current_site(), Some(Site("/".into())));
}

#[test]
fn storage_is_synced_between_calls() {
    let (app, mut conn) = connection();
    conn.send(b"POST /add HTTP/1.0\nContent-Type: application/x-www-form-urlencoded\nContent-Length: 10\n\ntitle=Note")
        .unwrap();
    assert_eq!(app.env("CONTENT_LENGTH").as_deref(), Some("10"));
    assert_eq!(conn.get_response().unwrap().status, 303);

    conn.send(b"GET /items HTTP/1.0\n\n").unwrap();
    assert_eq!(conn.get_response().unwrap().content, b"<ul>Note</ul>");
    assert_eq!(app.syncs.get(), 2);
}

#[test]
fn response_headers_and_cookies_are_sorted_after_status() {
    let (_, mut conn) = connection();
    conn.send(b"POST /login HTTP/1.0\n\nuser=admin&password=secret").unwrap();
    let wire = conn.get_response().unwrap();
    assert_eq!(
        wire.headers,
        "Status: 302 Moved Temporarily\r\nLocation: /home\r\nSet-Cookie: session=\"admin\"; Path=/"
    );
}

#[test]
fn basic_credentials_are_encoded_for_the_application() {
    let (_, mut conn) = connection();
    conn.send(b"GET /protected HTTP/1.0\nAuthorization: Basic admin:secret\n\n").unwrap();
    assert_eq!(conn.get_response().unwrap().content, b"top secret");
}

#[test]
fn unknown_status_cannot_be_formatted() {
    let (_, mut conn) = connection();
    conn.send(b"GET /weird HTTP/1.0\n\n").unwrap();
    assert!(matches!(conn.get_response(), Err(Error::UnknownStatus(299))));
}

#[test]
fn malformed_requests_are_rejected() {
    let (_, mut conn) = connection();
    assert!(matches!(conn.send(b"GET\n\n"), Err(Error::MalformedRequest(_))));
    assert!(matches!(
        conn.send(b"GET / HTTP/1.0\nbroken header\n\n"),
        Err(Error::HeaderParse(_))
    ));
}

#[test]
fn binary_request_bodies_are_passed_through() {
    let (app, mut conn) = connection();
    let mut raw = b"POST /upload HTTP/1.0\nContent-Type: application/octet-stream\nContent-Length: 4\n\n".to_vec();
    raw.extend_from_slice(&[0x89, b'P', 0xff, 0x00]);
    conn.send(&raw).unwrap();
    assert_eq!(*app.last_body.borrow(), [0x89, b'P', 0xff, 0x00]);
    assert_eq!(conn.get_response().unwrap().content, b"received 4 bytes");
}

#[test]
fn failed_calls_leave_no_stale_response() {
    let (_, mut conn) = connection();
    conn.send(b"GET /foo HTTP/1.0\n\n").unwrap();
    assert!(conn.send(b"GET /foo\n\n").is_err());
    assert!(matches!(conn.get_response(), Err(Error::NoResponse)));
}
