//! Parser for raw request bytes handed to the in-process caller.
//!
//! The buffer is read as a command line (`METHOD PATH PROTOCOL`), an
//! RFC-822 style header block ended by the first blank line, and a body
//! taken byte for byte. Lines may end in `\n` or `\r\n`. Only the command
//! line and header block are read as text.

use crate::error::{Error, Result};
use crate::http::codec::split_header;
use crate::http::request::ParsedRequest;

pub fn parse_request(raw: &[u8]) -> Result<ParsedRequest> {
    // Leading whitespace is discarded so callers can indent request literals
    let (command_line, rest) = next_line(raw.trim_ascii_start());
    let command_line = String::from_utf8_lossy(command_line);

    let (method, path, protocol) = parse_command_line(command_line.trim_end())?;
    let (path_info, query_string) = split_path(&url_decode(path));
    let (headers, body) = parse_headers(rest)?;

    Ok(ParsedRequest {
        method: method.to_string(),
        path_info,
        query_string,
        protocol: protocol.to_string(),
        headers,
        body: body.to_vec(),
    })
}

fn next_line(buf: &[u8]) -> (&[u8], &[u8]) {
    match buf.iter().position(|&b| b == b'\n') {
        Some(l) => (&buf[..l], &buf[l + 1..]),
        None => (buf, &buf[buf.len()..]),
    }
}

fn parse_command_line(line: &str) -> Result<(&str, &str, &str)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [method, path, protocol] => Ok((*method, *path, *protocol)),
        _ => Err(Error::MalformedRequest(line.to_string())),
    }
}

/// Percent-decodes a path. `+` is left alone.
fn url_decode(path: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(path.as_bytes())).into_owned()
}

fn split_path(path: &str) -> (String, Option<String>) {
    match path.split_once('?') {
        Some((info, query)) => (info.to_string(), Some(query.to_string())),
        None => (path.to_string(), None),
    }
}

/// Reads header lines up to the first blank line; the rest is the body.
fn parse_headers(mut rest: &[u8]) -> Result<(Vec<(String, String)>, &[u8])> {
    let mut headers = Vec::new();

    while !rest.is_empty() {
        let (line, next) = next_line(rest);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        rest = next;

        if line.is_empty() {
            return Ok((headers, rest));
        }
        headers.push(split_header(&String::from_utf8_lossy(line))?);
    }

    Ok((headers, rest))
}
