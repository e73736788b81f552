// src/parser.rs
use crate::http::Method;
use arrayvec::ArrayVec;
use memchr::memmem;

pub const MAX_HEADERS: usize = 32;
pub const MAX_METHOD_LEN: usize = 8;
pub const MAX_NAME_LEN: usize = 63;
pub const MAX_FIELD_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The request violates the grammar: answered with 400.
    Malformed,
    /// A well-formed request line naming a version other than HTTP/1.1: 505.
    UnsupportedVersion,
}

/// What the parser could still salvage from a rejected request. The audit
/// line records the raw method token and URI even when the request never
/// became dispatchable; both are empty if the request line never yielded
/// them.
#[derive(Debug)]
pub struct ParseFailure<'a> {
    pub error: ParseError,
    pub method_token: &'a str,
    pub uri: &'a str,
}

/// A request whose head parsed cleanly. Borrows from the connection's
/// receive buffer; the body (if any) starts at the offset returned beside
/// it and is read from the socket by the handler.
#[derive(Debug)]
pub struct Request<'a> {
    pub method: Method,
    pub method_token: &'a str,
    pub uri: &'a str,
    pub headers: ArrayVec<(&'a str, &'a str), MAX_HEADERS>,
    pub content_length: Option<u64>,
}

impl<'a> Request<'a> {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

fn is_uri_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'-'
}

fn valid_method(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_METHOD_LEN
        && token.bytes().all(|b| b.is_ascii_alphabetic())
}

fn valid_uri(uri: &str) -> bool {
    let Some(name) = uri.strip_prefix('/') else {
        return false;
    };
    !name.is_empty() && name.len() <= MAX_NAME_LEN && name.bytes().all(is_uri_char)
}

/// `HTTP/<digit>.<digit>`, nothing more.
fn version_shaped(version: &str) -> bool {
    let v = version.as_bytes();
    v.len() == 8
        && v.starts_with(b"HTTP/")
        && v[5].is_ascii_digit()
        && v[6] == b'.'
        && v[7].is_ascii_digit()
}

fn valid_field_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_FIELD_LEN && name.bytes().all(is_uri_char)
}

fn valid_field_value(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_FIELD_LEN
        && value.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

/// Best-effort extraction of the first two request-line tokens, for audit
/// lines on requests that fail to parse.
fn salvage(buf: &[u8]) -> (&str, &str) {
    let line_end = memmem::find(buf, b"\r\n").unwrap_or(buf.len());
    let line = std::str::from_utf8(&buf[..line_end]).unwrap_or("");
    let mut parts = line.split(' ');
    let method = parts.next().unwrap_or("");
    let uri = parts.next().unwrap_or("");
    (method, uri)
}

/// Parses the `\r\n\r\n`-terminated head at the front of `buf`. On success
/// returns the request and the offset of the first body byte; bytes the
/// head read already pulled in past that offset belong to the body.
pub fn parse_request(buf: &[u8]) -> Result<(Request<'_>, usize), ParseFailure<'_>> {
    let (method_token, uri_token) = salvage(buf);
    let fail = |error| ParseFailure {
        error,
        method_token,
        uri: uri_token,
    };

    let Some(head_end) = memmem::find(buf, b"\r\n\r\n") else {
        return Err(fail(ParseError::Malformed));
    };
    let Ok(head) = std::str::from_utf8(&buf[..head_end]) else {
        return Err(fail(ParseError::Malformed));
    };

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");

    let mut parts = request_line.split(' ');
    let (Some(method_str), Some(uri), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(fail(ParseError::Malformed));
    };

    if !valid_method(method_str) || !valid_uri(uri) || !version_shaped(version) {
        return Err(fail(ParseError::Malformed));
    }
    if version != "HTTP/1.1" {
        return Err(fail(ParseError::UnsupportedVersion));
    }

    let method = Method::from_bytes(method_str.as_bytes());

    let mut headers: ArrayVec<(&str, &str), MAX_HEADERS> = ArrayVec::new();
    for line in lines {
        let Some((name, value)) = line.split_once(": ") else {
            return Err(fail(ParseError::Malformed));
        };
        if !valid_field_name(name) || !valid_field_value(value) {
            return Err(fail(ParseError::Malformed));
        }
        if headers.try_push((name, value)).is_err() {
            return Err(fail(ParseError::Malformed));
        }
    }

    let mut content_length = None;
    if method.has_body() {
        let raw = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| *v);
        let Some(raw) = raw else {
            return Err(fail(ParseError::Malformed));
        };
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(fail(ParseError::Malformed));
        }
        let Ok(n) = raw.parse::<u64>() else {
            return Err(fail(ParseError::Malformed));
        };
        content_length = Some(n);
    }

    Ok((
        Request {
            method,
            method_token: method_str,
            uri,
            headers,
            content_length,
        },
        head_end + 4,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Result<(Request<'_>, usize), ParseFailure<'_>> {
        parse_request(bytes)
    }

    #[test]
    fn parses_a_simple_get() {
        let (req, body_at) = parse(b"GET /notes.txt HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.uri, "/notes.txt");
        assert_eq!(req.method_token, "GET");
        assert!(req.headers.is_empty());
        assert_eq!(body_at, 27);
    }

    #[test]
    fn parses_a_put_with_headers_and_body_offset() {
        let raw = b"PUT /x HTTP/1.1\r\nContent-Length: 5\r\nRequest-Id: 42\r\n\r\nhello";
        let (req, body_at) = parse(raw).unwrap();
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.content_length, Some(5));
        assert_eq!(req.header("request-id"), Some("42"));
        assert_eq!(&raw[body_at..], b"hello");
    }

    #[test]
    fn unknown_method_still_dispatchable() {
        let (req, _) = parse(b"DELETE /x HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::Unsupported);
        assert_eq!(req.method_token, "DELETE");
    }

    #[test]
    fn rejects_other_versions_with_their_own_error() {
        let err = parse(b"GET /x HTTP/1.0\r\n\r\n").unwrap_err();
        assert_eq!(err.error, ParseError::UnsupportedVersion);
        assert_eq!(err.method_token, "GET");
        assert_eq!(err.uri, "/x");

        let err = parse(b"GET /x HTTQ/1.1\r\n\r\n").unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);
    }

    #[test]
    fn enforces_the_uri_grammar() {
        let name_63 = "a".repeat(63);
        let ok = format!("GET /{} HTTP/1.1\r\n\r\n", name_63);
        assert!(parse(ok.as_bytes()).is_ok());

        let name_64 = "a".repeat(64);
        let too_long = format!("GET /{} HTTP/1.1\r\n\r\n", name_64);
        let err = parse(too_long.as_bytes()).unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);

        for bad in [
            "GET noslash HTTP/1.1\r\n\r\n",
            "GET / HTTP/1.1\r\n\r\n",
            "GET /a/b HTTP/1.1\r\n\r\n",
            "GET /sp ace HTTP/1.1\r\n\r\n",
        ] {
            assert!(parse(bad.as_bytes()).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn enforces_the_method_grammar() {
        let err = parse(b"OPTIONSXY /x HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);
        assert_eq!(err.method_token, "OPTIONSXY");

        let err = parse(b"G3T /x HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);
    }

    #[test]
    fn put_requires_a_numeric_content_length() {
        let err = parse(b"PUT /x HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);

        let err = parse(b"PUT /x HTTP/1.1\r\nContent-Length: abc\r\n\r\n").unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);

        let err = parse(b"PUT /x HTTP/1.1\r\nContent-Length: +5\r\n\r\n").unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);

        let (req, _) = parse(b"PUT /x HTTP/1.1\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(req.content_length, Some(0));
    }

    #[test]
    fn rejects_malformed_header_lines() {
        for bad in [
            &b"GET /x HTTP/1.1\r\nNoColon\r\n\r\n"[..],
            &b"GET /x HTTP/1.1\r\nBad Name: v\r\n\r\n"[..],
            &b"GET /x HTTP/1.1\r\nName: \r\n\r\n"[..],
        ] {
            assert!(parse(bad).is_err());
        }
    }

    #[test]
    fn truncated_head_salvages_tokens_for_audit() {
        let err = parse(b"GET /partial HTTP/1.1\r\nHost: x").unwrap_err();
        assert_eq!(err.error, ParseError::Malformed);
        assert_eq!(err.method_token, "GET");
        assert_eq!(err.uri, "/partial");

        let err = parse(b"").unwrap_err();
        assert_eq!(err.method_token, "");
        assert_eq!(err.uri, "");
    }
}
