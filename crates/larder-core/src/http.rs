// src/http.rs

/// Request methods the server dispatches on. Everything outside GET and PUT
/// collapses to `Unsupported` and is answered with 501.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Unsupported,
}

impl Method {
    pub fn from_bytes(b: &[u8]) -> Self {
        match b {
            b"GET" => Method::Get,
            b"PUT" => Method::Put,
            _ => Method::Unsupported,
        }
    }

    /// Whether a request with this method carries a body.
    pub fn has_body(self) -> bool {
        matches!(self, Method::Put)
    }
}

/// A status constant. Handlers select one of these values; they never build
/// responses dynamically. The canonical body is the reason phrase plus a
/// newline, except for a streamed GET where the file contents replace it.
#[derive(Debug, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub reason: &'static str,
    pub body: &'static str,
}

pub const OK: Response = Response {
    code: 200,
    reason: "OK",
    body: "OK\n",
};

pub const CREATED: Response = Response {
    code: 201,
    reason: "Created",
    body: "Created\n",
};

pub const BAD_REQUEST: Response = Response {
    code: 400,
    reason: "Bad Request",
    body: "Bad Request\n",
};

pub const FORBIDDEN: Response = Response {
    code: 403,
    reason: "Forbidden",
    body: "Forbidden\n",
};

pub const NOT_FOUND: Response = Response {
    code: 404,
    reason: "Not Found",
    body: "Not Found\n",
};

pub const INTERNAL_SERVER_ERROR: Response = Response {
    code: 500,
    reason: "Internal Server Error",
    body: "Internal Server Error\n",
};

pub const NOT_IMPLEMENTED: Response = Response {
    code: 501,
    reason: "Not Implemented",
    body: "Not Implemented\n",
};

pub const VERSION_NOT_SUPPORTED: Response = Response {
    code: 505,
    reason: "HTTP Version Not Supported",
    body: "HTTP Version Not Supported\n",
};

impl Response {
    /// Full wire form of a canned response.
    pub fn render(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n\r\n{}",
            self.code,
            self.reason,
            self.body.len(),
            self.body
        )
    }

    /// Header block for a response whose body is streamed separately.
    pub fn render_head(&self, content_length: u64) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n\r\n",
            self.code, self.reason, content_length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_collapses_unknown_tokens() {
        assert_eq!(Method::from_bytes(b"GET"), Method::Get);
        assert_eq!(Method::from_bytes(b"PUT"), Method::Put);
        assert_eq!(Method::from_bytes(b"DELETE"), Method::Unsupported);
        assert_eq!(Method::from_bytes(b"get"), Method::Unsupported);
    }

    #[test]
    fn canned_response_renders_with_its_body() {
        assert_eq!(
            OK.render(),
            "HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nOK\n"
        );
        assert_eq!(
            NOT_FOUND.render(),
            "HTTP/1.1 404 Not Found\r\nContent-Length: 10\r\n\r\nNot Found\n"
        );
    }

    #[test]
    fn streamed_head_carries_the_file_size() {
        assert_eq!(
            OK.render_head(5),
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n"
        );
    }
}
