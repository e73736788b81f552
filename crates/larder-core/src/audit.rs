// src/audit.rs
use std::io::{self, Write};
use std::sync::Mutex;

/// Serialized audit trail: one CSV line per completed request, flushed as
/// it is written. Production uses the standard error stream; tests inject
/// their own sink.
pub struct AuditLog {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl AuditLog {
    pub fn stderr() -> Self {
        Self::with_sink(Box::new(io::stderr()))
    }

    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Records `METHOD,URI,STATUS,REQUEST_ID`. The method field is the raw
    /// token from the request line, which may be empty when the request
    /// failed before one was read.
    pub fn record(&self, method_token: &str, uri: &str, code: u16, request_id: Option<&str>) {
        let mut sink = self.sink.lock().unwrap();
        let _ = writeln!(
            sink,
            "{},{},{},{}",
            method_token,
            uri,
            code,
            request_id.unwrap_or("0")
        );
        let _ = sink.flush();
    }

    /// Final flush before the process exits.
    pub fn flush(&self) {
        let _ = self.sink.lock().unwrap().flush();
    }
}
