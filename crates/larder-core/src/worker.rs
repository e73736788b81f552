// src/worker.rs
use crate::conn::Connection;
use crate::handlers;
use crate::http;
use crate::parser::{self, ParseError};
use crate::queue::BoundedQueue;
use crate::server::ServerState;
use libc::c_int;
use std::sync::Arc;

/// One pool thread: pops accepted descriptors off the hand-off queue and
/// drives each to completion. Exits when the queue closes.
pub struct Worker {
    id: usize,
    queue: Arc<BoundedQueue<c_int>>,
    state: Arc<ServerState>,
}

impl Worker {
    pub fn new(id: usize, queue: Arc<BoundedQueue<c_int>>, state: Arc<ServerState>) -> Self {
        Self { id, queue, state }
    }

    pub fn run(&self) {
        tracing::debug!(worker = self.id, "worker started");
        while let Some(fd) = self.queue.pop() {
            self.handle_connection(fd);
        }
        tracing::debug!(worker = self.id, "worker exiting");
    }

    fn handle_connection(&self, fd: c_int) {
        let mut conn = Connection::new(fd);
        if conn.fill_head().is_err() {
            // The peer vanished before sending anything useful.
            return;
        }
        if conn.head().is_empty() {
            // Connected and left without sending a request.
            return;
        }
        match parser::parse_request(conn.head()) {
            Ok((req, body_offset)) => {
                handlers::handle_request(&self.state, &conn, &req, body_offset);
            }
            Err(failure) => {
                let res = match failure.error {
                    ParseError::UnsupportedVersion => &http::VERSION_NOT_SUPPORTED,
                    ParseError::Malformed => &http::BAD_REQUEST,
                };
                let _ = conn.send_response(res);
                self.state
                    .audit
                    .record(failure.method_token, failure.uri, res.code, None);
            }
        }
        // Dropping the connection closes the descriptor, exactly once.
    }
}
