// src/handlers.rs
use crate::conn::Connection;
use crate::http::{self, Method, Response};
use crate::io;
use crate::parser::Request;
use crate::server::ServerState;
use crate::syscalls;
use libc::c_int;
use std::ffi::CString;

/// Tagged dispatch on the parsed method.
pub fn handle_request(
    state: &ServerState,
    conn: &Connection,
    req: &Request<'_>,
    body_offset: usize,
) {
    match req.method {
        Method::Get => handle_get(state, conn, req),
        Method::Put => handle_put(state, conn, req, body_offset),
        Method::Unsupported => handle_unsupported(state, conn, req),
    }
}

fn audit(state: &ServerState, req: &Request<'_>, res: &Response) {
    state
        .audit
        .record(req.method_token, req.uri, res.code, req.header("Request-Id"));
}

/// Send a canned response (best effort; the peer may be gone) and audit it.
fn respond(state: &ServerState, conn: &Connection, req: &Request<'_>, res: &Response) {
    let _ = conn.send_response(res);
    audit(state, req, res);
}

/// The file named by a URI, relative to the working directory.
fn file_path(uri: &str) -> std::io::Result<CString> {
    let name = uri.strip_prefix('/').unwrap_or(uri);
    CString::new(name).map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))
}

fn handle_get(state: &ServerState, conn: &Connection, req: &Request<'_>) {
    let Ok(path) = file_path(req.uri) else {
        respond(state, conn, req, &http::INTERNAL_SERVER_ERROR);
        return;
    };

    // Readers exclude writers for this URI, so the size observed below
    // stays authoritative for the whole transfer.
    let lock = state.locks.get(req.uri);
    let _guard = lock.read().unwrap();

    let fd = match syscalls::open_read(&path) {
        Ok(fd) => fd,
        Err(err) => {
            let res = match err.raw_os_error() {
                Some(libc::EACCES) => &http::FORBIDDEN,
                Some(libc::ENOENT) => &http::NOT_FOUND,
                _ => &http::INTERNAL_SERVER_ERROR,
            };
            respond(state, conn, req, res);
            return;
        }
    };

    let res = match syscalls::file_size(fd) {
        Err(_) => {
            unsafe {
                libc::close(fd);
            }
            respond(state, conn, req, &http::INTERNAL_SERVER_ERROR);
            return;
        }
        Ok(size) => match conn.send_file(&http::OK, fd, size) {
            Ok(()) => &http::OK,
            // The peer vanished mid-stream; no further response is possible.
            Err(_) => &http::INTERNAL_SERVER_ERROR,
        },
    };
    unsafe {
        libc::close(fd);
    }
    audit(state, req, res);
}

fn handle_put(state: &ServerState, conn: &Connection, req: &Request<'_>, body_offset: usize) {
    // The parser guarantees a length for PUT; absence is still a 400.
    let Some(content_length) = req.content_length else {
        respond(state, conn, req, &http::BAD_REQUEST);
        return;
    };

    let Ok(path) = file_path(req.uri) else {
        respond(state, conn, req, &http::INTERNAL_SERVER_ERROR);
        return;
    };

    // Stage the whole body before taking any lock, so the write critical
    // section is bounded by local copy time rather than client pace.
    let tmp = match TempFile::create() {
        Ok(tmp) => tmp,
        Err(_) => {
            respond(state, conn, req, &http::INTERNAL_SERVER_ERROR);
            return;
        }
    };
    if conn.recv_body(tmp.fd, body_offset, content_length).is_err() {
        respond(state, conn, req, &http::INTERNAL_SERVER_ERROR);
        return;
    }
    let staged = match syscalls::staged_size(tmp.fd) {
        Ok(n) => n,
        Err(_) => {
            respond(state, conn, req, &http::INTERNAL_SERVER_ERROR);
            return;
        }
    };

    let lock = state.locks.get(req.uri);
    let _guard = lock.write().unwrap();

    // Stable under the write lock: only writers change existence, and
    // writers are serialized.
    let file_existed = syscalls::path_exists(&path);

    let dst = match syscalls::open_trunc(&path) {
        Ok(fd) => fd,
        Err(err) => {
            let res = match err.raw_os_error() {
                Some(libc::EACCES) | Some(libc::EISDIR) | Some(libc::ENOENT) => &http::FORBIDDEN,
                _ => &http::INTERNAL_SERVER_ERROR,
            };
            respond(state, conn, req, res);
            return;
        }
    };

    let res = match io::pass_n(tmp.fd, dst, staged) {
        Ok(_) => {
            if file_existed {
                &http::OK
            } else {
                &http::CREATED
            }
        }
        Err(_) => &http::INTERNAL_SERVER_ERROR,
    };
    unsafe {
        libc::close(dst);
    }
    respond(state, conn, req, res);
}

fn handle_unsupported(state: &ServerState, conn: &Connection, req: &Request<'_>) {
    respond(state, conn, req, &http::NOT_IMPLEMENTED);
}

const TMP_TEMPLATE: &[u8; 23] = b"/tmp/httpserver.XXXXXX\0";

/// Staging file for a PUT body. Closed and unlinked when dropped, which
/// covers every exit path through the handler.
struct TempFile {
    fd: c_int,
    path: [u8; 23],
}

impl TempFile {
    fn create() -> std::io::Result<Self> {
        let mut path = *TMP_TEMPLATE;
        let fd = unsafe { libc::mkstemp(path.as_mut_ptr() as *mut libc::c_char) };
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(Self { fd, path })
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
            libc::unlink(self.path.as_ptr() as *const libc::c_char);
        }
    }
}
