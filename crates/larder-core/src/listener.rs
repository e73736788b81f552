// src/listener.rs
use crate::error::Result;
use crate::syscalls;
use libc::c_int;

/// Receive timeout applied to every accepted socket, in seconds. Bounds how
/// long a malformed or silent client can pin a worker.
pub const CLIENT_RECV_TIMEOUT_SECS: i64 = 5;

/// Timeout on the listening socket itself, so the accept loop wakes
/// periodically to observe the shutdown flag.
const ACCEPT_WAKE_SECS: i64 = 1;

/// The listening socket. Dropping it closes the descriptor.
pub struct Listener {
    fd: c_int,
}

impl Listener {
    /// Bind `INADDR_ANY:port` and start listening.
    pub fn bind(port: u16) -> Result<Self> {
        let listener = Self {
            fd: syscalls::create_listen_socket(port)?,
        };
        syscalls::set_recv_timeout(listener.fd, ACCEPT_WAKE_SECS)?;
        Ok(listener)
    }

    /// Accept one connection. The returned descriptor already carries the
    /// client receive timeout. `Ok(None)` means a timeout or transient
    /// failure; the caller just loops.
    pub fn accept(&self) -> Result<Option<c_int>> {
        match syscalls::accept_connection(self.fd)? {
            None => Ok(None),
            Some(fd) => {
                if let Err(err) = syscalls::set_recv_timeout(fd, CLIENT_RECV_TIMEOUT_SECS) {
                    unsafe {
                        libc::close(fd);
                    }
                    return Err(err.into());
                }
                Ok(Some(fd))
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
