// src/syscalls.rs
use crate::error::Result;
use libc::{c_int, c_void, socklen_t};
use std::ffi::CStr;
use std::io;
use std::mem;
use std::ptr;

/// Pending-connection backlog for the listening socket.
const LISTEN_BACKLOG: c_int = 128;

/// Discard `SIGPIPE` process-wide so a broken client socket surfaces as
/// `EPIPE` from `write` instead of killing the process.
pub fn ignore_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

/// Create a blocking TCP server socket bound to `INADDR_ANY:port` with
/// SO_REUSEADDR set, already listening.
pub fn create_listen_socket(port: u16) -> Result<c_int> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let one: c_int = 1;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const _ as *const c_void,
            mem::size_of_val(&one) as socklen_t,
        ) < 0
        {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err.into());
        }

        #[cfg(target_os = "macos")]
        let sin = libc::sockaddr_in {
            sin_len: mem::size_of::<libc::sockaddr_in>() as u8,
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr {
                s_addr: libc::INADDR_ANY.to_be(),
            },
            sin_zero: [0; 8],
        };
        #[cfg(not(target_os = "macos"))]
        let sin = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr {
                s_addr: libc::INADDR_ANY.to_be(),
            },
            sin_zero: [0; 8],
        };
        if libc::bind(
            fd,
            &sin as *const _ as *const libc::sockaddr,
            mem::size_of_val(&sin) as socklen_t,
        ) < 0
        {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err.into());
        }

        if libc::listen(fd, LISTEN_BACKLOG) < 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err.into());
        }

        Ok(fd)
    }
}

/// Apply a receive timeout to a descriptor. On the listening socket this
/// bounds `accept`; on an accepted socket it bounds every `read`.
pub fn set_recv_timeout(fd: c_int, secs: i64) -> io::Result<()> {
    let tv = libc::timeval {
        tv_sec: secs as libc::time_t,
        tv_usec: 0,
    };
    unsafe {
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            &tv as *const _ as *const c_void,
            mem::size_of_val(&tv) as socklen_t,
        ) < 0
        {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Accept one connection. `Ok(None)` covers the transient cases the accept
/// loop simply retries: timeout, interruption, peer reset during handshake.
pub fn accept_connection(listen_fd: c_int) -> Result<Option<c_int>> {
    unsafe {
        let fd = libc::accept(listen_fd, ptr::null_mut(), ptr::null_mut());
        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock
                || matches!(
                    err.raw_os_error(),
                    Some(libc::EINTR) | Some(libc::ECONNABORTED)
                )
            {
                Ok(None)
            } else {
                Err(err.into())
            }
        } else {
            Ok(Some(fd))
        }
    }
}

// ---- File operations ----

pub fn open_read(path: &CStr) -> io::Result<c_int> {
    let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDONLY) };
    if fd < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

pub fn open_trunc(path: &CStr) -> io::Result<c_int> {
    let fd = unsafe {
        libc::open(
            path.as_ptr(),
            libc::O_CREAT | libc::O_WRONLY | libc::O_TRUNC,
            0o600 as libc::c_uint,
        )
    };
    if fd < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

pub fn path_exists(path: &CStr) -> bool {
    unsafe { libc::access(path.as_ptr(), libc::F_OK) == 0 }
}

/// Size of an open file per `fstat`.
pub fn file_size(fd: c_int) -> io::Result<u64> {
    unsafe {
        let mut st: libc::stat = mem::zeroed();
        if libc::fstat(fd, &mut st) < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(st.st_size as u64)
    }
}

/// Measure a staging file by seeking to its end, then rewind to the start
/// so it can be replayed.
pub fn staged_size(fd: c_int) -> io::Result<u64> {
    unsafe {
        let size = libc::lseek(fd, 0, libc::SEEK_END);
        if size < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::lseek(fd, 0, libc::SEEK_SET) < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(size as u64)
    }
}
