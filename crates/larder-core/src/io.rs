// src/io.rs
use libc::{c_int, c_void};
use memchr::memmem;
use std::io;

/// Staging buffer for descriptor-to-descriptor copies.
pub const COPY_BUF_SIZE: usize = 4096;

fn read_retry(fd: c_int, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EINTR) {
            return Err(err);
        }
    }
}

/// Fill `buf` by repeated reads until `delim` occurs in the accumulated
/// bytes, the buffer is full, or the peer stops sending. A receive-timeout
/// expiry ends the read with whatever arrived so far, so a silent client
/// shows up as a short (unparsable) head rather than a pinned worker.
pub fn read_until(fd: c_int, buf: &mut [u8], delim: &[u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        if memmem::find(&buf[..filled], delim).is_some() {
            break;
        }
        match read_retry(fd, &mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Write the whole slice, retrying short writes and interruptions.
pub fn write_all(fd: c_int, buf: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < buf.len() {
        let n = unsafe {
            libc::write(
                fd,
                buf[written..].as_ptr() as *const c_void,
                buf.len() - written,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "descriptor accepted no bytes",
            ));
        }
        written += n as usize;
    }
    Ok(())
}

/// Copy exactly `n` bytes from `src` to `dst` through a fixed staging
/// buffer. Premature EOF (or a receive timeout on a socket source) is an
/// error: the caller asked for exactly `n`.
pub fn pass_n(src: c_int, dst: c_int, n: u64) -> io::Result<u64> {
    let mut staging = [0u8; COPY_BUF_SIZE];
    let mut remaining = n;
    while remaining > 0 {
        let want = remaining.min(COPY_BUF_SIZE as u64) as usize;
        let got = read_retry(src, &mut staging[..want])?;
        if got == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source ended before the requested byte count",
            ));
        }
        write_all(dst, &staging[..got])?;
        remaining -= got as u64;
    }
    Ok(n)
}
