// src/conn.rs
use crate::http::Response;
use crate::io;
use libc::c_int;

/// Receive buffer for the request head. The parser rejects anything whose
/// head does not fit.
pub const HEADER_BUF_SIZE: usize = 2048;

/// One accepted socket, owned by the worker that popped it off the hand-off
/// queue. Dropping the connection closes the descriptor; nothing else may.
pub struct Connection {
    fd: c_int,
    buf: [u8; HEADER_BUF_SIZE],
    filled: usize,
}

impl Connection {
    pub fn new(fd: c_int) -> Self {
        Self {
            fd,
            buf: [0; HEADER_BUF_SIZE],
            filled: 0,
        }
    }

    /// Reads from the socket until the head terminator is buffered, the
    /// buffer is full, or the peer stops sending.
    pub fn fill_head(&mut self) -> std::io::Result<()> {
        self.filled = io::read_until(self.fd, &mut self.buf, b"\r\n\r\n")?;
        Ok(())
    }

    /// The bytes received so far, for the parser.
    pub fn head(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// Streams exactly `content_length` body bytes into `dst`: first
    /// whatever the head read already pulled in past `body_offset`, then
    /// the rest straight off the socket.
    pub fn recv_body(
        &self,
        dst: c_int,
        body_offset: usize,
        content_length: u64,
    ) -> std::io::Result<()> {
        let leftover = &self.buf[body_offset.min(self.filled)..self.filled];
        let take = (leftover.len() as u64).min(content_length) as usize;
        io::write_all(dst, &leftover[..take])?;
        let remaining = content_length - take as u64;
        if remaining > 0 {
            io::pass_n(self.fd, dst, remaining)?;
        }
        Ok(())
    }

    /// Sends a canned response.
    pub fn send_response(&self, res: &Response) -> std::io::Result<()> {
        io::write_all(self.fd, res.render().as_bytes())
    }

    /// Sends a response head announcing `size` bytes, then streams them
    /// from `src`.
    pub fn send_file(&self, res: &Response, src: c_int, size: u64) -> std::io::Result<()> {
        io::write_all(self.fd, res.render_head(size).as_bytes())?;
        io::pass_n(src, self.fd, size)?;
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http;

    fn pipe() -> (c_int, c_int) {
        let mut fds = [0 as c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    fn read_all(fd: c_int) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            let n = unsafe {
                libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
            };
            assert!(n >= 0);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n as usize]);
        }
        out
    }

    #[test]
    fn fill_head_buffers_up_to_the_terminator() {
        let (rx, tx) = pipe();
        io::write_all(tx, b"PUT /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel").unwrap();
        unsafe {
            libc::close(tx);
        }
        let mut conn = Connection::new(rx);
        conn.fill_head().unwrap();
        assert!(conn.head().ends_with(b"hel"));
    }

    #[test]
    fn recv_body_splices_leftover_and_socket_bytes() {
        let (rx, tx) = pipe();
        let (file_rx, file_tx) = pipe();
        let raw = b"PUT /x HTTP/1.1\r\nContent-Length: 10\r\n\r\nhel";
        io::write_all(tx, raw).unwrap();

        let mut conn = Connection::new(rx);
        conn.fill_head().unwrap();
        let body_offset = raw.len() - 3;

        // The rest of the body arrives after the head was read.
        io::write_all(tx, b"lo world").unwrap();
        unsafe {
            libc::close(tx);
        }

        conn.recv_body(file_tx, body_offset, 10).unwrap();
        unsafe {
            libc::close(file_tx);
        }
        assert_eq!(read_all(file_rx), b"hello worl");
        unsafe {
            libc::close(file_rx);
        }
    }

    #[test]
    fn send_response_writes_the_canned_form() {
        let (rx, tx) = pipe();
        let conn = Connection::new(tx);
        conn.send_response(&http::NOT_FOUND).unwrap();
        drop(conn);
        assert_eq!(
            read_all(rx),
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 10\r\n\r\nNot Found\n"
        );
        unsafe {
            libc::close(rx);
        }
    }
}
