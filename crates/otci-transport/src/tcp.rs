//! Blocking TCP transport for consoles bridged to a socket.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use otci_protocol::LineCodec;

use crate::clock::{Clock, SystemClock};
use crate::{Received, Transport, TransportError, TransportResult};

/// Smallest read timeout handed to the socket (zero means "block forever").
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A console reachable over TCP.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    codec: LineCodec,
    clock: SystemClock,
    closed: bool,
}

impl TcpTransport {
    /// Connect to a console bridge.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> TransportResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        log::debug!("TcpTransport: connected to {:?}", stream.peer_addr().ok());
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        TcpTransport {
            stream,
            codec: LineCodec::new(),
            clock: SystemClock::new(),
            closed: false,
        }
    }

    fn check_open(&self) -> TransportResult<()> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, line: &str) -> TransportResult<()> {
        self.check_open()?;
        self.codec.set_last_command(line);
        self.stream.write_all(&LineCodec::encode_command(line))?;
        self.stream.flush()?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> TransportResult<Received> {
        self.check_open()?;
        let deadline = self.clock.now() + timeout;
        let mut buf = [0u8; 512];

        loop {
            if let Some(line) = self.codec.decode_line() {
                return Ok(Received::Line(line));
            }

            let remaining = deadline.saturating_sub(self.clock.now());
            if remaining.is_zero() && !timeout.is_zero() {
                return Ok(Received::Timeout);
            }
            self.stream.set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))?;

            match self.stream.read(&mut buf) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => {
                    self.codec.push(&buf[..n]);
                    self.codec.check_overflow()?;
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if let Some(line) = self.codec.decode_line() {
                        return Ok(Received::Line(line));
                    }
                    return Ok(Received::Timeout);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn advance(&mut self, duration: Duration) -> TransportResult<()> {
        self.check_open()?;
        self.clock.advance(duration);
        Ok(())
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn close(&mut self) -> TransportResult<()> {
        if !self.closed {
            self.closed = true;
            self.codec.clear();
            match self.stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotConnected => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::net::TcpListener;

    #[test]
    fn test_loopback_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let device = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = std::io::BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;

            let mut cmd = Vec::new();
            reader.read_until(b'\r', &mut cmd).unwrap();
            assert_eq!(cmd, b"state\r");

            // echo, payload and terminal line
            writer.write_all(b"> state\r\nleader\r\nDone\r\n").unwrap();
        });

        let mut t = TcpTransport::connect(addr).unwrap();
        t.send("state").unwrap();
        assert_eq!(t.receive(Duration::from_secs(5)).unwrap(), Received::Line("leader".into()));
        assert_eq!(t.receive(Duration::from_secs(5)).unwrap(), Received::Line("Done".into()));

        device.join().unwrap();
        assert_eq!(t.receive(Duration::from_millis(200)).unwrap_err().to_string(), "connection closed by device");
        t.close().unwrap();
        assert!(matches!(t.send("state"), Err(TransportError::Closed)));
    }
}
