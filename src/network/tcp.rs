use super::error::Error;
use super::{Close, Connect, Connection, Read, Write};
use std::io::{Read as StdRead, Write as StdWrite};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Opens [`TcpConnection`]s to `host:port` remotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector {
    connect_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on connection attempts that take longer than `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    fn resolve(remote: &str) -> Result<Vec<SocketAddr>, Error> {
        let addrs: Vec<SocketAddr> = remote
            .to_socket_addrs()
            .map_err(|_| Error::NameResolution)?
            .collect();
        if addrs.is_empty() {
            return Err(Error::NameResolution);
        }
        Ok(addrs)
    }
}

impl Connect for TcpConnector {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        let mut last_error = Error::ConnectionRefused;
        for addr in Self::resolve(remote)? {
            let attempt = match self.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    log::trace!("Connected to {} ({})", remote, addr);
                    return Ok(TcpConnection { stream });
                }
                Err(e) => {
                    log::debug!("Could not connect to {} ({}): {}", remote, addr, e);
                    last_error = e.into();
                }
            }
        }
        Err(last_error)
    }
}

/// A [`Connection`] over a connected `TcpStream`.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Read for TcpConnection {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.stream.read(buf).map_err(|e| match Error::from(e) {
            Error::Timeout => Error::Timeout,
            Error::ConnectionClosed => Error::ConnectionClosed,
            _ => Error::ReadError,
        })
    }
}

impl Write for TcpConnection {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream.write(buf).map_err(|e| match Error::from(e) {
            Error::Timeout => Error::Timeout,
            Error::ConnectionClosed => Error::ConnectionClosed,
            _ => Error::WriteError,
        })
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for TcpConnection {
    type Error = Error;
    fn close(self) -> Result<(), Self::Error> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // The peer already hung up; nothing left to release.
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Connection for TcpConnection {
    fn set_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self
            .stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| self.stream.set_write_timeout(Some(timeout)))
        {
            log::warn!("Could not apply socket timeout {:?}: {}", timeout, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_unresolvable_host() {
        let mut connector = TcpConnector::new();
        let result = connector.connect("no-such-host.invalid:80");
        assert_eq!(result.err(), Some(Error::NameResolution));
    }

    #[test]
    fn test_missing_port_is_name_resolution() {
        let mut connector = TcpConnector::new();
        let result = connector.connect("localhost");
        assert_eq!(result.err(), Some(Error::NameResolution));
    }

    #[test]
    fn test_connect_read_write_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            stream.write_all(&buf).unwrap();
        });

        let mut connector = TcpConnector::new().with_connect_timeout(Duration::from_secs(2));
        let mut conn = connector.connect(&addr.to_string()).unwrap();
        conn.set_timeout(Duration::from_secs(2));
        conn.write_all(b"ping").unwrap();
        conn.flush().unwrap();

        let mut echoed = [0u8; 4];
        let mut read = 0;
        while read < echoed.len() {
            let n = conn.read(&mut echoed[read..]).unwrap();
            assert!(n > 0);
            read += n;
        }
        assert_eq!(&echoed, b"ping");

        server.join().unwrap();
        conn.close().unwrap();
    }
}
