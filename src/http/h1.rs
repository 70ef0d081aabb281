//! A plain HTTP/1.1 [`Transport`] over any [`Connect`]or.
//!
//! Each handle owns one connection for one request. The request is sent with
//! `Connection: close` and the response is read until the body is complete
//! (by `Content-Length`, by the terminating chunk of a `chunked` body, or by
//! the peer closing the connection).
//!
//! Only `http` URLs are accepted. An `https` URL fails to open with
//! [`Error::InvalidAddress`].

use super::request::Method;
use super::transport::{Handle, Transport};
use crate::network::error::Error;
use crate::network::tcp::TcpConnector;
use crate::network::{Close, Connect, Connection, Read, Write};
use core::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::{Position, Url};

const READ_CHUNK: usize = 4096;
const DEFAULT_USER_AGENT: &str = concat!("jsonstep/", env!("CARGO_PKG_VERSION"));

/// Speaks HTTP/1.1 over connections opened by `N`.
pub struct Http1Transport<N> {
    connector: Mutex<N>,
}

impl<N> Http1Transport<N> {
    pub fn new(connector: N) -> Self {
        Self {
            connector: Mutex::new(connector),
        }
    }

    pub fn into_connector(self) -> N {
        self.connector.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Http1Transport<TcpConnector> {
    fn default() -> Self {
        Self::new(TcpConnector::new())
    }
}

impl<N> fmt::Debug for Http1Transport<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http1Transport")
            .field("connector", &core::any::type_name::<N>())
            .finish()
    }
}

impl<N, C> Transport for Http1Transport<N>
where
    N: Connect<Connection = C, Error = Error> + Send,
    C: Connection + Read<Error = Error> + Write<Error = Error> + Close<Error = Error> + Send + 'static,
{
    fn open(&self, url: &Url) -> Result<Box<dyn Handle>, Error> {
        if url.scheme() != "http" {
            log::debug!("Unsupported scheme for HTTP/1.1 transport: {}", url);
            return Err(Error::InvalidAddress);
        }
        let host = url.host_str().ok_or(Error::InvalidAddress)?;
        let port = url.port_or_known_default().ok_or(Error::InvalidAddress)?;

        let remote = format!("{}:{}", host, port);
        let connection = self
            .connector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .connect(&remote)?;

        let host_header = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Box::new(Http1Handle {
            connection: Some(connection),
            target: url[Position::BeforePath..Position::AfterQuery].to_string(),
            host: host_header,
            method: Method::Get,
            headers: Vec::new(),
            output: false,
            body: Vec::new(),
            sent: false,
            status_code: None,
            response_headers: Vec::new(),
        }))
    }
}

struct Http1Handle<C> {
    connection: Option<C>,
    target: String,
    host: String,
    method: Method,
    headers: Vec<(String, String)>,
    output: bool,
    body: Vec<u8>,
    sent: bool,
    status_code: Option<u16>,
    response_headers: Vec<(String, String)>,
}

impl<C> Http1Handle<C>
where
    C: Connection + Read<Error = Error> + Write<Error = Error> + Close<Error = Error>,
{
    fn encode_request(&self) -> Vec<u8> {
        let mut request_buf: Vec<u8> = Vec::with_capacity(256 + self.body.len());

        // Request line
        request_buf.extend_from_slice(self.method.as_str().as_bytes());
        request_buf.push(b' ');
        request_buf.extend_from_slice(self.target.as_bytes());
        request_buf.extend_from_slice(b" HTTP/1.1\r\n");

        // Headers
        let mut has_host = false;
        let mut has_user_agent = false;
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Host") {
                has_host = true;
            }
            if name.eq_ignore_ascii_case("User-Agent") {
                has_user_agent = true;
            }
            if name.eq_ignore_ascii_case("Content-Length") || name.eq_ignore_ascii_case("Connection") {
                continue;
            }
            push_header(&mut request_buf, name, value);
        }
        if !has_host {
            push_header(&mut request_buf, "Host", &self.host);
        }
        if !has_user_agent {
            push_header(&mut request_buf, "User-Agent", DEFAULT_USER_AGENT);
        }
        push_header(&mut request_buf, "Connection", "close");

        // Body
        if self.output {
            push_header(&mut request_buf, "Content-Length", &self.body.len().to_string());
            request_buf.extend_from_slice(b"\r\n");
            request_buf.extend_from_slice(&self.body);
        } else {
            request_buf.extend_from_slice(b"\r\n");
        }

        request_buf
    }

    fn exchange(&mut self) -> Result<Vec<u8>, Error> {
        let request_buf = self.encode_request();
        let expects_body = self.method != Method::Head;
        let connection = self.connection.as_mut().ok_or(Error::NotOpen)?;

        // --- Send Request ---
        connection.write_all(&request_buf)?;
        connection.flush()?;

        // --- Receive Response ---
        let mut response_buf = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match connection.read(&mut chunk)? {
                0 => break,
                n => {
                    response_buf.extend_from_slice(&chunk[..n]);
                    if is_complete(&response_buf, expects_body) {
                        break;
                    }
                }
            }
        }
        if response_buf.is_empty() {
            return Err(Error::ConnectionClosed);
        }

        // --- Parse Response ---
        let parsed = parse_response(&response_buf, expects_body)?;
        self.status_code = Some(parsed.status_code);
        self.response_headers = parsed.headers;
        Ok(parsed.body)
    }
}

impl<C> Handle for Http1Handle<C>
where
    C: Connection + Read<Error = Error> + Write<Error = Error> + Close<Error = Error> + Send,
{
    fn set_method(&mut self, method: &Method) {
        self.method = method.clone();
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn set_timeout(&mut self, timeout: Duration) {
        if let Some(connection) = self.connection.as_mut() {
            connection.set_timeout(timeout);
        }
    }

    fn set_output(&mut self, enabled: bool) {
        self.output = enabled;
    }

    fn write(&mut self, body: &[u8]) -> Result<(), Error> {
        if !self.output || self.sent {
            return Err(Error::WriteError);
        }
        self.body.extend_from_slice(body);
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>, Error> {
        if self.sent {
            return Err(Error::ProtocolError);
        }
        self.sent = true;
        self.exchange()
    }

    fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    fn response_headers(&self) -> Vec<(String, String)> {
        self.response_headers.clone()
    }

    fn close(mut self: Box<Self>) -> Result<(), Error> {
        match self.connection.take() {
            Some(connection) => connection.close(),
            None => Ok(()),
        }
    }
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

/// A parsed HTTP/1.1 response.
#[derive(Debug, PartialEq)]
struct Parsed {
    status_code: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

enum Framing {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

fn framing(status_code: u16, headers: &[(String, String)], expects_body: bool) -> Framing {
    if !expects_body || (100..200).contains(&status_code) || status_code == 204 || status_code == 304 {
        return Framing::Empty;
    }
    let header = |name: &str| {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    };
    if header("Transfer-Encoding").is_some_and(|v| v.to_ascii_lowercase().contains("chunked")) {
        return Framing::Chunked;
    }
    match header("Content-Length").and_then(|v| v.parse::<usize>().ok()) {
        Some(len) => Framing::Length(len),
        None => Framing::UntilClose,
    }
}

fn parse_head(header_data: &[u8]) -> Result<(u16, Vec<(String, String)>), Error> {
    let header_str = core::str::from_utf8(header_data).map_err(|_| Error::ProtocolError)?;
    let mut lines = header_str.lines();

    // Parse status line
    let status_line = lines.next().ok_or(Error::ProtocolError)?;
    let mut status_parts = status_line.splitn(3, ' ');
    status_parts.next(); // Skip HTTP version
    let status_code = status_parts
        .next()
        .ok_or(Error::ProtocolError)?
        .parse::<u16>()
        .map_err(|_| Error::ProtocolError)?;

    // Parse headers
    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, ':');
        let name = parts.next().ok_or(Error::ProtocolError)?.trim();
        let value = parts.next().ok_or(Error::ProtocolError)?.trim();
        headers.push((name.to_string(), value.to_string()));
    }
    Ok((status_code, headers))
}

/// Whether `data` already holds a whole response, so reading can stop
/// without waiting for the peer to close.
fn is_complete(data: &[u8], expects_body: bool) -> bool {
    let Some(header_end) = find_slice(data, b"\r\n\r\n") else {
        return false;
    };
    let Ok((status_code, headers)) = parse_head(&data[..header_end]) else {
        return false;
    };
    let body = &data[header_end + 4..];
    match framing(status_code, &headers, expects_body) {
        Framing::Empty => true,
        Framing::Length(len) => body.len() >= len,
        // A malformed chunk stream is complete too; parsing reports it.
        Framing::Chunked => !matches!(decode_chunked(body), Err(Error::ConnectionClosed)),
        Framing::UntilClose => false,
    }
}

fn parse_response(data: &[u8], expects_body: bool) -> Result<Parsed, Error> {
    // Find where headers end and body begins
    let header_end = find_slice(data, b"\r\n\r\n").ok_or(Error::ProtocolError)?;
    let (status_code, headers) = parse_head(&data[..header_end])?;
    let body_data = &data[header_end + 4..];

    let body = match framing(status_code, &headers, expects_body) {
        Framing::Empty => Vec::new(),
        Framing::Length(len) => {
            if body_data.len() < len {
                // Prematurely closed
                return Err(Error::ConnectionClosed);
            }
            body_data[..len].to_vec()
        }
        Framing::Chunked => decode_chunked(body_data)?,
        Framing::UntilClose => body_data.to_vec(),
    };

    Ok(Parsed {
        status_code,
        headers,
        body,
    })
}

/// Decodes a `chunked` body. `ConnectionClosed` means more data is needed.
fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    loop {
        let line_end = find_slice(data, b"\r\n").ok_or(Error::ConnectionClosed)?;
        let size_line = core::str::from_utf8(&data[..line_end]).map_err(|_| Error::ProtocolError)?;
        let size_str = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_str, 16).map_err(|_| Error::ProtocolError)?;
        data = &data[line_end + 2..];

        if size == 0 {
            // Trailers, if any, end with an empty line.
            if data.starts_with(b"\r\n") || find_slice(data, b"\r\n\r\n").is_some() {
                return Ok(body);
            }
            return Err(Error::ConnectionClosed);
        }
        let end = size.checked_add(2).ok_or(Error::ProtocolError)?;
        if data.len() < end {
            return Err(Error::ConnectionClosed);
        }
        body.extend_from_slice(&data[..size]);
        if &data[size..end] != b"\r\n" {
            return Err(Error::ProtocolError);
        }
        data = &data[end..];
    }
}

/// Finds the first occurrence of a slice in another slice and returns its starting position.
fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_length() {
        let raw = b"HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"a\":1}";
        let parsed = parse_response(raw, true).unwrap();
        assert_eq!(parsed.status_code, 201);
        assert_eq!(
            parsed.headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Content-Length".to_string(), "7".to_string()),
            ]
        );
        assert_eq!(parsed.body, b"{\"a\":1}");
        assert!(is_complete(raw, true));
    }

    #[test]
    fn test_parse_truncated_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
        assert!(!is_complete(raw, true));
        assert_eq!(parse_response(raw, true), Err(Error::ConnectionClosed));
    }

    #[test]
    fn test_parse_chunked() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\n";
        assert!(is_complete(raw, true));
        let parsed = parse_response(raw, true).unwrap();
        assert_eq!(parsed.body, b"hello world");
    }

    #[test]
    fn test_chunk_data_ending_like_terminator() {
        let head = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
        let partial = [&head[..], &b"5\r\nab0\r\n\r\n"[..]].concat();
        assert!(!is_complete(&partial, true));

        let full = [&partial[..], &b"0\r\n\r\n"[..]].concat();
        assert!(is_complete(&full, true));
        assert_eq!(parse_response(&full, true).unwrap().body, b"ab0\r\n");
    }

    #[test]
    fn test_chunked_needs_final_empty_line() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nhi\r\n0\r\n";
        assert!(!is_complete(raw, true));
        assert_eq!(parse_response(raw, true), Err(Error::ConnectionClosed));

        let trailer = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nhi\r\n0\r\nX-Sum: 1\r\n\r\n";
        assert!(is_complete(trailer, true));
        assert_eq!(parse_response(trailer, true).unwrap().body, b"hi");
    }

    #[test]
    fn test_oversized_chunk_size() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nab\r\n0\r\n\r\n";
        assert!(is_complete(raw, true));
        assert_eq!(parse_response(raw, true), Err(Error::ProtocolError));

        let too_wide = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1ffffffffffffffff\r\nab\r\n";
        assert_eq!(parse_response(too_wide, true), Err(Error::ProtocolError));
    }

    #[test]
    fn test_parse_until_close() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\nstreamed";
        assert!(!is_complete(raw, true));
        assert_eq!(parse_response(raw, true).unwrap().body, b"streamed");
    }

    #[test]
    fn test_parse_no_content_and_head() {
        let raw = b"HTTP/1.1 204 No Content\r\n\r\n";
        assert!(is_complete(raw, true));
        assert!(parse_response(raw, true).unwrap().body.is_empty());

        let head = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n";
        assert!(is_complete(head, false));
        assert!(parse_response(head, false).unwrap().body.is_empty());
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_response(b"nonsense", true), Err(Error::ProtocolError));
        assert_eq!(
            parse_response(b"HTTP/1.1 abc OK\r\n\r\n", true),
            Err(Error::ProtocolError)
        );
    }

    #[test]
    fn test_find_slice() {
        assert_eq!(find_slice(b"abc\r\n\r\ndef", b"\r\n\r\n"), Some(3));
        assert_eq!(find_slice(b"abc", b"\r\n"), None);
    }
}
