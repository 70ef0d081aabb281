#![allow(dead_code)]

use jsonstep::http::{Handle, Transport};
use jsonstep::network::error::Error as NetworkError;
use jsonstep::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Installs the test logger once per test binary.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the mock transport does for one opened handle.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub open_error: Option<NetworkError>,
    pub write_error: Option<NetworkError>,
    pub read_error: Option<NetworkError>,
    pub close_error: Option<NetworkError>,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Script {
    pub fn reply(status_code: u16, content_type: &str, body: &str) -> Self {
        Self {
            status_code,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    pub fn json(status_code: u16, body: &str) -> Self {
        Self::reply(status_code, "application/json; charset=UTF-8", body)
    }

    pub fn failing_open(error: NetworkError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }

    pub fn failing_read(error: NetworkError) -> Self {
        Self {
            read_error: Some(error),
            ..Self::default()
        }
    }

    pub fn failing_close(mut self, error: NetworkError) -> Self {
        self.close_error = Some(error);
        self
    }
}

/// Everything one handle was told before it was closed.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub url: Url,
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub output: bool,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Debug, Default)]
struct State {
    scripts: VecDeque<Script>,
    recorded: Vec<Recorded>,
    opened: usize,
    closed: usize,
}

/// An in-memory [`Transport`] that plays back scripted replies.
///
/// Without a queued script every request gets `200` with an empty body.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(script: Script) -> Self {
        let transport = Self::new();
        transport.push(script);
        transport
    }

    pub fn push(&self, script: Script) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn last(&self) -> Recorded {
        self.recorded().pop().expect("no request was recorded")
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn client(&self) -> Client {
        Client::builder().using_transport(Arc::new(self.clone())).build()
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Handle>, NetworkError> {
        let script = {
            let mut state = self.state.lock().unwrap();
            state.opened += 1;
            state.scripts.pop_front().unwrap_or_else(|| Script {
                status_code: 200,
                ..Script::default()
            })
        };

        if let Some(error) = script.open_error {
            return Err(error);
        }

        Ok(Box::new(MockHandle {
            state: self.state.clone(),
            recorded: Recorded {
                url: url.clone(),
                method: None,
                headers: Vec::new(),
                timeout: None,
                output: false,
                body: Vec::new(),
            },
            script,
            read: false,
        }))
    }
}

struct MockHandle {
    state: Arc<Mutex<State>>,
    recorded: Recorded,
    script: Script,
    read: bool,
}

impl Handle for MockHandle {
    fn set_method(&mut self, method: &Method) {
        self.recorded.method = Some(method.clone());
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.recorded.headers.push((name.to_string(), value.to_string()));
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.recorded.timeout = Some(timeout);
    }

    fn set_output(&mut self, enabled: bool) {
        self.recorded.output = enabled;
    }

    fn write(&mut self, body: &[u8]) -> Result<(), NetworkError> {
        if let Some(error) = self.script.write_error {
            return Err(error);
        }
        self.recorded.body.extend_from_slice(body);
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>, NetworkError> {
        if let Some(error) = self.script.read_error {
            return Err(error);
        }
        self.read = true;
        Ok(self.script.body.clone())
    }

    fn status_code(&self) -> Option<u16> {
        self.read.then_some(self.script.status_code)
    }

    fn response_headers(&self) -> Vec<(String, String)> {
        self.script.headers.clone()
    }

    fn close(self: Box<Self>) -> Result<(), NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.closed += 1;
        state.recorded.push(self.recorded.clone());
        match self.script.close_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThing {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: u64,
    pub name: String,
}

impl NewThing {
    pub fn sample() -> Self {
        Self {
            name: "widget".to_string(),
            tags: vec!["blue".to_string(), "small".to_string()],
        }
    }
}
