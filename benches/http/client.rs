use criterion::{BatchSize, Criterion, Throughput};
use jsonstep::http::{Handle, Transport};
use jsonstep::network::error::Error;
use jsonstep::{Client, Method, Request};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    values: Vec<f64>,
}

/// Answers every request with the same JSON document.
#[derive(Debug)]
struct CannedTransport {
    body: Vec<u8>,
}

struct CannedHandle {
    body: Vec<u8>,
}

impl Transport for CannedTransport {
    fn open(&self, _url: &Url) -> Result<Box<dyn Handle>, Error> {
        Ok(Box::new(CannedHandle {
            body: self.body.clone(),
        }))
    }
}

impl Handle for CannedHandle {
    fn set_method(&mut self, _method: &Method) {}
    fn set_header(&mut self, _name: &str, _value: &str) {}
    fn set_timeout(&mut self, _timeout: Duration) {}
    fn set_output(&mut self, _enabled: bool) {}

    fn write(&mut self, _body: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<u8>, Error> {
        Ok(core::mem::take(&mut self.body))
    }

    fn status_code(&self) -> Option<u16> {
        Some(200)
    }

    fn response_headers(&self) -> Vec<(String, String)> {
        vec![("Content-Type".to_string(), "application/json".to_string())]
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}

fn reading(len: usize) -> Reading {
    Reading {
        sensor: "bench-sensor".to_string(),
        values: (0..len).map(|i| i as f64 * 0.5).collect(),
    }
}

fn canned_client(len: usize) -> (Client, usize) {
    let body = serde_json::to_vec(&reading(len)).expect("Failed to encode reading");
    let size = body.len();
    let client = Client::builder()
        .using_transport(Arc::new(CannedTransport { body }))
        .build();
    (client, size)
}

pub fn bench_request_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_derivation");
    let request = Request::builder()
        .url(Url::parse("http://bench.test/readings").expect("Failed to parse URL"))
        .header("Accept", "application/json")
        .query_param("page", "1")
        .build();

    group.bench_function("with_header", |b| {
        b.iter(|| request.with_header("X-Bench", "1"))
    });
    group.bench_function("expanded_url", |b| {
        b.iter(|| request.expanded_url().expect("Failed to expand URL"))
    });
    group.finish();
}

pub fn bench_typed_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed_get");
    for len in [16, 1024] {
        let (client, size) = canned_client(len);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("values_{}", len), |b| {
            b.iter(|| {
                client
                    .go()
                    .get()
                    .expecting::<Reading>()
                    .expect("Failed to select type")
                    .at("http://bench.test/readings")
                    .expect("Failed to get")
            })
        });
    }
    group.finish();
}

pub fn bench_post_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_body");
    let (client, _) = canned_client(4);
    let payload = reading(256);

    group.bench_function("post_body", |b| {
        b.iter_batched_ref(
            || client.go().post(),
            |step| {
                step.body(&payload)
                    .expect("Failed to encode body")
                    .at("http://bench.test/readings")
                    .expect("Failed to post")
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
