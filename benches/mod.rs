use criterion::{criterion_group, criterion_main};

mod http;

criterion_group!(
    benches,
    http::client::bench_request_derivation,
    http::client::bench_typed_get,
    http::client::bench_post_body
);
criterion_main!(benches);
