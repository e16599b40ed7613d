//! Full-pipeline dial retry: first address unreachable, second serves.

mod common;

use std::net::{IpAddr, Ipv4Addr};

use http_body_util::BodyExt;

use resilient_http::{ClientBuilder, ClientConfig, ProxySelector};

use common::{start_http_backend, SequencePicker, StaticResolver};

#[tokio::test]
async fn second_address_serves_after_first_times_out() {
    common::init_tracing();
    let (addr, mut requests) = start_http_backend("survived").await;

    // 192.0.2.1 (TEST-NET-1) swallows the first attempt until the connect
    // timeout fires; the sequenced picker then lands on the backend.
    let resolver = StaticResolver::new(vec![
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
        IpAddr::V4(Ipv4Addr::LOCALHOST),
    ]);

    let client = ClientBuilder::default()
        .config(ClientConfig {
            connect_timeout_ms: 300,
            ..ClientConfig::default()
        })
        .resolver(resolver)
        .address_picker(SequencePicker::new(vec![0, 1]))
        .proxies(ProxySelector::disabled())
        .build()
        .unwrap();

    let response = client
        .get(&format!("http://flaky.test:{}/health", addr.port()))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"survived");

    let captured = requests.recv().await.unwrap();
    assert!(captured.starts_with("GET /health HTTP/1.1\r\n"));
}

#[tokio::test]
async fn both_addresses_dead_fails_the_request() {
    // Two blackhole addresses; both attempts time out and the dial fails.
    let resolver = StaticResolver::new(vec![
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)),
    ]);

    let client = ClientBuilder::default()
        .config(ClientConfig {
            connect_timeout_ms: 200,
            ..ClientConfig::default()
        })
        .resolver(resolver)
        .address_picker(SequencePicker::new(vec![0, 1]))
        .proxies(ProxySelector::disabled())
        .build()
        .unwrap();

    let result = client.get("http://dead.test:9/").await;

    assert!(result.is_err());
}
