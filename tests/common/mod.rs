#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
};
use color_eyre::Result;
use ppba_alpaca::{
    actions::Reply,
    config::Config,
    gateway::Gateway,
    logging,
    mock::{MockBoxBuilder, MockBoxHandle},
    registry::Registry,
    server,
};
use tower::ServiceExt;
use tracing::Level;

/// Short enough to keep tests fast, long enough for a busy CI machine.
pub const TIMEOUT: Duration = Duration::from_millis(500);

pub fn config_for(device_numbers: &[u32]) -> Config {
    let mut config = Config {
        device_number: device_numbers[0],
        additional_device_numbers: device_numbers[1..].to_vec(),
        ..Default::default()
    };
    config.server.address = "127.0.0.1".into();
    config.server.port = 0;
    config.serial.read_timeout_ms = TIMEOUT.as_millis() as u64;
    config.serial.write_timeout_ms = TIMEOUT.as_millis() as u64;
    config.discovery.enabled = false;

    config
}

/// A gateway exposing the given relay channels of a mock box.
pub async fn start_gateway(
    mock: MockBoxBuilder,
    device_numbers: &[u32],
) -> Result<(Gateway, MockBoxHandle)> {
    logging::init(Level::DEBUG, None).await;

    let (link, handle) = mock.build();
    let gateway = Gateway::new(link, &config_for(device_numbers)).await?;

    Ok((gateway, handle))
}

/// Send a request through the HTTP application, without a socket.
pub async fn request(registry: &Registry, method: Method, uri: &str) -> Result<(StatusCode, Reply)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())?;

    let response = server::app(registry.clone()).oneshot(request).await?;

    let status = response.status();
    assert_eq!(
        response.headers().get(CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(&b"application/json"[..])
    );

    let mut body = response.into_body();
    let mut bytes = vec![];
    while let Some(chunk) = body.data().await {
        bytes.extend_from_slice(&chunk?);
    }

    Ok((status, serde_json::from_slice(&bytes)?))
}

pub async fn get(registry: &Registry, uri: &str) -> Result<(StatusCode, Reply)> {
    request(registry, Method::GET, uri).await
}

pub fn value(value: bool) -> (StatusCode, Reply) {
    (StatusCode::OK, Reply::Value(value))
}

pub fn error(status: StatusCode, message: &str) -> (StatusCode, Reply) {
    (status, Reply::Error(message.into()))
}
