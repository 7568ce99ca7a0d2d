mod common;

use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};
use color_eyre::Result;
use pretty_assertions::assert_eq;
use ppba_alpaca::{
    actions::Reply,
    mock::{MockBoxBuilder, MockReply},
};

use common::*;

#[tokio::test]
async fn on_with_ack_is_true() -> Result<()> {
    let (gateway, mock) = start_gateway(MockBoxBuilder::new(), &[0, 1]).await?;
    let registry = gateway.registry();

    assert_eq!(get(&registry, "/switch/0/on").await?, value(true));
    assert_eq!(get(&registry, "/switch/1/on").await?, value(true));

    assert_eq!(mock.received().await, vec!["O0#", "O1#"]);

    Ok(())
}

#[tokio::test]
async fn off_without_ack_is_false_not_an_error() -> Result<()> {
    let mock = MockBoxBuilder::new()
        .on("F2#", MockReply::line("PPBA_FAIL"))
        .on("F3#", MockReply::line(""))
        .on("F4#", MockReply::line("ppba_ok"));
    let (gateway, _mock) = start_gateway(mock, &[2, 3, 4]).await?;
    let registry = gateway.registry();

    for n in [2, 3, 4] {
        assert_eq!(get(&registry, &format!("/switch/{n}/off")).await?, value(false));
    }

    Ok(())
}

#[tokio::test]
async fn init_pings() -> Result<()> {
    let (gateway, mock) = start_gateway(MockBoxBuilder::new(), &[0]).await?;

    assert_eq!(get(&gateway.registry(), "/switch/0/init").await?, value(true));
    assert_eq!(mock.received().await, vec!["P#"]);

    Ok(())
}

#[tokio::test]
async fn wrong_segment_count_is_bad_request() -> Result<()> {
    let (gateway, mock) = start_gateway(MockBoxBuilder::new(), &[0]).await?;
    let registry = gateway.registry();

    for uri in [
        "/",
        "/switch",
        "/switch/0",
        "/switch/0/on/now",
        "/version",
        "/switch/0/on/0/on",
    ] {
        assert_eq!(
            get(&registry, uri).await?,
            error(StatusCode::BAD_REQUEST, "Invalid path format"),
            "{uri}"
        );
    }

    assert!(mock.events().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn non_numeric_device_number_is_bad_request() -> Result<()> {
    let (gateway, _mock) = start_gateway(MockBoxBuilder::new(), &[0]).await?;

    for uri in ["/switch/abc/on", "/switch/-1/on", "/switch/one/off"] {
        assert_eq!(
            get(&gateway.registry(), uri).await?,
            error(StatusCode::BAD_REQUEST, "Invalid device number"),
            "{uri}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn unregistered_device_is_not_found() -> Result<()> {
    let (gateway, _mock) = start_gateway(MockBoxBuilder::new(), &[0]).await?;
    let registry = gateway.registry();

    for uri in ["/unknownType/0/on", "/switch/1/on", "/dome/0/delete"] {
        assert_eq!(
            get(&registry, uri).await?,
            error(StatusCode::NOT_FOUND, "Device not found"),
            "{uri}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn unknown_action_is_not_found() -> Result<()> {
    let (gateway, mock) = start_gateway(MockBoxBuilder::new(), &[0, 7]).await?;
    let registry = gateway.registry();

    for uri in [
        "/switch/0/delete",
        "/switch/7/TurnOn",
        "/switch/7/dispose",
        "/switch/0/initialize",
    ] {
        assert_eq!(
            get(&registry, uri).await?,
            error(StatusCode::NOT_FOUND, "Unknown action"),
            "{uri}"
        );
    }

    assert!(mock.events().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn type_and_action_ignore_case() -> Result<()> {
    let (gateway, mock) = start_gateway(MockBoxBuilder::new(), &[5]).await?;
    let registry = gateway.registry();

    assert_eq!(get(&registry, "/SWITCH/5/ON").await?, value(true));
    assert_eq!(get(&registry, "/Switch/5/Off").await?, value(true));
    assert_eq!(get(&registry, "/switch//5/init/").await?, value(true));

    assert_eq!(mock.received().await, vec!["O5#", "F5#", "P#"]);

    Ok(())
}

#[tokio::test]
async fn any_method_is_routed() -> Result<()> {
    let (gateway, _mock) = start_gateway(MockBoxBuilder::new(), &[0]).await?;

    for method in [Method::GET, Method::PUT, Method::POST, Method::DELETE] {
        assert_eq!(
            request(&gateway.registry(), method.clone(), "/switch/0/on").await?,
            value(true),
            "{method}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn timeout_parameter_bounds_the_wait() -> Result<()> {
    let mock = MockBoxBuilder::new().on("O1#", MockReply::silent());
    let (gateway, _mock) = start_gateway(mock, &[1]).await?;
    let registry = gateway.registry();

    let start = Instant::now();
    assert_eq!(get(&registry, "/switch/1/on?timeout=100").await?, value(false));
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(900), "{elapsed:?}");

    // Parameter name is not case sensitive
    let start = Instant::now();
    assert_eq!(get(&registry, "/switch/1/on?TimeOut=50").await?, value(false));
    assert!(start.elapsed() < Duration::from_millis(900));

    // The box is still usable
    assert_eq!(get(&registry, "/switch/1/off").await?, value(true));

    Ok(())
}

#[tokio::test]
async fn unparsable_timeout_uses_default() -> Result<()> {
    let mock = MockBoxBuilder::new().on("O1#", MockReply::ack().after(Duration::from_millis(300)));
    let (gateway, _mock) = start_gateway(mock, &[1]).await?;

    // The default of one second is enough to wait for the slow box.
    assert_eq!(
        get(&gateway.registry(), "/switch/1/on?timeout=soon").await?,
        value(true)
    );

    Ok(())
}

#[tokio::test]
async fn shut_down_device_is_server_error() -> Result<()> {
    let (gateway, mock) = start_gateway(MockBoxBuilder::new(), &[0]).await?;

    gateway.shutdown().await;

    let (status, reply) = get(&gateway.registry(), "/switch/0/on").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply, Reply::Error("Device Switch #0 is unavailable".into()));

    assert!(mock.events().await.is_empty());

    Ok(())
}
