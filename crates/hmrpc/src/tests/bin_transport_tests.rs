//! BIN-RPC transport against a scripted gateway
//!
//! Covers the retry policy: one retry on a fresh socket for transport
//! failures, a single attempt for `init`, and no retry for faults.

use std::sync::Arc;

use super::fixtures::{FakeGateway, Step, closed_port, config_for};
use crate::error::Error;
use crate::protocol::Request;
use crate::transport::{BinRpcTransport, Transport};
use hmrpc_types::{Interface, Value};

fn transport(gateway: &FakeGateway) -> BinRpcTransport {
    BinRpcTransport::new(Arc::new(config_for(gateway.port)))
}

#[tokio::test]
async fn test_success_keeps_socket() {
    let gateway = FakeGateway::bin(vec![Step::Reply(vec![Value::from(42)])]).await;
    let transport = transport(&gateway);

    let result = transport
        .send_request(Interface::Rf, &Request::new("getInstallMode"))
        .await
        .unwrap();

    assert_eq!(result, vec![Value::from(42)]);
    assert!(transport.has_socket(gateway.port).await);
}

#[tokio::test]
async fn test_socket_reused_across_requests() {
    let gateway = FakeGateway::bin(vec![
        Step::Reply(vec![Value::from(1)]),
        Step::Reply(vec![Value::from(2)]),
    ])
    .await;
    let transport = transport(&gateway);

    transport.send_request(Interface::Rf, &Request::new("a")).await.unwrap();
    let second = transport.send_request(Interface::Rf, &Request::new("b")).await.unwrap();

    assert_eq!(second, vec![Value::from(2)]);
    assert_eq!(gateway.connections(), 1);
    assert_eq!(gateway.methods(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_retry_after_dropped_connection() {
    let gateway = FakeGateway::bin(vec![Step::Drop, Step::Reply(vec![Value::from(true)])]).await;
    let transport = transport(&gateway);

    let result = transport
        .send_request(Interface::Rf, &Request::new("listDevices"))
        .await
        .unwrap();

    assert_eq!(result, vec![Value::from(true)]);
    assert_eq!(gateway.connections(), 2);
    assert_eq!(gateway.methods(), vec!["listDevices", "listDevices"]);
    assert!(transport.has_socket(gateway.port).await);
}

#[tokio::test]
async fn test_second_failure_is_returned() {
    let gateway = FakeGateway::bin(vec![Step::Drop, Step::Drop]).await;
    let transport = transport(&gateway);

    let err = transport
        .send_request(Interface::Rf, &Request::new("listDevices"))
        .await
        .unwrap_err();

    assert!(err.is_io());
    assert_eq!(gateway.methods().len(), 2);
    assert!(!transport.has_socket(gateway.port).await);
}

#[tokio::test]
async fn test_init_is_not_retried() {
    let gateway = FakeGateway::bin(vec![Step::Drop, Step::Reply(vec![Value::from("")])]).await;
    let transport = transport(&gateway);
    let request = Request::new("init").arg("binary://127.0.0.1:9126").arg("RF-hm");

    let err = transport.send_request(Interface::Rf, &request).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(gateway.methods(), vec!["init"]);
}

#[tokio::test]
async fn test_init_opens_new_socket() {
    let gateway = FakeGateway::bin(vec![]).await;
    let transport = transport(&gateway);

    transport.send_request(Interface::Rf, &Request::new("ping")).await.unwrap();
    transport
        .send_request(Interface::Rf, &Request::new("init").arg("binary://127.0.0.1:9126"))
        .await
        .unwrap();

    assert_eq!(gateway.connections(), 2);
}

#[tokio::test]
async fn test_faults_are_not_retried() {
    let gateway = FakeGateway::bin(vec![
        Step::Fault(-3, "Unknown paramset"),
        Step::Fault(-1, "Failure"),
        Step::Fault(-5, "Unknown device"),
    ])
    .await;
    let transport = transport(&gateway);

    let err = transport
        .send_request(Interface::Rf, &Request::new("getParamsetDescription"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownParamset { .. }));

    let err = transport
        .send_request(Interface::Rf, &Request::new("getParamset"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFailure { .. }));

    let err = transport
        .send_request(Interface::Rf, &Request::new("getValue"))
        .await
        .unwrap_err();
    assert_eq!(err.fault().map(|f| f.code), Some(-5));
    assert!(!err.is_io());

    assert_eq!(gateway.methods().len(), 3);
    assert_eq!(gateway.connections(), 1);
    assert!(transport.has_socket(gateway.port).await);
}

#[tokio::test]
async fn test_connection_refused() {
    let mut config = config_for(closed_port().await);
    config.timeout_secs = 1;
    let transport = BinRpcTransport::new(Arc::new(config));

    let err = transport
        .send_request(Interface::Rf, &Request::new("listDevices"))
        .await
        .unwrap_err();

    assert!(err.is_io());
}

#[tokio::test]
async fn test_dispose_closes_sockets() {
    let gateway = FakeGateway::bin(vec![]).await;
    let transport = transport(&gateway);

    transport.send_request(Interface::Rf, &Request::new("ping")).await.unwrap();
    transport.dispose().await;

    assert!(!transport.has_socket(gateway.port).await);
}
