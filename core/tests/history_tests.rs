/// History endpoint tests
/// HttpHistory against an in-process hyper server

extern crate chatdesk_core;

use chatdesk_core::history::{HistorySource, HttpHistory};
use chatdesk_core::{ChatError, Config};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve every connection with `status` and `body`; returns the bound address
async fn serve(status: StatusCode, body: &'static str, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<hyper::body::Incoming>| async move {
                    tokio::time::sleep(delay).await;
                    let status = if req.uri().path() == "/messages" {
                        status
                    } else {
                        StatusCode::NOT_FOUND
                    };
                    Ok::<_, Infallible>(
                        Response::builder()
                            .status(status)
                            .header("Content-Type", "application/json")
                            .body(Full::new(bytes::Bytes::from(body)))
                            .unwrap(),
                    )
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    addr
}

fn config_for(addr: SocketAddr) -> Config {
    Config {
        server_url: format!("http://{}", addr),
        request_timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_fetch_all_parses_backend_rows() {
    let body = r#"[
        {"id": 2, "platform": "WhatsApp", "sender": "Asistente", "chat_id": "c1",
         "message": "hola", "timestamp": "2024-01-01T10:01:00", "is_from_assistant": 1},
        {"id": 1, "platform": "WhatsApp", "sender": "Ana", "chat_id": "c1",
         "message": "hi", "timestamp": "2024-01-01T10:00:00", "is_from_assistant": 0}
    ]"#;
    let addr = serve(StatusCode::OK, body, Duration::ZERO).await;
    let history = HttpHistory::new(&config_for(addr)).unwrap();

    let messages = history.fetch_all().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, "Asistente");
    assert!(messages[0].inbound);
    assert_eq!(messages[1].text, "hi");
    assert!(!messages[1].inbound);
}

#[tokio::test]
async fn test_null_column_does_not_drop_history() {
    let body = r#"[
        {"id": 2, "platform": "WhatsApp", "sender": null, "chat_id": "c1",
         "message": null, "timestamp": "2024-01-01T10:01:00", "is_from_assistant": 1},
        {"id": 1, "platform": null, "sender": "Ana", "chat_id": "c2",
         "message": "hi", "timestamp": "2024-01-01T10:00:00", "is_from_assistant": 0}
    ]"#;
    let addr = serve(StatusCode::OK, body, Duration::ZERO).await;
    let history = HttpHistory::new(&config_for(addr)).unwrap();

    let messages = history.fetch_all().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, "");
    assert_eq!(messages[0].text, "");
    assert_eq!(messages[1].conversation_id, "c2");
    assert_eq!(messages[1].text, "hi");
    assert!(messages[1].platform.is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let addr = serve(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error": "Error en la base de datos"}"#,
        Duration::ZERO,
    )
    .await;
    let history = HttpHistory::new(&config_for(addr)).unwrap();

    let err = history.fetch_all().await.unwrap_err();
    assert!(matches!(err, ChatError::Status(500)));
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let addr = serve(StatusCode::OK, r#"{"not": "a list"}"#, Duration::ZERO).await;
    let history = HttpHistory::new(&config_for(addr)).unwrap();

    let err = history.fetch_all().await.unwrap_err();
    assert!(matches!(err, ChatError::Serialization(_)));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let addr = serve(StatusCode::OK, "[]", Duration::from_secs(3)).await;
    let history = HttpHistory::new(&config_for(addr)).unwrap();

    let err = history.fetch_all().await.unwrap_err();
    assert!(matches!(err, ChatError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let history = HttpHistory::new(&config_for(addr)).unwrap();

    let err = history.fetch_all().await.unwrap_err();
    assert!(matches!(err, ChatError::Http(_)));
}
