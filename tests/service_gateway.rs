//! HTTP gateway tests against a canned single-request server

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use mzvec::fingerprint::{transform, BinWidth};
use mzvec::index::{
    CollectionStatus, GatewayError, IndexGateway, Point, QdrantGateway, SearchRequest,
    ServiceGateway,
};
use mzvec::spectrum::{Metadata, Peak, PointId};
use serde_json::{json, Value};

/// Request line and JSON body seen by the mock server
struct Captured {
    request_line: String,
    body: Option<Value>,
}

/// Serve exactly one request with `status` and `response`, returning the base URL
/// and a receiver for what the client sent.
fn serve_once(status: u16, response: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }

        let mut raw = vec![0u8; content_length];
        reader.read_exact(&mut raw).unwrap();
        let body = (!raw.is_empty()).then(|| serde_json::from_slice(&raw).unwrap());

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            response.len(),
            response
        )
        .unwrap();
        stream.flush().unwrap();

        tx.send(Captured {
            request_line: request_line.trim_end().to_string(),
            body,
        })
        .unwrap();
    });

    (url, rx)
}

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn sample_point() -> Point {
    let vector = transform(
        &[Peak::new(100.0, 3.0), Peak::new(200.0, 4.0)],
        BinWidth::new(1.0).unwrap(),
    );
    let mut metadata = Metadata::new();
    metadata.insert("NAME".to_string(), "foo".to_string());
    Point::new(Some(PointId::Num(42)), vector, metadata)
}

#[test]
fn test_service_upsert_body() {
    let (url, rx) = serve_once(200, r#"{"status": "ok", "result": {"operation_id": 1}}"#);
    let mut gateway = ServiceGateway::new(url, timeout());

    gateway.upsert(&[sample_point()]).unwrap();

    let captured = rx.recv().unwrap();
    assert!(captured.request_line.starts_with("POST /upsert "));
    let body = captured.body.unwrap();
    assert_eq!(
        body,
        json!({
            "points": [{
                "id": 42,
                "sparse": {"indices": [100, 200], "values": [0.6, 0.8]},
                "metadata": {"NAME": "foo"}
            }]
        })
    );
}

#[test]
fn test_service_upsert_rejected_status() {
    let (url, _rx) = serve_once(200, r#"{"status": "error", "result": "disk full"}"#);
    let mut gateway = ServiceGateway::new(url, timeout());

    let err = gateway.upsert(&[sample_point()]).unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse(_)));
}

#[test]
fn test_service_upsert_http_error() {
    let (url, _rx) = serve_once(500, r#"{"detail": "boom"}"#);
    let mut gateway = ServiceGateway::new(url, timeout());

    let err = gateway.upsert(&[sample_point()]).unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 500, .. }));
}

#[test]
fn test_service_search() {
    let (url, rx) = serve_once(
        200,
        r#"{"hits": [{"id": 1, "score": 0.93, "payload": {"NAME": "foo"}}, {"id": "b", "score": 0.5, "payload": null}]}"#,
    );
    let gateway = ServiceGateway::new(url, timeout());

    let request = SearchRequest {
        vector: transform(&[Peak::new(100.0, 1.0)], BinWidth::new(1.0).unwrap()),
        limit: 5,
        with_payload: true,
    };
    let hits = gateway.search(&request).unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, PointId::Num(1));
    assert_eq!(hits[0].payload_str("NAME"), Some("foo"));
    assert_eq!(hits[1].id, PointId::from("b"));
    assert!(hits[1].payload.is_none());

    let body = rx.recv().unwrap().body.unwrap();
    assert_eq!(
        body,
        json!({"query": {"indices": [100], "values": [1.0]}, "limit": 5, "with_payload": true})
    );
}

#[test]
fn test_service_health_degraded() {
    let (url, rx) = serve_once(200, r#"{"status": "degraded", "collection": "ms_spectra"}"#);
    let gateway = ServiceGateway::new(url, timeout());

    assert_eq!(gateway.get_collection().unwrap(), CollectionStatus::NotFound);
    assert!(rx.recv().unwrap().request_line.starts_with("GET /health "));
}

#[test]
fn test_qdrant_missing_collection() {
    let (url, rx) = serve_once(404, r#"{"status": {"error": "Not found"}}"#);
    let gateway = QdrantGateway::new(url, "library", timeout());

    assert_eq!(gateway.get_collection().unwrap(), CollectionStatus::NotFound);
    assert!(rx
        .recv()
        .unwrap()
        .request_line
        .starts_with("GET /collections/library "));
}

#[test]
fn test_qdrant_search_named_vector() {
    let (url, rx) = serve_once(
        200,
        r#"{"result": [{"id": 3, "version": 0, "score": 0.7, "payload": {"NAME": "bar"}}], "status": "ok", "time": 0.001}"#,
    );
    let gateway = QdrantGateway::new(url, "library", timeout());

    let request = SearchRequest {
        vector: transform(&[Peak::new(5.0, 2.0)], BinWidth::new(1.0).unwrap()),
        limit: 3,
        with_payload: true,
    };
    let hits = gateway.search(&request).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, PointId::Num(3));
    assert_eq!(hits[0].payload_str("NAME"), Some("bar"));

    let captured = rx.recv().unwrap();
    assert!(captured
        .request_line
        .starts_with("POST /collections/library/points/search "));
    let body = captured.body.unwrap();
    assert_eq!(body["vector"]["name"], "sparse");
    assert_eq!(body["vector"]["vector"]["indices"], json!([5]));
    assert_eq!(body["limit"], 3);
}
