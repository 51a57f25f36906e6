//! End-to-end route tests driven through the real axum `Router`, the way
//! design §8's scenarios are framed: a request goes in, a response comes
//! out, no mocking of negotiation or dispatch in between.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use qbridge_config::{ConfigEntry, InMemoryConfig};
use qbridge_core::{ExecResult, Executor, Outcome};
use qbridge_error::BridgeError;
use qbridge_server::{Server, ServerConfig};
use qbridge_wire::{ColumnMeta, ResultSet, TypeInfo, Value};
use tower::ServiceExt;

/// Always returns one row; enough to exercise `SUBMIT`/`DIRECT` without a
/// real database connection.
struct OneRowExecutor;

#[async_trait::async_trait]
impl Executor for OneRowExecutor {
    async fn execute(&self, _query: &str, _tenant: Option<&str>, _txid: Option<&str>) -> Result<ExecResult, BridgeError> {
        let mut rows = ResultSet::new(vec![ColumnMeta { name: "x".into(), type_info: TypeInfo::default() }]);
        rows.push_row(vec![Value::Int32(1)]);
        Ok(ExecResult { outcome: Outcome::Rows(rows), warnings: Vec::new() })
    }
}

fn peer_addr() -> SocketAddr {
    "127.0.0.1:9999".parse().unwrap()
}

fn request(method: Method, path: &str) -> Request<Body> {
    let mut req = Request::builder().method(method).uri(path).body(Body::empty()).unwrap();
    req.extensions_mut().insert(ConnectInfo(peer_addr()));
    req
}

fn test_server() -> Server<OneRowExecutor> {
    let config = ServerConfig { auth: false, ..ServerConfig::default() };
    Server::new(config, Arc::new(OneRowExecutor), Arc::new(InMemoryConfig::new()))
}

#[tokio::test]
async fn submit_then_direct_returns_the_executed_result() {
    let server = test_server();
    let router = server.router();

    let submit = router.clone().oneshot(request(Method::GET, "/?q=SELECT+1")).await.unwrap();
    assert_eq!(submit.status(), StatusCode::OK);
    let body = axum::body::to_bytes(submit.into_body(), usize::MAX).await.unwrap();
    let url = String::from_utf8(body.to_vec()).unwrap();
    let qid = url.rsplit('/').next().unwrap().trim_end_matches(".csv");

    let direct = router.oneshot(request(Method::GET, &format!("/{qid}.csv"))).await.unwrap();
    assert_eq!(direct.status(), StatusCode::OK);
    let body = axum::body::to_bytes(direct.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains('1'));
}

#[tokio::test]
async fn direct_on_unknown_qid_is_not_found() {
    let server = test_server();
    let response = server.router().oneshot(request(Method::GET, "/does-not-exist.csv")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn config_summary_renders_plain_text() {
    let server = test_server();
    let response = server.router().oneshot(request(Method::GET, "/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("auth=false"));
}

#[tokio::test]
async fn config_category_lists_registered_entries() {
    let config = ServerConfig { auth: false, ..ServerConfig::default() };
    let named_config = Arc::new(InMemoryConfig::new());
    named_config.put_entry("db", ConfigEntry::new("primary", "primary database"));
    let server = Server::new(config, Arc::new(OneRowExecutor), named_config);

    let response = server.router().oneshot(request(Method::GET, "/config/db")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("primary"));
}

#[tokio::test]
async fn metrics_endpoint_reports_prometheus_text() {
    let server = test_server();
    let router = server.router();
    router.clone().oneshot(request(Method::GET, "/?q=SELECT+1")).await.unwrap();
    let response = router.oneshot(request(Method::GET, "/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("qbridge_requests_total"));
}

#[tokio::test]
async fn head_request_gets_headers_without_a_body() {
    let server = test_server();
    let response = server.router().oneshot(request(Method::HEAD, "/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}
