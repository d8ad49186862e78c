//! Integration tests for `HyperClient` using wiremock.

use std::time::Duration;

use bytes::Bytes;
use courier::{DEFAULT_USER_AGENT, Error, HttpClient, HyperClient, Method, QueryItem, Request};
use serde::{Deserialize, Serialize};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn url(server: &MockServer, suffix: &str) -> url::Url {
    url::Url::parse(&format!("{}{suffix}", server.uri())).expect("url")
}

#[tokio::test]
async fn get_request() {
    let mock_server = MockServer::start().await;
    let user = User {
        id: 1,
        name: "Alice".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/users/1")).build();

    let response = client.execute(request).await.expect("response");

    assert!(response.is_success());
    let body: User = response.json().expect("json");
    assert_eq!(body, user);
}

#[tokio::test]
async fn post_request_with_json_body() {
    let mock_server = MockServer::start().await;
    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Post, url(&mock_server, "/users"))
        .json(&input)
        .expect("json body")
        .build();

    let response = client.execute(request).await.expect("response");

    assert_eq!(response.status(), 201);
    assert_eq!(response.body(), &Bytes::from_static(b"created"));
}

#[tokio::test]
async fn query_items_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "a b&c"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/search"))
        .query_items([QueryItem::new("q", "a b&c"), QueryItem::new("page", "1")])
        .build();

    let response = client.execute(request).await.expect("response");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn error_status_is_a_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/missing")).build();

    let response = client.execute(request).await.expect("response");
    assert!(!response.is_success());
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().expect("utf-8"), "not found");
}

#[tokio::test]
async fn response_headers_are_exposed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/headers"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Request-Id", "abc-123"))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/headers")).build();

    let response = client.execute(request).await.expect("response");
    assert_eq!(response.header("x-request-id"), Some("abc-123"));
}

#[tokio::test]
async fn transport_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = HyperClient::builder()
        .request_timeout(Duration::from_millis(100))
        .build();
    let request = Request::builder(Method::Get, url(&mock_server, "/slow")).build();

    let result = client.execute(request).await;
    assert!(matches!(result, Err(Error::Timeout)));
}

#[tokio::test]
async fn unbounded_transport_waits_for_slow_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/slow")).build();

    let response = client.execute(request).await.expect("response");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn default_user_agent_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/agent"))
        .and(header("User-Agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/agent")).build();

    let response = client.execute(request).await.expect("response");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn connection_error() {
    let client = HyperClient::builder()
        .connect_timeout(Duration::from_secs(1))
        .build();
    let address = url::Url::parse("http://127.0.0.1:1/").expect("url");
    let request = Request::builder(Method::Get, address).build();

    let result = client.execute(request).await;
    assert!(result.is_err_and(|err| err.is_connection()));
}

#[tokio::test]
async fn put_and_delete_methods() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    for verb in [Method::Put, Method::Delete] {
        let request = Request::builder(verb, url(&mock_server, "/users/1")).build();
        let response = client.execute(request).await.expect("response");
        assert_eq!(response.status(), 204);
    }
}
