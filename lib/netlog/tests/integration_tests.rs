//! Integration tests for `HyperClient` using wiremock.

use std::time::Duration;

use assert2::{check, let_assert};
use netlog::{Error, HttpClient, HttpClientExt, HyperClient, Method, Request, Version};
use serde::{Deserialize, Serialize};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string, header, method, path, query_param},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[tokio::test]
async fn test_get_records_url_and_version() {
    let mock_server = MockServer::start().await;

    let user = User {
        id: 1,
        name: "Alice".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let url = url::Url::parse(&format!("{}/users/1", mock_server.uri())).expect("url");
    let request = Request::builder(Method::Get, url.clone())
        .header("Accept", "application/json")
        .build();

    let response = client.execute(request).await.expect("response");

    check!(response.status() == 200);
    check!(response.url() == Some(&url));
    check!(response.version() == Some(Version::HTTP_11));
    let body: User = response.json().expect("json");
    check!(body == user);
}

#[tokio::test]
async fn test_post_json_and_form() {
    let mock_server = MockServer::start().await;

    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string("id=0&name=Bob"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();

    let created = client
        .post_json(&format!("{}/users", mock_server.uri()), &input)
        .await
        .expect("response");
    check!(created.status() == 201);

    let logged_in = client
        .post_form(&format!("{}/login", mock_server.uri()), &input)
        .await
        .expect("response");
    check!(logged_in.status() == 204);
}

#[tokio::test]
async fn test_base_url_resolution() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("q", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .mount(&mock_server)
        .await;

    let base = url::Url::parse(&format!("{}/v1/", mock_server.uri())).expect("url");
    let client = HyperClient::builder().base_url(base).tag("search").build();

    let request = Request::builder(Method::Get, client.url("search").expect("url"))
        .query("q", "rust")
        .build();
    let response = client.execute(request).await.expect("response");

    check!(client.tag() == "search");
    check!(response.text().expect("utf-8") == "found");
}

#[tokio::test]
async fn test_http_error_status_is_a_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let response = client
        .get(&format!("{}/missing", mock_server.uri()))
        .await
        .expect("response");

    check!(response.status() == 404);
    check!(response.reason() == "Not Found");
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = HyperClient::builder()
        .timeout(Duration::from_millis(100))
        .build();

    let result = client.get(&format!("{}/slow", mock_server.uri())).await;

    let_assert!(Err(Error::Timeout) = result);
}

#[tokio::test]
async fn test_connection_error() {
    let client = HyperClient::new();

    let result = client.get("http://127.0.0.1:1/").await;

    let err = result.expect_err("expected connection error");
    check!(err.is_connection(), "Expected connection error, got: {err}");
}

#[tokio::test]
async fn test_response_headers_keep_duplicates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/with-headers"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "abc123")
                .append_header("Set-Cookie", "a=1")
                .append_header("Set-Cookie", "b=2"),
        )
        .mount(&mock_server)
        .await;

    let client = HyperClient::new();
    let response = client
        .get(&format!("{}/with-headers", mock_server.uri()))
        .await
        .expect("response");

    check!(response.header("x-request-id") == Some("abc123"));
    check!(response.headers().get_all("set-cookie").iter().count() == 2);
}
