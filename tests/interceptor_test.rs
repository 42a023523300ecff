// End-to-end interception against an in-memory rule store

use assert_json_diff::assert_json_eq;
use async_trait::async_trait;
use http::{Method, StatusCode, Version};
use remock::interceptor::{
    Body, InterceptedRequest, InterceptedResponse, Interceptor, SleepDelayer, Transport,
};
use remock::rules::{InMemoryRuleStore, MockResponse, ResponseContentType, RuleStore};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const FULL_GUARD: &str = r#"header.reqHeader1 == "value1" && header.reqHeader2 == "value2" && param.userId == "U1234" && query.userId == "U1234""#;
const BODY_GUARD: &str = r#"header.reqHeader1 == "value1" && param.userId == "U1234" && query.age > 28 && body.name.first == "test""#;

/// Stands in for the real network and counts how often it was reached.
struct NetworkStub {
    calls: AtomicUsize,
}

impl NetworkStub {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for NetworkStub {
    async fn proceed(&self, _request: InterceptedRequest) -> anyhow::Result<InterceptedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut response = InterceptedResponse::new(StatusCode::OK);
        response.message = Some("OK".to_string());
        response.body = Some(Body::new(
            r#"{"response":"ok"}"#,
            Some(mime::APPLICATION_JSON),
        ));
        Ok(response)
    }
}

fn seeded_store() -> Arc<InMemoryRuleStore> {
    let store = Arc::new(InMemoryRuleStore::new());

    let users_get = store
        .add_rule("GET", "https://example.com/users/{userId}/get")
        .unwrap();
    let users_post = store
        .add_rule("POST", "https://example.com/users/{userId}/post")
        .unwrap();
    store
        .add_rule("GET", "https://example.com/payment/{paymentId}/get")
        .unwrap();

    store
        .save_response(
            users_get.id,
            MockResponse::new(200)
                .with_message("OK")
                .with_body(r#"{"name":"response1"}"#)
                .with_delay_ms(200)
                .with_header("header1", "value1")
                .with_header("header2", "value2"),
        )
        .unwrap();
    store
        .save_response(
            users_get.id,
            MockResponse::new(200)
                .with_message("OK")
                .with_when(FULL_GUARD)
                .with_body(r#"{"name":{"first":"test","last":"test2"}}"#)
                .with_delay_ms(200)
                .with_header("header3", "value3")
                .with_header("header4", "value4"),
        )
        .unwrap();
    store
        .save_response(
            users_post.id,
            MockResponse::new(201)
                .with_message("Created")
                .with_when(BODY_GUARD)
                .with_body(r#"{"created":true}"#)
                .with_header("header5", "value5"),
        )
        .unwrap();

    store
}

fn request(method: Method, url: &str) -> InterceptedRequest {
    InterceptedRequest::new(method, Url::parse(url).unwrap())
}

fn body_json(response: &InterceptedResponse) -> serde_json::Value {
    let body = response.body.as_ref().expect("response has a body");
    serde_json::from_slice(&body.bytes).expect("body is JSON")
}

#[tokio::test]
async fn test_default_response_with_delay() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    let started = Instant::now();
    let response = interceptor
        .intercept(request(Method::GET, "https://example.com/users/U1234/get"), &network)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_json_eq!(body_json(&response), json!({ "name": "response1" }));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.reason(), "OK");
    assert_eq!(response.version, Version::HTTP_11);
    assert_eq!(response.headers.len(), 2);
    assert_eq!(response.header("header1"), Some("value1"));
    assert_eq!(response.header("header2"), Some("value2"));
    assert!(elapsed >= Duration::from_millis(200), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1000), "waited too long: {elapsed:?}");
    assert_eq!(network.calls(), 0);
}

#[tokio::test]
async fn test_guarded_response_is_selected() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    let response = interceptor
        .intercept(
            request(Method::GET, "https://example.com/users/U1234/get?userId=U1234")
                .with_header("reqHeader1", "value1")
                .with_header("reqHeader2", "value2"),
            &network,
        )
        .await
        .unwrap();

    assert_json_eq!(
        body_json(&response),
        json!({ "name": { "first": "test", "last": "test2" } })
    );
    assert_eq!(response.headers.len(), 2);
    assert_eq!(response.header("header3"), Some("value3"));
    assert_eq!(response.header("header4"), Some("value4"));
    assert_eq!(network.calls(), 0);
}

#[tokio::test]
async fn test_unmet_guard_falls_back_to_default() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    // Headers match but the query parameter is missing.
    let response = interceptor
        .intercept(
            request(Method::GET, "https://example.com/users/U1234/get")
                .with_header("reqHeader1", "value1")
                .with_header("reqHeader2", "value2"),
            &network,
        )
        .await
        .unwrap();

    assert_json_eq!(body_json(&response), json!({ "name": "response1" }));
    assert_eq!(response.header("header1"), Some("value1"));
    assert_eq!(network.calls(), 0);
}

#[tokio::test]
async fn test_unknown_url_passes_through_unchanged() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    let response = interceptor
        .intercept(request(Method::GET, "https://example.com/test-url/U1234/get"), &network)
        .await
        .unwrap();

    assert_json_eq!(body_json(&response), json!({ "response": "ok" }));
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("header1").is_none());
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn test_other_host_passes_through() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    interceptor
        .intercept(request(Method::GET, "https://example.org/users/U1234/get"), &network)
        .await
        .unwrap();
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn test_rule_without_responses_passes_through() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    interceptor
        .intercept(request(Method::GET, "https://example.com/payment/P9/get"), &network)
        .await
        .unwrap();
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn test_json_body_guard() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    let response = interceptor
        .intercept(
            request(Method::POST, "https://example.com/users/U1234/post?age=29")
                .with_header("reqHeader1", "value1")
                .with_body(
                    r#"{"name":{"first":"test","last":"test2"}}"#,
                    Some(mime::APPLICATION_JSON),
                ),
            &network,
        )
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.reason(), "Created");
    assert_json_eq!(body_json(&response), json!({ "created": true }));
    assert_eq!(network.calls(), 0);

    // Too young, and the rule has no default to fall back on.
    interceptor
        .intercept(
            request(Method::POST, "https://example.com/users/U1234/post?age=28")
                .with_header("reqHeader1", "value1")
                .with_body(
                    r#"{"name":{"first":"test","last":"test2"}}"#,
                    Some(mime::APPLICATION_JSON),
                ),
            &network,
        )
        .await
        .unwrap();
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn test_non_json_body_is_ignored() {
    let interceptor = Interceptor::builder(seeded_store()).build();
    let network = NetworkStub::new();

    interceptor
        .intercept(
            request(Method::POST, "https://example.com/users/U1234/post?age=40")
                .with_header("reqHeader1", "value1")
                .with_body(r#"{"name":{"first":"test"}}"#, Some(mime::TEXT_PLAIN)),
            &network,
        )
        .await
        .unwrap();
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn test_nested_array_guard_on_path_pattern() {
    let store = Arc::new(InMemoryRuleStore::new());
    let rule = store.add_rule("PUT", "/buildings/{buildingId}").unwrap();
    store
        .save_response(
            rule.id,
            MockResponse::new(200)
                .with_content_type(ResponseContentType::Text)
                .with_when(r#"body.address.apartments[1] == "a2" && param.buildingId == 7"#)
                .with_body("second apartment"),
        )
        .unwrap();
    let interceptor = Interceptor::builder(store).build();
    let network = NetworkStub::new();

    let response = interceptor
        .intercept(
            request(Method::PUT, "http://localhost:8080/buildings/7").with_body(
                json!({ "address": { "apartments": ["a1", "a2"] } }).to_string(),
                Some("application/json; charset=utf-8".parse().unwrap()),
            ),
            &network,
        )
        .await
        .unwrap();

    let body = response.body.unwrap();
    assert_eq!(body.text(), "second apartment");
    assert_eq!(body.content_type.unwrap().essence_str(), "application/text");
    assert_eq!(network.calls(), 0);
}

#[tokio::test]
async fn test_store_changes_are_seen_by_next_request() {
    let store = seeded_store();
    let interceptor = Interceptor::builder(store.clone()).build();
    let network = NetworkStub::new();
    let url = "https://example.com/users/U1234/get?userId=U1234";

    let rule = store
        .rules()
        .into_iter()
        .find(|rule| rule.pattern.ends_with("/get") && rule.pattern.contains("users"))
        .unwrap();
    let default_id = store
        .rule_with_responses(rule.id)
        .unwrap()
        .responses
        .into_iter()
        .find(|response| response.is_default())
        .and_then(|response| response.id)
        .unwrap();
    store.delete_response(default_id).unwrap();

    // No guard passes and no default remains.
    interceptor
        .intercept(request(Method::GET, url), &network)
        .await
        .unwrap();
    assert_eq!(network.calls(), 1);

    store.remove_rule(rule.id).unwrap();
    interceptor
        .intercept(
            request(Method::GET, url)
                .with_header("reqHeader1", "value1")
                .with_header("reqHeader2", "value2"),
            &network,
        )
        .await
        .unwrap();
    assert_eq!(network.calls(), 2);
}

#[tokio::test]
async fn test_interrupted_delay_still_returns_mock() {
    let store = Arc::new(InMemoryRuleStore::new());
    let rule = store.add_rule("GET", "/slow").unwrap();
    store
        .save_response(rule.id, MockResponse::new(504).with_delay_ms(60_000))
        .unwrap();

    let delayer = Arc::new(SleepDelayer::new());
    let interceptor = Arc::new(Interceptor::builder(store).delayer(delayer.clone()).build());

    let pending = {
        let interceptor = interceptor.clone();
        tokio::spawn(async move {
            interceptor
                .intercept(request(Method::GET, "http://localhost/slow"), &NetworkStub::new())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    delayer.interrupt();

    let response = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("interrupted interception should finish")
        .unwrap()
        .unwrap();
    assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_concurrent_interceptions() {
    let interceptor = Arc::new(Interceptor::builder(seeded_store()).build());
    let network = Arc::new(NetworkStub::new());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let interceptor = interceptor.clone();
            let network = network.clone();
            tokio::spawn(async move {
                let url = if i % 2 == 0 {
                    "https://example.com/users/U1234/get?userId=U1234"
                } else {
                    "https://example.com/elsewhere"
                };
                interceptor
                    .intercept(
                        request(Method::GET, url)
                            .with_header("reqHeader1", "value1")
                            .with_header("reqHeader2", "value2"),
                        network.as_ref(),
                    )
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap().status, StatusCode::OK);
    }
    assert_eq!(network.calls(), 8);
}
