// Loading rule files from disk and wiring them into an interceptor

use async_trait::async_trait;
use http::{Method, StatusCode};
use remock::config::ConfigLoader;
use remock::interceptor::{InterceptedRequest, InterceptedResponse, Interceptor, Transport};
use remock::matcher::{CachePolicy, PathMatcher};
use remock::rules::{ResponseContentType, RuleStore};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use url::Url;

const RULES_YAML: &str = r#"
matcher:
  path_separator: "/"
  case_sensitive: false
  cache_patterns: true
telemetry:
  enabled: false
  log_level: debug
  log_format: json
rules:
  - method: get
    pattern: "/users/{userId}/get"
    responses:
      - status: 200
        message: OK
        body: '{"name":"default"}'
        headers:
          - { key: X-Mock, value: "true" }
      - status: 403
        content_type: text
        when: 'header.role == "guest"'
        body: forbidden
  - method: DELETE
    pattern: "https://api.example.com/**"
    responses:
      - status: 204
        delay_ms: 5
"#;

struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    async fn proceed(&self, request: InterceptedRequest) -> anyhow::Result<InterceptedResponse> {
        anyhow::bail!("no network for {}", request.url())
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(RULES_YAML);
    let config = ConfigLoader::from_file(file.path()).unwrap();

    assert!(!config.matcher.case_sensitive);
    assert_eq!(config.matcher.cache_patterns, Some(true));
    assert!(!config.telemetry.enabled);
    assert_eq!(config.telemetry.log_format, "json");
    assert_eq!(config.telemetry.service_name, "remock");

    assert_eq!(config.rules.len(), 2);
    let users = &config.rules[0];
    assert_eq!(users.responses.len(), 2);
    assert_eq!(users.responses[0].content_type, ResponseContentType::Json);
    assert_eq!(users.responses[0].headers[0].key, "X-Mock");
    assert_eq!(users.responses[1].content_type, ResponseContentType::Text);
    assert_eq!(config.rules[1].responses[0].delay_ms, Some(5));
}

#[test]
fn test_build_store_and_matcher() {
    let config = ConfigLoader::from_str(RULES_YAML).unwrap();
    let store = config.build_store().unwrap();

    let rules = store.find_rules_by_method("GET");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].method, "GET");

    let candidates = store.rule_with_responses(rules[0].id).unwrap();
    assert_eq!(candidates.responses.len(), 2);
    assert!(candidates.responses[0].is_default());

    let matcher = config.matcher.build();
    assert_eq!(matcher.cache_policy(), CachePolicy::Always);
    assert!(matcher.matches("/users/{userId}/get", "/USERS/u1/GET"));
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}

#[test]
fn test_invalid_file_is_rejected() {
    let file = write_config(
        r#"
rules:
  - method: GET
    pattern: /a
    responses:
      - status: 200
      - status: 201
"#,
    );
    let err = ConfigLoader::from_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid rule #1"));
}

#[tokio::test]
async fn test_configured_rules_serve_requests() {
    let file = write_config(RULES_YAML);
    let config = ConfigLoader::from_file(file.path()).unwrap();
    let interceptor = Interceptor::builder(Arc::new(config.build_store().unwrap()))
        .matcher(Arc::new(config.matcher.build()))
        .build();

    let guest = InterceptedRequest::new(
        Method::GET,
        Url::parse("http://localhost/users/u1/get").unwrap(),
    )
    .with_header("role", "guest");
    let response = interceptor.intercept(guest, &Unreachable).await.unwrap();
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body.unwrap().text(), "forbidden");

    let delete = InterceptedRequest::new(
        Method::DELETE,
        Url::parse("https://api.example.com/orders/7?force=true").unwrap(),
    );
    let response = interceptor.intercept(delete, &Unreachable).await.unwrap();
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_none());

    let elsewhere = InterceptedRequest::new(
        Method::DELETE,
        Url::parse("https://other.example.com/orders/7").unwrap(),
    );
    let err = interceptor.intercept(elsewhere, &Unreachable).await.unwrap_err();
    assert!(err.to_string().contains("no network"));
}

#[test]
fn test_bundled_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/remock-config.yaml");
    let config = ConfigLoader::from_file(path).unwrap();
    let store = config.build_store().unwrap();
    assert_eq!(store.rules().len(), config.rules.len());
}
