use std::time::Duration;

use serde_json::json;
use weft_handlers::HttpRequestHandler;
use weft_task::{ErrorKind, ExecutionContext, Handler, classify_error};
use weft_workflow::{Node, NodeType};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn node() -> Node {
  Node::new("http", NodeType::Other("http:request".into()), "Call API")
}

fn context() -> ExecutionContext {
  ExecutionContext::new("wf", "exec", json!({}))
}

#[tokio::test]
async fn test_post_json_body() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/hooks/order"))
    .and(header("x-api-key", "k1"))
    .and(body_json(json!({ "orderId": 7 })))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
    .mount(&server)
    .await;

  let config = json!({
    "url": format!("{}/hooks/order", server.uri()),
    "method": "post",
    "headers": { "x-api-key": "k1" },
    "body": { "orderId": 7 },
    "timeout": 5000,
  });
  let result = HttpRequestHandler::new().execute(&node(), &context(), &config).await;

  assert!(result.success, "{:?}", result.error);
  assert_eq!(result.output["status"], 200);
  assert_eq!(result.output["body"], json!({ "ok": true }));
}

#[tokio::test]
async fn test_error_status_fails_with_status() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
    .mount(&server)
    .await;

  let config = json!({ "url": server.uri(), "method": "GET" });
  let result = HttpRequestHandler::new().execute(&node(), &context(), &config).await;

  assert!(!result.success);
  assert!(result.error_message().contains("401"));
  assert_eq!(result.output["body"], "nope");
  assert_eq!(
    classify_error(result.error_message()).kind,
    ErrorKind::AuthenticationError
  );
}

#[tokio::test]
async fn test_timeout_is_classified() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
    .mount(&server)
    .await;

  let config = json!({ "url": server.uri(), "timeout": 50 });
  let result = HttpRequestHandler::new().execute(&node(), &context(), &config).await;

  assert!(!result.success);
  let class = classify_error(result.error_message());
  assert_eq!(class.kind, ErrorKind::TimeoutError);
  assert!(class.retryable);
}

#[tokio::test]
async fn test_missing_url() {
  let result = HttpRequestHandler::new()
    .execute(&node(), &context(), &json!({}))
    .await;
  assert!(!result.success);
  assert_eq!(
    classify_error(result.error_message()).kind,
    ErrorKind::ValidationError
  );
}
