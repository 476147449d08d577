mod common;

use assert_matches::assert_matches;
use common::TestGateway;
use common_types::Claims;
use gateway_v2::{Config, Gateway, Request, SubmissionError};
use indoc::indoc;
use runtime::Store;
use runtime_local::InMemoryStore;
use serde_json::json;

const SCHEMA: &str = indoc! {r"
    type Todo {
        id: ID!
        title: String! @search(by: [term])
    }
"};

#[tokio::test]
async fn requests_before_any_schema() {
    let gateway = Gateway::new(Config::default(), Store::new(InMemoryStore::new()));

    let response = gateway
        .execute_with_claims(&Request::new("queryTodo"), &Claims::anonymous())
        .await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": { "queryTodo": null },
            "errors": [{ "message": "no schema has been published" }]
        })
    );
}

#[test]
fn rejected_submissions_keep_the_published_snapshot() {
    let test = TestGateway::silent(SCHEMA);
    let published = test.gateway.snapshot().unwrap();
    assert_eq!(published.version, 1);

    let err = test.gateway.submit("type Post { author: Author }").unwrap_err();
    assert_matches!(err, SubmissionError::Schema(_));
    assert!(err.to_string().contains("Type Post; Field author: Author is not a known type."));

    let current = test.gateway.snapshot().unwrap();
    assert_eq!(current.version, 1);
    assert_eq!(current.sdl(), published.sdl());

    let next = test.gateway.submit("type Post { id: ID! }").unwrap();
    assert_eq!(next.version, 2);
    assert!(next.generated.root_field("queryPost").is_some());
    assert!(next.generated.root_field("queryTodo").is_none());

    // requests that started earlier keep their snapshot
    assert!(published.generated.root_field("queryTodo").is_some());
}

#[test]
fn malformed_authorization_lines_reject_the_schema() {
    let test = TestGateway::silent(SCHEMA);

    let sdl = format!("{SCHEMA}\n# Dgraph.Authorization {{\"Header\": 1}}");
    assert_matches!(test.gateway.submit(&sdl), Err(SubmissionError::Config(_)));
    assert_eq!(test.gateway.snapshot().unwrap().version, 1);
}

#[test]
fn subscribers_are_notified() {
    let test = TestGateway::silent(SCHEMA);
    let mut receiver = test.gateway.subscribe();
    assert!(!receiver.has_changed().unwrap());

    test.gateway.submit(SCHEMA).unwrap();

    assert!(receiver.has_changed().unwrap());
    assert_eq!(receiver.borrow_and_update().as_ref().map(|snapshot| snapshot.version), Some(2));
}

#[tokio::test]
async fn unknown_root_fields() {
    let test = TestGateway::silent(SCHEMA);

    let response = test.execute(Request::new("queryPost"), &Claims::anonymous()).await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": { "queryPost": null },
            "errors": [{ "message": "unknown root field queryPost" }]
        })
    );
}

#[tokio::test]
async fn malformed_filters() {
    let test = TestGateway::silent(SCHEMA);

    let response = test
        .execute(
            Request::new("queryTodo").argument("filter", json!({ "title": { "eq": "milk" } })),
            &Claims::anonymous(),
        )
        .await;

    assert!(response.has_errors());
    assert_eq!(response.field("queryTodo"), &serde_json::Value::Null);
}
