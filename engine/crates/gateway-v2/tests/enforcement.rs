mod common;

use common::{authorization_line, claims, headers, token, TestGateway};
use common_types::Claims;
use gateway_v2::Request;
use indoc::{formatdoc, indoc};
use rstest::rstest;
use serde_json::{json, Value};

fn todo_schema() -> String {
    formatdoc! {r#"
        type Todo @auth(
            query: {{ or: [
                {{ rule: "{{ $ROLE: {{ eq: \"ADMIN\" }} }}" }},
                {{ rule: """query($USER: String!) {{ queryTodo(filter: {{ owner: {{ eq: $USER }} }}) {{ id }} }}""" }}
            ] }}
        ) {{
            id: ID!
            title: String! @search(by: [term])
            owner: String! @search(by: [hash])
        }}

        {}
    "#, authorization_line()}
}

async fn todos(test: &TestGateway) {
    let added = test
        .data(
            Request::new("addTodo").argument(
                "input",
                json!([
                    { "title": "buy milk", "owner": "alice" },
                    { "title": "walk the dog", "owner": "bob" }
                ]),
            ),
            &Claims::anonymous(),
        )
        .await;
    assert_eq!(added["numUids"], json!(2));
}

fn titles(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["title"].as_str()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn rules_filter_queries() {
    let test = TestGateway::silent(&todo_schema());
    todos(&test).await;

    let alice = claims(json!({ "USER": "alice" }));
    let admin = claims(json!({ "ROLE": "ADMIN" }));

    let visible = test.data(Request::new("queryTodo"), &alice).await;
    assert_eq!(titles(&visible), ["buy milk"]);

    let visible = test.data(Request::new("queryTodo"), &admin).await;
    assert_eq!(titles(&visible), ["buy milk", "walk the dog"]);

    let aggregate = test.data(Request::new("aggregateTodo"), &alice).await;
    assert_eq!(aggregate["count"], json!(1));
}

#[tokio::test]
async fn claims_come_from_the_token() {
    let test = TestGateway::silent(&todo_schema());
    todos(&test).await;

    let response = test
        .gateway
        .execute(&Request::new("queryTodo"), &headers(&token(json!({ "USER": "bob" }))))
        .await;
    assert!(!response.has_errors());
    assert_eq!(titles(response.field("queryTodo")), ["walk the dog"]);

    // a token that fails verification makes the caller anonymous
    let response = test
        .gateway
        .execute(&Request::new("queryTodo"), &headers("not-a-token"))
        .await;
    assert!(!response.has_errors());
    assert_eq!(response.field("queryTodo"), &json!([]));
}

#[tokio::test]
async fn silent_rejections_look_like_missing_data() {
    let test = TestGateway::silent(&todo_schema());
    todos(&test).await;

    let anonymous = Claims::anonymous();
    assert_eq!(test.data(Request::new("queryTodo"), &anonymous).await, json!([]));

    let admin = claims(json!({ "ROLE": "ADMIN" }));
    let all = test.data(Request::new("queryTodo"), &admin).await;
    let bobs = all[1]["id"].as_str().unwrap().to_string();

    let alice = claims(json!({ "USER": "alice" }));
    let response = test.execute(Request::new("getTodo").argument("id", bobs), &alice).await;
    assert_eq!(response.to_json(), json!({ "data": { "getTodo": null } }));
}

#[tokio::test]
async fn diagnostic_mode_reports_rejections() {
    let test = TestGateway::diagnostic(&todo_schema());
    todos(&test).await;

    let response = test.execute(Request::new("queryTodo"), &Claims::anonymous()).await;
    assert_eq!(
        response.to_json(),
        json!({
            "data": { "queryTodo": [] },
            "errors": [{ "message": "authorization failed for query on Todo" }]
        })
    );

    // nothing to hide, nothing to report
    let response = test
        .execute(
            Request::new("queryTodo").argument("filter", json!({ "title": { "anyofterms": "laundry" } })),
            &Claims::anonymous(),
        )
        .await;
    assert_eq!(response.to_json(), json!({ "data": { "queryTodo": [] } }));
}

const BOOLEAN_SCHEMA: &str = indoc! {r#"
    type Document @auth(
        query: { and: [
            { rule: "{ $A: { eq: \"yes\" } }" },
            { or: [
                { rule: "{ $B: { eq: \"yes\" } }" },
                { not: { rule: "{ $C: { eq: \"yes\" } }" } }
            ] }
        ] }
    ) {
        id: ID!
        title: String
    }
"#};

#[rstest]
#[case::all(json!({ "A": "yes", "B": "yes", "C": "yes" }), true)]
#[case::without_c(json!({ "A": "yes", "B": "yes" }), true)]
#[case::only_a(json!({ "A": "yes" }), true)]
#[case::a_and_c(json!({ "A": "yes", "C": "yes" }), false)]
#[case::c_is_something_else(json!({ "A": "yes", "C": "no" }), true)]
#[case::without_a(json!({ "B": "yes" }), false)]
#[case::a_is_something_else(json!({ "A": "no", "B": "yes" }), false)]
#[case::nothing(json!({}), false)]
#[tokio::test]
async fn rule_composition(#[case] custom: Value, #[case] visible: bool) {
    let test = TestGateway::silent(BOOLEAN_SCHEMA);
    test.data(
        Request::new("addDocument").argument("input", json!([{ "title": "plans" }])),
        &Claims::anonymous(),
    )
    .await;

    let documents = test.data(Request::new("queryDocument"), &claims(custom)).await;

    assert_eq!(titles(&documents).len(), usize::from(visible));
}

const INTERFACE_SCHEMA: &str = indoc! {r#"
    interface Node @auth(query: { rule: "{ $ROLE: { eq: \"USER\" } }" }) {
        id: ID!
        text: String
    }

    type Question implements Node @auth(query: { rule: "{ $ROLE: { eq: \"ADMIN\" } }" }) {
        answered: Boolean
    }

    type Answer implements Node {
        accepted: Boolean
    }
"#};

fn texts(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["text"].as_str()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn interface_rules_apply_to_implementers() {
    let test = TestGateway::silent(INTERFACE_SCHEMA);
    let anonymous = Claims::anonymous();
    test.data(
        Request::new("addQuestion").argument("input", json!([{ "text": "why?", "answered": false }])),
        &anonymous,
    )
    .await;
    test.data(
        Request::new("addAnswer").argument("input", json!([{ "text": "because", "accepted": true }])),
        &anonymous,
    )
    .await;

    let user = claims(json!({ "ROLE": "USER" }));
    assert_eq!(texts(&test.data(Request::new("queryNode"), &user).await), ["because"]);
    assert_eq!(texts(&test.data(Request::new("queryAnswer"), &user).await), ["because"]);
    assert_eq!(test.data(Request::new("queryQuestion"), &user).await, json!([]));

    // an admin only sees questions when also a user
    let admin = claims(json!({ "ROLE": "ADMIN" }));
    assert_eq!(test.data(Request::new("queryQuestion"), &admin).await, json!([]));

    let both = claims(json!({ "ROLE": ["USER", "ADMIN"] }));
    assert_eq!(
        texts(&test.data(Request::new("queryNode"), &both).await),
        ["why?", "because"]
    );

    assert_eq!(test.data(Request::new("queryNode"), &anonymous).await, json!([]));
}
