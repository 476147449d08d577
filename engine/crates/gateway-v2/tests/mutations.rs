mod common;

use common::{claims, TestGateway, YieldingStore};
use common_types::Claims;
use gateway_v2::{EnforcementMode, Request};
use runtime::Store;
use runtime_local::InMemoryStore;
use indoc::indoc;
use serde_json::{json, Value};

const USER_SCHEMA: &str = indoc! {r#"
    type User @secret(field: "password") {
        username: String! @id
        name: String
    }
"#};

fn add_user(input: Value) -> Request {
    Request::new("addUser").argument("input", input)
}

#[tokio::test]
async fn duplicate_ids_add_nothing() {
    let test = TestGateway::silent(USER_SCHEMA);
    let anonymous = Claims::anonymous();
    let alice = json!([{ "username": "alice", "password": "Password" }]);

    let first = test.data(add_user(alice.clone()), &anonymous).await;
    assert_eq!(first, json!({ "user": [{ "username": "alice", "name": null }], "numUids": 1 }));

    let second = test.execute(add_user(alice), &anonymous).await;
    assert_eq!(second.to_json(), json!({ "data": { "addUser": { "user": [], "numUids": 0 } } }));

    assert_eq!(test.count("User"), 1);
}

#[tokio::test]
async fn duplicates_do_not_affect_their_siblings() {
    let test = TestGateway::silent(USER_SCHEMA);
    let anonymous = Claims::anonymous();
    test.data(add_user(json!([{ "username": "alice", "password": "a" }])), &anonymous)
        .await;

    let added = test
        .data(
            add_user(json!([
                { "username": "alice", "password": "b" },
                { "username": "carol", "password": "c" }
            ])),
            &anonymous,
        )
        .await;

    assert_eq!(added["numUids"], json!(1));
    assert_eq!(added["user"], json!([{ "username": "carol", "name": null }]));
    assert_eq!(test.count("User"), 2);
}

#[tokio::test]
async fn diagnostic_mode_reports_duplicates() {
    let test = TestGateway::diagnostic(USER_SCHEMA);
    let anonymous = Claims::anonymous();
    let alice = json!([{ "username": "alice", "password": "Password" }]);
    test.data(add_user(alice.clone()), &anonymous).await;

    let response = test.execute(add_user(alice), &anonymous).await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": { "addUser": { "user": [], "numUids": 0 } },
            "errors": [{ "message": "id \"alice\" already exists for field username of User" }]
        })
    );
}

#[tokio::test]
async fn upserts_update_the_existing_entity() {
    let test = TestGateway::silent(USER_SCHEMA);
    let anonymous = Claims::anonymous();
    test.data(add_user(json!([{ "username": "alice", "password": "a" }])), &anonymous)
        .await;

    let upserted = test
        .data(
            add_user(json!([{ "username": "alice", "name": "Alice" }])).argument("upsert", true),
            &anonymous,
        )
        .await;

    assert_eq!(upserted, json!({ "user": [{ "username": "alice", "name": "Alice" }], "numUids": 1 }));
    assert_eq!(test.count("User"), 1);
}

#[tokio::test]
async fn required_fields() {
    let test = TestGateway::silent(USER_SCHEMA);

    let response = test
        .execute(add_user(json!([{ "username": "alice" }])), &Claims::anonymous())
        .await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": { "addUser": { "user": [], "numUids": 0 } },
            "errors": [{ "message": "invalid argument password: is required to add a User" }]
        })
    );
    assert!(test.memory.is_empty());
}

#[tokio::test]
async fn invalid_elements_do_not_hide_committed_ones() {
    let test = TestGateway::silent(USER_SCHEMA);

    let response = test
        .execute(
            add_user(json!([
                { "username": "alice", "name": "A", "password": "a" },
                { "username": "bob" }
            ])),
            &Claims::anonymous(),
        )
        .await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": { "addUser": { "user": [{ "username": "alice", "name": "A" }], "numUids": 1 } },
            "errors": [{ "message": "invalid argument password: is required to add a User" }]
        })
    );
    assert_eq!(test.count("User"), 1);
}

#[tokio::test]
async fn concurrent_duplicates_add_one_entity() {
    let memory = InMemoryStore::new();
    let store = Store::new(YieldingStore(memory.clone()));
    let test = TestGateway::with_store(EnforcementMode::Silent, USER_SCHEMA, memory, store);
    let anonymous = Claims::anonymous();
    let alice = json!([{ "username": "alice", "name": "A", "password": "a" }]);

    let (first, second) = tokio::join!(
        test.execute(add_user(alice.clone()), &anonymous),
        test.execute(add_user(alice), &anonymous),
    );

    let mut num_uids = [first.field("addUser")["numUids"].clone(), second.field("addUser")["numUids"].clone()];
    num_uids.sort_by_key(|count| count.as_u64());
    assert_eq!(num_uids, [json!(0), json!(1)]);
    assert!(!first.has_errors() && !second.has_errors());
    assert_eq!(test.count("User"), 1);
}

#[tokio::test]
async fn passwords_are_checked_against_their_digest() {
    let test = TestGateway::silent(USER_SCHEMA);
    let anonymous = Claims::anonymous();
    test.data(
        add_user(json!([{ "username": "alice", "password": "Password" }])),
        &anonymous,
    )
    .await;

    let stored = test.memory.entities_of_type("User");
    assert_eq!(
        stored[0].scalar("User.password"),
        Some(&json!("e7cf3ef4f17c3999a94f2c6f612e8a888e5b1026878e4e19398b23bd38ec221a"))
    );

    let check = |password: &str| {
        Request::new("checkUserPassword")
            .argument("username", "alice")
            .argument("password", password)
    };

    assert_eq!(
        test.data(check("Password"), &anonymous).await,
        json!({ "username": "alice", "name": null })
    );
    assert_eq!(test.data(check("password"), &anonymous).await, Value::Null);
}

const LIBRARY_SCHEMA: &str = indoc! {r#"
    interface Author @auth(query: { rule: "{ $ROLE: { eq: \"ADMIN\" } }" }) {
        id: ID!
        name: String! @id(interface: true)
    }

    type Writer implements Author {
        bio: String
    }

    type Editor implements Author {
        imprint: String
    }

    type Book {
        title: String! @id
        author: Author
    }
"#};

#[tokio::test]
async fn links_to_hidden_entities_are_rejected() {
    let test = TestGateway::silent(LIBRARY_SCHEMA);
    let admin = claims(json!({ "ROLE": "ADMIN" }));
    let reader = claims(json!({ "ROLE": "READER" }));

    let added = test
        .data(
            Request::new("addWriter").argument("input", json!([{ "name": "alice" }])),
            &admin,
        )
        .await;
    assert_eq!(added["numUids"], json!(1));

    let book = json!([{ "title": "Dune", "author": { "name": "alice" } }]);

    let response = test
        .execute(Request::new("addBook").argument("input", book.clone()), &reader)
        .await;
    assert_eq!(response.to_json(), json!({ "data": { "addBook": { "book": [], "numUids": 0 } } }));
    assert_eq!(test.count("Book"), 0);

    let added = test
        .data(Request::new("addBook").argument("input", book), &admin)
        .await;
    assert_eq!(added["numUids"], json!(1));
    assert_eq!(added["book"][0]["author"]["name"], json!("alice"));
}

#[tokio::test]
async fn interface_ids_are_shared_by_implementers() {
    let test = TestGateway::silent(LIBRARY_SCHEMA);
    let admin = claims(json!({ "ROLE": "ADMIN" }));
    test.data(
        Request::new("addWriter").argument("input", json!([{ "name": "alice" }])),
        &admin,
    )
    .await;

    let added = test
        .data(
            Request::new("addEditor").argument("input", json!([{ "name": "alice" }])),
            &admin,
        )
        .await;

    assert_eq!(added["numUids"], json!(0));
    assert_eq!(test.count("Author"), 1);
}

#[tokio::test]
async fn hidden_interface_ids_still_conflict() {
    let test = TestGateway::silent(LIBRARY_SCHEMA);
    let admin = claims(json!({ "ROLE": "ADMIN" }));
    let reader = claims(json!({ "ROLE": "READER" }));
    test.data(
        Request::new("addWriter").argument("input", json!([{ "name": "alice", "bio": "b" }])),
        &admin,
    )
    .await;
    let writers = test.memory.entities_of_type("Writer");

    let response = test
        .execute(
            Request::new("addEditor").argument("input", json!([{ "name": "alice", "imprint": "i" }])),
            &reader,
        )
        .await;

    assert_eq!(
        response.to_json(),
        json!({ "data": { "addEditor": { "editor": [], "numUids": 0 } } })
    );
    assert_eq!(test.count("Editor"), 0);
    assert_eq!(test.memory.entities_of_type("Writer"), writers);
}

const TODO_SCHEMA: &str = indoc! {r#"
    type Todo @auth(
        add: { rule: """query($USER: String!) { queryTodo(filter: { owner: { eq: $USER } }) { id } }""" }
        update: { rule: """query($USER: String!) { queryTodo(filter: { owner: { eq: $USER } }) { id } }""" }
        delete: { rule: """query($USER: String!) { queryTodo(filter: { owner: { eq: $USER } }) { id } }""" }
    ) {
        id: ID!
        title: String! @search(by: [term])
        owner: String! @search(by: [hash])
    }
"#};

fn add_todo(title: &str, owner: &str) -> Request {
    Request::new("addTodo").argument("input", json!([{ "title": title, "owner": owner }]))
}

#[tokio::test]
async fn created_entities_must_satisfy_the_add_rule() {
    let test = TestGateway::silent(TODO_SCHEMA);
    let alice = claims(json!({ "USER": "alice" }));

    let own = test.data(add_todo("buy milk", "alice"), &alice).await;
    assert_eq!(own["numUids"], json!(1));

    let other = test.data(add_todo("walk the dog", "bob"), &alice).await;
    assert_eq!(other, json!({ "todo": [], "numUids": 0 }));

    assert_eq!(test.count("Todo"), 1);
}

#[tokio::test]
async fn updates_only_touch_permitted_entities() {
    let test = TestGateway::silent(TODO_SCHEMA);
    let alice = claims(json!({ "USER": "alice" }));
    let bob = claims(json!({ "USER": "bob" }));
    test.data(add_todo("buy milk", "alice"), &alice).await;
    test.data(add_todo("walk the dog", "bob"), &bob).await;

    let updated = test
        .data(
            Request::new("updateTodo").argument("input", json!({ "filter": {}, "set": { "title": "buy oat milk" } })),
            &alice,
        )
        .await;

    assert_eq!(updated["numUids"], json!(1));
    assert_eq!(updated["todo"][0]["title"], json!("buy oat milk"));

    let titles: Vec<Value> = test
        .memory
        .entities_of_type("Todo")
        .iter()
        .filter_map(|todo| todo.scalar("Todo.title").cloned())
        .collect();
    assert_eq!(titles, [json!("buy oat milk"), json!("walk the dog")]);
}

#[tokio::test]
async fn updates_that_break_the_rule_are_kept_out() {
    let test = TestGateway::silent(TODO_SCHEMA);
    let alice = claims(json!({ "USER": "alice" }));
    test.data(add_todo("buy milk", "alice"), &alice).await;

    // bob's update rule does not match alice's todo
    let updated = test
        .data(
            Request::new("updateTodo").argument(
                "input",
                json!({ "filter": { "owner": { "eq": "alice" } }, "remove": { "title": "buy milk" } }),
            ),
            &claims(json!({ "USER": "bob" })),
        )
        .await;

    assert_eq!(updated, json!({ "todo": [], "numUids": 0 }));
    assert_eq!(
        test.memory.entities_of_type("Todo")[0].scalar("Todo.title"),
        Some(&json!("buy milk"))
    );
}

#[tokio::test]
async fn deletes_only_remove_permitted_entities() {
    let test = TestGateway::silent(TODO_SCHEMA);
    let alice = claims(json!({ "USER": "alice" }));
    let bob = claims(json!({ "USER": "bob" }));
    test.data(add_todo("buy milk", "alice"), &alice).await;
    test.data(add_todo("walk the dog", "bob"), &bob).await;

    let deleted = test
        .data(Request::new("deleteTodo").argument("filter", json!({})), &bob)
        .await;

    assert_eq!(deleted["msg"], json!("Deleted"));
    assert_eq!(deleted["numUids"], json!(1));
    assert_eq!(deleted["todo"][0]["title"], json!("walk the dog"));
    assert_eq!(test.count("Todo"), 1);
}

const TASK_SCHEMA: &str = indoc! {r"
    type Task {
        id: ID!
        title: String! @search(by: [term])
        assignee: Person
    }

    type Person {
        username: String! @id
        tasks: [Task] @hasInverse(field: assignee)
    }
"};

#[tokio::test]
async fn nested_references_are_created_and_linked_both_ways() {
    let test = TestGateway::silent(TASK_SCHEMA);
    let anonymous = Claims::anonymous();

    let added = test
        .data(
            Request::new("addTask").argument(
                "input",
                json!([{ "title": "write docs", "assignee": { "username": "alice" } }]),
            ),
            &anonymous,
        )
        .await;
    assert_eq!(added["numUids"], json!(2));
    assert_eq!(added["task"][0]["assignee"]["username"], json!("alice"));

    // existing entities are linked, not duplicated
    let added = test
        .data(
            Request::new("addTask").argument(
                "input",
                json!([{ "title": "review docs", "assignee": { "username": "alice" } }]),
            ),
            &anonymous,
        )
        .await;
    assert_eq!(added["numUids"], json!(1));
    assert_eq!(test.count("Person"), 1);

    let person = test
        .data(Request::new("getPerson").argument("username", "alice"), &anonymous)
        .await;
    let titles: Vec<&Value> = person["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| &task["title"])
        .collect();
    assert_eq!(titles, [&json!("write docs"), &json!("review docs")]);
}

#[tokio::test]
async fn dangling_ids_are_rejected() {
    let test = TestGateway::silent(TASK_SCHEMA);

    let response = test
        .execute(
            Request::new("addPerson").argument("input", json!([{ "username": "alice", "tasks": [{ "id": "0x99" }] }])),
            &Claims::anonymous(),
        )
        .await;

    assert_eq!(response.to_json(), json!({ "data": { "addPerson": { "person": [], "numUids": 0 } } }));
    assert!(test.memory.is_empty());
}
