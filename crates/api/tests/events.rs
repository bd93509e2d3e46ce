mod common;

use std::time::Duration;

use api::events::{ChangeFeed, ChangeOp, ChangeTable};
use async_graphql::Request;
use common::{exec_as, first_error};
use futures_util::StreamExt;
use serde_json::json;
use uuid::Uuid;

#[test]
fn feed_delivers_to_subscribers() {
    let feed = ChangeFeed::new(8);
    let mut rx = feed.subscribe();
    let row_id = Uuid::new_v4();
    feed.publish(ChangeTable::Employee, ChangeOp::Insert, row_id, None);
    let event = rx.try_recv().unwrap();
    assert_eq!(event.table, ChangeTable::Employee);
    assert_eq!(event.op, ChangeOp::Insert);
    assert_eq!(event.row_id.as_str(), row_id.to_string());

    // Publishing without subscribers must not error.
    let quiet = ChangeFeed::new(8);
    quiet.publish(ChangeTable::UserRole, ChangeOp::Delete, Uuid::new_v4(), None);
}

#[tokio::test]
async fn mutations_publish_change_events() {
    let env = common::setup_env().await;
    let admin = common::admin();
    let mut rx = env.feed.subscribe();

    let create = r#"
        mutation {
            hr { createEmployee(input: { firstName: "Evt", lastName: "Src", email: "evt@test.io" }) { id } }
        }
    "#;
    let resp = exec_as(&env.schema, &admin, create, json!({})).await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let created_id = resp.data.into_json().unwrap()["hr"]["createEmployee"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let event = rx.try_recv().unwrap();
    assert_eq!(event.table, ChangeTable::Employee);
    assert_eq!(event.op, ChangeOp::Insert);
    assert_eq!(event.row_id.as_str(), created_id);
    assert_eq!(
        event.user_id.as_ref().map(|id| id.as_str().to_string()),
        Some(admin.user_id.to_string())
    );
}

#[tokio::test]
async fn subscription_stream_filters_by_table() {
    let env = common::setup_env().await;
    let admin = common::admin();

    let request = Request::new(
        "subscription { changes(table: LEAVE_REQUEST) { table op rowId } }",
    )
    .data(admin.clone());
    let mut stream = env.schema.execute_stream(request);
    let reader = tokio::spawn(async move { stream.next().await });
    // Give the subscriber a beat to attach before publishing.
    tokio::time::sleep(Duration::from_millis(50)).await;

    env.feed
        .publish(ChangeTable::Employee, ChangeOp::Insert, Uuid::new_v4(), None);
    let leave_id = Uuid::new_v4();
    env.feed
        .publish(ChangeTable::LeaveRequest, ChangeOp::Update, leave_id, None);

    let response = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .expect("subscription timed out")
        .unwrap()
        .expect("stream ended early");
    assert!(response.errors.is_empty(), "unexpected errors: {:?}", response.errors);
    let data = response.data.into_json().unwrap();
    assert_eq!(data["changes"]["table"], "LEAVE_REQUEST");
    assert_eq!(data["changes"]["op"], "UPDATE");
    assert_eq!(data["changes"]["rowId"], leave_id.to_string());
}

#[tokio::test]
async fn subscription_requires_authentication() {
    let env = common::setup_env().await;
    let mut stream = env
        .schema
        .execute_stream(Request::new("subscription { changes { table } }"));
    let response = stream.next().await.expect("expected an error response");
    assert_eq!(first_error(&response), "Login required");
}
