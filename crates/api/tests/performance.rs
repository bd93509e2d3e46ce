mod common;

use api::schema::rating_score;
use common::{create_employee, create_user, exec_as, first_error};
use entity::performance_review::Rating;
use serde_json::{json, Value};

#[test]
fn ratings_map_to_ordinal_scores() {
    assert_eq!(rating_score(Rating::Excellent), 5);
    assert_eq!(rating_score(Rating::Good), 4);
    assert_eq!(rating_score(Rating::Satisfactory), 3);
    assert_eq!(rating_score(Rating::NeedsImprovement), 2);
    assert_eq!(rating_score(Rating::Unsatisfactory), 1);
}

const CREATE: &str = r#"
    mutation Create($input: NewReviewInput!) {
        hr {
            createReview(input: $input) {
                id overallRating score goalsAchieved isAcknowledged reviewerId
            }
        }
    }
"#;

fn review_input(employee_id: &str) -> Value {
    json!({
        "input": {
            "employeeId": employee_id,
            "reviewPeriodStart": "2024-01-01",
            "reviewPeriodEnd": "2024-06-30",
            "overallRating": "GOOD",
            "goalsAchieved": 70,
            "strengths": "Ships reliably"
        }
    })
}

#[tokio::test]
async fn review_creation_is_admin_only_and_validated() {
    let env = common::setup_env().await;
    let admin = create_user(env.db.as_ref(), "reviewer@test.io", api::auth::Role::Admin).await;
    let employee = create_employee(env.db.as_ref(), "rated@test.io", None).await;
    let employee_id = employee.id.to_string();

    let resp = exec_as(&env.schema, &admin, CREATE, review_input(&employee_id)).await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let created = resp.data.into_json().unwrap()["hr"]["createReview"].clone();
    assert_eq!(created["overallRating"], "GOOD");
    assert_eq!(created["score"], 4);
    assert_eq!(created["isAcknowledged"], false);
    assert_eq!(created["reviewerId"], admin.user_id.to_string());

    let worker = create_user(env.db.as_ref(), "nobody@test.io", api::auth::Role::Employee).await;
    let resp = exec_as(&env.schema, &worker, CREATE, review_input(&employee_id)).await;
    assert_eq!(first_error(&resp), "Insufficient permissions");

    let mut bad_goals = review_input(&employee_id);
    bad_goals["input"]["goalsAchieved"] = json!(150);
    let resp = exec_as(&env.schema, &admin, CREATE, bad_goals).await;
    assert_eq!(first_error(&resp), "goalsAchieved must be between 0 and 100");

    let mut bad_period = review_input(&employee_id);
    bad_period["input"]["reviewPeriodEnd"] = json!("2023-12-31");
    let resp = exec_as(&env.schema, &admin, CREATE, bad_period).await;
    assert_eq!(
        first_error(&resp),
        "reviewPeriodEnd must be on or after reviewPeriodStart"
    );
}

#[tokio::test]
async fn acknowledgement_is_owner_only_and_single_shot() {
    let env = common::setup_env().await;
    let admin = create_user(env.db.as_ref(), "boss@test.io", api::auth::Role::Admin).await;
    let worker = create_user(env.db.as_ref(), "ack@test.io", api::auth::Role::Employee).await;
    let intruder = create_user(env.db.as_ref(), "peek@test.io", api::auth::Role::Employee).await;
    let employee = create_employee(env.db.as_ref(), "ack.emp@test.io", Some(worker.user_id)).await;

    let resp = exec_as(&env.schema, &admin, CREATE, review_input(&employee.id.to_string())).await;
    assert!(resp.errors.is_empty());
    let review_id = resp.data.into_json().unwrap()["hr"]["createReview"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let acknowledge = r#"
        mutation Ack($id: ID!, $comments: String) {
            hr {
                acknowledgeReview(id: $id, employeeComments: $comments) {
                    id isAcknowledged acknowledgedAt employeeComments
                }
            }
        }
    "#;
    let resp = exec_as(&env.schema, &intruder, acknowledge, json!({ "id": review_id })).await;
    assert_eq!(first_error(&resp), "Only the reviewed employee may acknowledge");

    let resp = exec_as(
        &env.schema,
        &worker,
        acknowledge,
        json!({ "id": review_id, "comments": "Thanks for the feedback" }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let acked = resp.data.into_json().unwrap()["hr"]["acknowledgeReview"].clone();
    assert_eq!(acked["isAcknowledged"], true);
    assert!(acked["acknowledgedAt"].is_string());
    assert_eq!(acked["employeeComments"], "Thanks for the feedback");

    let resp = exec_as(&env.schema, &worker, acknowledge, json!({ "id": review_id })).await;
    assert_eq!(first_error(&resp), "Review already acknowledged");
}

#[tokio::test]
async fn review_listing_is_scoped_to_own_employee() {
    let env = common::setup_env().await;
    let admin = create_user(env.db.as_ref(), "hr@test.io", api::auth::Role::Admin).await;
    let worker = create_user(env.db.as_ref(), "scope@test.io", api::auth::Role::Employee).await;
    let mine = create_employee(env.db.as_ref(), "scope.emp@test.io", Some(worker.user_id)).await;
    let other = create_employee(env.db.as_ref(), "elsewhere@test.io", None).await;

    for employee_id in [mine.id, other.id] {
        let resp = exec_as(
            &env.schema,
            &admin,
            CREATE,
            review_input(&employee_id.to_string()),
        )
        .await;
        assert!(resp.errors.is_empty());
    }

    let list = r#"query { hr { performanceReviews { id employeeId employee { firstName } } } }"#;
    let resp = exec_as(&env.schema, &worker, list, json!({})).await;
    assert!(resp.errors.is_empty());
    let rows = resp.data.into_json().unwrap()["hr"]["performanceReviews"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["employeeId"], mine.id.to_string());

    let resp = exec_as(&env.schema, &admin, list, json!({})).await;
    let rows = resp.data.into_json().unwrap()["hr"]["performanceReviews"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn update_review_merges_partial_fields() {
    let env = common::setup_env().await;
    let admin = create_user(env.db.as_ref(), "editor@test.io", api::auth::Role::Admin).await;
    let employee = create_employee(env.db.as_ref(), "edited@test.io", None).await;

    let resp = exec_as(&env.schema, &admin, CREATE, review_input(&employee.id.to_string())).await;
    assert!(resp.errors.is_empty());
    let review_id = resp.data.into_json().unwrap()["hr"]["createReview"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let update = r#"
        mutation Update($input: UpdateReviewInput!) {
            hr { updateReview(input: $input) { id overallRating score strengths goalsAchieved } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &admin,
        update,
        json!({ "input": { "id": review_id, "overallRating": "EXCELLENT" } }),
    )
    .await;
    assert!(resp.errors.is_empty());
    let updated = resp.data.into_json().unwrap()["hr"]["updateReview"].clone();
    assert_eq!(updated["overallRating"], "EXCELLENT");
    assert_eq!(updated["score"], 5);
    // Untouched fields survive the partial update.
    assert_eq!(updated["strengths"], "Ships reliably");
    assert_eq!(updated["goalsAchieved"], 70);
}
