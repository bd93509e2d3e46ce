mod common;

use common::{create_user, exec_as, first_error};
use serde_json::json;

const CREATE: &str = r#"
    mutation Create($input: NewJobPostingInput!) {
        hr { createJobPosting(input: $input) { id title status postedAt applicantCount } }
    }
"#;

#[tokio::test]
async fn posting_lifecycle_draft_to_closed() {
    let env = common::setup_env().await;
    let manager = common::manager();

    let resp = exec_as(
        &env.schema,
        &manager,
        CREATE,
        json!({ "input": { "title": "Backend Engineer", "department": "Engineering" } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let created = resp.data.into_json().unwrap()["hr"]["createJobPosting"].clone();
    assert_eq!(created["status"], "DRAFT");
    assert!(created["postedAt"].is_null());
    assert_eq!(created["applicantCount"], 0);
    let posting_id = created["id"].as_str().unwrap().to_string();

    let close = r#"mutation Close($id: ID!) { hr { closeJobPosting(id: $id) { id status } } }"#;
    let resp = exec_as(&env.schema, &manager, close, json!({ "id": posting_id })).await;
    assert_eq!(first_error(&resp), "Job posting is not active");

    // Publishing a draft stamps its posted time.
    let update = r#"
        mutation Update($input: UpdateJobPostingInput!) {
            hr { updateJobPosting(input: $input) { id status postedAt } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &manager,
        update,
        json!({ "input": { "id": posting_id, "status": "ACTIVE" } }),
    )
    .await;
    assert!(resp.errors.is_empty());
    let published = resp.data.into_json().unwrap()["hr"]["updateJobPosting"].clone();
    assert_eq!(published["status"], "ACTIVE");
    assert!(published["postedAt"].is_string());

    let resp = exec_as(&env.schema, &manager, close, json!({ "id": posting_id })).await;
    assert!(resp.errors.is_empty());
    let closed = resp.data.into_json().unwrap()["hr"]["closeJobPosting"].clone();
    assert_eq!(closed["status"], "CLOSED");

    let resp = exec_as(&env.schema, &manager, close, json!({ "id": posting_id })).await;
    assert_eq!(first_error(&resp), "Job posting is not active");
}

#[tokio::test]
async fn postings_are_gated_and_filterable() {
    let env = common::setup_env().await;
    let worker = create_user(env.db.as_ref(), "applicant@test.io", api::auth::Role::Employee).await;

    let resp = exec_as(
        &env.schema,
        &worker,
        CREATE,
        json!({ "input": { "title": "Shadow Role" } }),
    )
    .await;
    assert_eq!(first_error(&resp), "Insufficient permissions");

    let admin = common::admin();
    for (title, status) in [("Open Role", "ACTIVE"), ("Parked Role", "DRAFT")] {
        let resp = exec_as(
            &env.schema,
            &admin,
            CREATE,
            json!({ "input": { "title": title, "status": status } }),
        )
        .await;
        assert!(resp.errors.is_empty());
    }

    // Any signed-in user can browse the board, filtered to live postings.
    let list = r#"
        query { hr { jobPostings(status: ACTIVE) { title status } } }
    "#;
    let resp = exec_as(&env.schema, &worker, list, json!({})).await;
    assert!(resp.errors.is_empty());
    let rows = resp.data.into_json().unwrap()["hr"]["jobPostings"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Open Role");
}
