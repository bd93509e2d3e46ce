mod common;

use api::schema::net_salary_cents;
use common::{create_employee, create_user, exec_as, first_error};
use serde_json::{json, Value};

#[test]
fn net_salary_combines_components() {
    assert_eq!(net_salary_cents(5_000_00, 500_00, 300_00, 200_00, 100_00, 400_00), 5_100_00);
    assert_eq!(net_salary_cents(1_000_00, 0, 0, 0, 0, 0), 1_000_00);
    // Nothing clamps the figure; deductions can push it negative.
    assert_eq!(net_salary_cents(100_00, 0, 0, 200_00, 0, 0), -100_00);
}

const CREATE: &str = r#"
    mutation Create($input: NewPayrollInput!) {
        hr {
            createPayroll(input: $input) {
                id status netSalaryCents baseSalaryCents bonusCents
                employee { firstName }
            }
        }
    }
"#;

fn payroll_input(employee_id: &str, month: i32) -> Value {
    json!({
        "input": {
            "employeeId": employee_id,
            "month": month,
            "year": 2024,
            "baseSalaryCents": 5_000_00i64,
            "overtimePayCents": 500_00i64,
            "bonusCents": 300_00i64,
            "deductionsCents": 200_00i64,
            "insuranceCents": 100_00i64,
            "taxCents": 400_00i64
        }
    })
}

#[tokio::test]
async fn create_derives_net_salary() {
    let env = common::setup_env().await;
    let admin = common::admin();
    let employee = create_employee(env.db.as_ref(), "paid@test.io", None).await;

    let resp = exec_as(
        &env.schema,
        &admin,
        CREATE,
        payroll_input(&employee.id.to_string(), 1),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let created = resp.data.into_json().unwrap()["hr"]["createPayroll"].clone();
    assert_eq!(created["status"], "DRAFT");
    assert_eq!(created["netSalaryCents"], 5_100_00i64);

    // Same employee + period is a conflict.
    let resp = exec_as(
        &env.schema,
        &admin,
        CREATE,
        payroll_input(&employee.id.to_string(), 1),
    )
    .await;
    assert_eq!(
        first_error(&resp),
        "Payroll already exists for this employee and period"
    );

    let resp = exec_as(
        &env.schema,
        &admin,
        CREATE,
        payroll_input(&employee.id.to_string(), 13),
    )
    .await;
    assert_eq!(first_error(&resp), "month must be between 1 and 12");
}

#[tokio::test]
async fn update_recomputes_net_only_when_components_change() {
    let env = common::setup_env().await;
    let admin = common::admin();
    let employee = create_employee(env.db.as_ref(), "update@test.io", None).await;

    let resp = exec_as(
        &env.schema,
        &admin,
        CREATE,
        payroll_input(&employee.id.to_string(), 2),
    )
    .await;
    assert!(resp.errors.is_empty());
    let payroll_id = resp.data.into_json().unwrap()["hr"]["createPayroll"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let update = r#"
        mutation Update($input: UpdatePayrollInput!) {
            hr { updatePayroll(input: $input) { id netSalaryCents bonusCents notes } }
        }
    "#;
    // Notes-only edit leaves the derived figure alone.
    let resp = exec_as(
        &env.schema,
        &admin,
        update,
        json!({ "input": { "id": payroll_id, "notes": "reviewed" } }),
    )
    .await;
    assert!(resp.errors.is_empty());
    let updated = resp.data.into_json().unwrap()["hr"]["updatePayroll"].clone();
    assert_eq!(updated["netSalaryCents"], 5_100_00i64);
    assert_eq!(updated["notes"], "reviewed");

    // A component edit recomputes from the merged component set.
    let resp = exec_as(
        &env.schema,
        &admin,
        update,
        json!({ "input": { "id": payroll_id, "bonusCents": 800_00i64 } }),
    )
    .await;
    assert!(resp.errors.is_empty());
    let updated = resp.data.into_json().unwrap()["hr"]["updatePayroll"].clone();
    assert_eq!(updated["bonusCents"], 800_00i64);
    assert_eq!(updated["netSalaryCents"], 5_600_00i64);
}

#[tokio::test]
async fn status_transitions_form_a_one_way_chain() {
    let env = common::setup_env().await;
    let admin = common::admin();
    let employee = create_employee(env.db.as_ref(), "chain@test.io", None).await;

    let resp = exec_as(
        &env.schema,
        &admin,
        CREATE,
        payroll_input(&employee.id.to_string(), 3),
    )
    .await;
    assert!(resp.errors.is_empty());
    let payroll_id = resp.data.into_json().unwrap()["hr"]["createPayroll"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let mark_paid = r#"
        mutation Paid($id: ID!) { hr { markPayrollPaid(id: $id) { id status paidAt } } }
    "#;
    let resp = exec_as(&env.schema, &admin, mark_paid, json!({ "id": payroll_id })).await;
    assert_eq!(first_error(&resp), "Payroll must be approved before payment");

    let approve = r#"
        mutation Approve($id: ID!) { hr { approvePayroll(id: $id) { id status approvedBy approvedAt } } }
    "#;
    let resp = exec_as(&env.schema, &admin, approve, json!({ "id": payroll_id })).await;
    assert!(resp.errors.is_empty());
    let approved = resp.data.into_json().unwrap()["hr"]["approvePayroll"].clone();
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["approvedBy"], admin.user_id.to_string());

    let resp = exec_as(&env.schema, &admin, approve, json!({ "id": payroll_id })).await;
    assert_eq!(first_error(&resp), "Payroll is not awaiting approval");

    let resp = exec_as(&env.schema, &admin, mark_paid, json!({ "id": payroll_id })).await;
    assert!(resp.errors.is_empty());
    let paid = resp.data.into_json().unwrap()["hr"]["markPayrollPaid"].clone();
    assert_eq!(paid["status"], "PAID");
    assert!(paid["paidAt"].is_string());

    let resp = exec_as(&env.schema, &admin, mark_paid, json!({ "id": payroll_id })).await;
    assert_eq!(first_error(&resp), "Payroll must be approved before payment");
}

#[tokio::test]
async fn payroll_is_admin_only_and_scoped() {
    let env = common::setup_env().await;
    let manager = common::manager();
    let worker = create_user(env.db.as_ref(), "scoped@test.io", api::auth::Role::Employee).await;
    let own = create_employee(env.db.as_ref(), "scoped.emp@test.io", Some(worker.user_id)).await;
    let other = create_employee(env.db.as_ref(), "unscoped.emp@test.io", None).await;

    // Managers see payroll but cannot create it.
    let resp = exec_as(
        &env.schema,
        &manager,
        CREATE,
        payroll_input(&own.id.to_string(), 4),
    )
    .await;
    assert_eq!(first_error(&resp), "Insufficient permissions");

    let admin = common::admin();
    for employee_id in [own.id, other.id] {
        let resp = exec_as(
            &env.schema,
            &admin,
            CREATE,
            payroll_input(&employee_id.to_string(), 4),
        )
        .await;
        assert!(resp.errors.is_empty());
    }

    let list = r#"
        query List($month: Int!, $year: Int!) {
            hr { payrollRecords(month: $month, year: $year) { id employeeId } }
        }
    "#;
    let resp = exec_as(&env.schema, &worker, list, json!({ "month": 4, "year": 2024 })).await;
    assert!(resp.errors.is_empty());
    let rows = resp.data.into_json().unwrap()["hr"]["payrollRecords"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["employeeId"], own.id.to_string());

    let resp = exec_as(&env.schema, &manager, list, json!({ "month": 4, "year": 2024 })).await;
    let rows = resp.data.into_json().unwrap()["hr"]["payrollRecords"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 2);

    let stats = r#"
        query Stats($month: Int!, $year: Int!) {
            hr { payrollStats(month: $month, year: $year) { count totalNetCents pending paid } }
        }
    "#;
    let resp = exec_as(&env.schema, &manager, stats, json!({ "month": 4, "year": 2024 })).await;
    let data = resp.data.into_json().unwrap()["hr"]["payrollStats"].clone();
    assert_eq!(data["count"], 2);
    assert_eq!(data["totalNetCents"], 2 * 5_100_00i64);
    assert_eq!(data["pending"], 2);
    assert_eq!(data["paid"], 0);
}
