use std::sync::Arc;
use std::time::Duration;

use api::auth::{AuthConfig, CurrentUser, Role};
use api::events::ChangeFeed;
use api::schema::{build_schema, AppSchema};
use async_graphql::{Request, Response, Schema, Variables};
use chrono::Utc;
use entity::{employee, user};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, Statement,
};
use serde_json::Value;
use uuid::Uuid;

pub type HrSchema = Schema<
    api::schema::QueryRoot,
    api::schema::MutationRoot,
    api::schema::SubscriptionRoot,
>;

pub struct TestEnv {
    pub db: Arc<DatabaseConnection>,
    pub schema: HrSchema,
    pub feed: Arc<ChangeFeed>,
}

#[allow(dead_code)]
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".into(),
        session_ttl_minutes: 60,
        role_lookup_timeout: Duration::from_secs(8),
    }
}

pub async fn setup_env() -> TestEnv {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(conn);
    bootstrap_sqlite(db.as_ref()).await;
    let feed = Arc::new(ChangeFeed::default());
    let AppSchema(schema) = build_schema(db.clone(), Arc::new(test_auth_config()), feed.clone());
    TestEnv { db, schema, feed }
}

#[allow(dead_code)]
pub fn admin() -> CurrentUser {
    CurrentUser {
        user_id: Uuid::new_v4(),
        role: Some(Role::Admin),
    }
}

#[allow(dead_code)]
pub fn manager() -> CurrentUser {
    CurrentUser {
        user_id: Uuid::new_v4(),
        role: Some(Role::Manager),
    }
}

#[allow(dead_code)]
pub fn employee_session(user_id: Uuid) -> CurrentUser {
    CurrentUser {
        user_id,
        role: Some(Role::Employee),
    }
}

/// Insert a backing user row so FK-carrying slices (attendance, leave,
/// reviews) can reference the session's user id.
#[allow(dead_code)]
pub async fn create_user(db: &DatabaseConnection, email: &str, role: Role) -> CurrentUser {
    let now = Utc::now().into();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.into()),
        display_name: Set(email.split('@').next().unwrap_or("user").to_string()),
        avatar_url: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    CurrentUser {
        user_id: model.id,
        role: Some(role),
    }
}

#[allow(dead_code)]
pub async fn create_employee(
    db: &DatabaseConnection,
    email: &str,
    user_id: Option<Uuid>,
) -> employee::Model {
    let now = Utc::now().into();
    employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_code: Set(None),
        first_name: Set("Test".into()),
        last_name: Set("Person".into()),
        email: Set(email.into()),
        phone: Set(None),
        department: Set(Some("Engineering".into())),
        position: Set(None),
        status: Set(employee::Status::Active),
        join_date: Set(chrono::Local::now().date_naive()),
        birth_date: Set(None),
        address: Set(None),
        avatar_url: Set(None),
        salary_cents: Set(Some(5_000_00)),
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

#[allow(dead_code)]
pub async fn exec_as(
    schema: &HrSchema,
    user: &CurrentUser,
    query: &str,
    vars: Value,
) -> Response {
    schema
        .execute(
            Request::new(query)
                .variables(Variables::from_json(vars))
                .data(user.clone()),
        )
        .await
}

#[allow(dead_code)]
pub async fn exec_anon(schema: &HrSchema, query: &str, vars: Value) -> Response {
    schema
        .execute(Request::new(query).variables(Variables::from_json(vars)))
        .await
}

#[allow(dead_code)]
pub fn first_error(resp: &Response) -> String {
    resp.errors
        .first()
        .map(|err| err.message.clone())
        .unwrap_or_default()
}

async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    for ddl in [
        r#"
        CREATE TABLE app_user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            avatar_url TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
        r#"
        CREATE TABLE user_secret (
            user_id TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE user_role (
            user_id TEXT PRIMARY KEY,
            role TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE employee (
            id TEXT PRIMARY KEY,
            employee_code TEXT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            department TEXT,
            position TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            join_date TEXT NOT NULL,
            birth_date TEXT,
            address TEXT,
            avatar_url TEXT,
            salary_cents INTEGER,
            user_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE SET NULL
        );
        "#,
        r#"
        CREATE TABLE attendance_record (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            check_in TEXT,
            check_out TEXT,
            status TEXT NOT NULL DEFAULT 'present',
            work_minutes INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, date),
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE leave_request (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            leave_type TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            days_count INTEGER NOT NULL,
            reason TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            approved_by TEXT,
            approved_at TEXT,
            rejection_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(employee_id) REFERENCES employee(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE payroll_record (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            base_salary_cents INTEGER NOT NULL,
            overtime_hours INTEGER NOT NULL DEFAULT 0,
            overtime_pay_cents INTEGER NOT NULL DEFAULT 0,
            bonus_cents INTEGER NOT NULL DEFAULT 0,
            bonus_reason TEXT,
            deductions_cents INTEGER NOT NULL DEFAULT 0,
            deduction_reason TEXT,
            insurance_cents INTEGER NOT NULL DEFAULT 0,
            tax_cents INTEGER NOT NULL DEFAULT 0,
            net_salary_cents INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            approved_by TEXT,
            approved_at TEXT,
            paid_at TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(employee_id, month, year),
            FOREIGN KEY(employee_id) REFERENCES employee(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE performance_review (
            id TEXT PRIMARY KEY,
            employee_id TEXT NOT NULL,
            reviewer_id TEXT NOT NULL,
            review_period_start TEXT NOT NULL,
            review_period_end TEXT NOT NULL,
            overall_rating TEXT NOT NULL,
            goals_achieved INTEGER,
            strengths TEXT,
            areas_for_improvement TEXT,
            goals_for_next_period TEXT,
            comments TEXT,
            employee_comments TEXT,
            is_acknowledged INTEGER NOT NULL DEFAULT 0,
            acknowledged_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(employee_id) REFERENCES employee(id) ON DELETE CASCADE,
            FOREIGN KEY(reviewer_id) REFERENCES app_user(id) ON DELETE CASCADE
        );
        "#,
        r#"
        CREATE TABLE job_posting (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            department TEXT,
            location TEXT,
            employment_type TEXT NOT NULL DEFAULT 'full-time',
            salary_range TEXT,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            applicant_count INTEGER NOT NULL DEFAULT 0,
            posted_at TEXT,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(created_by) REFERENCES app_user(id) ON DELETE SET NULL
        );
        "#,
    ] {
        db.execute(Statement::from_string(DatabaseBackend::Sqlite, ddl))
            .await
            .unwrap();
    }
}
