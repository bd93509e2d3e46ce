use crate::auth::{issue_token, Action, AuthConfig, CurrentUser, Role, SESSION_COOKIE};
use crate::events::{ChangeEvent, ChangeFeed, ChangeOp, ChangeTable};
use std::{collections::HashMap, sync::Arc};

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_graphql::{
    Context, Enum, Error, ErrorExtensions, InputObject, Object, Schema, SimpleObject,
    Subscription, ID,
};
use chrono::{Local, NaiveDate, NaiveTime, Utc};
use entity::{
    attendance_record, employee, job_posting, leave_request, payroll_record, performance_review,
    user, user_role, user_secret,
};
use futures_util::Stream;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::info_span;
use uuid::Uuid;

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, SubscriptionRoot>);

pub fn build_schema(
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthConfig>,
    feed: Arc<ChangeFeed>,
) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(db)
        .data(auth)
        .data(feed)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;
pub struct SubscriptionRoot;

const MAX_LIST_PAGE: i32 = 200;

// ---------------------------------------------------------------------------
// Derived calculations. These are the only places the corresponding figures
// are produced; mutations call them rather than trusting client values.
// ---------------------------------------------------------------------------

pub fn net_salary_cents(
    base_salary_cents: i64,
    overtime_pay_cents: i64,
    bonus_cents: i64,
    deductions_cents: i64,
    insurance_cents: i64,
    tax_cents: i64,
) -> i64 {
    base_salary_cents + overtime_pay_cents + bonus_cents
        - deductions_cents
        - insurance_cents
        - tax_cents
}

/// Inclusive day span: a single-day request counts as 1.
pub fn inclusive_leave_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Late iff the local wall-clock hour is >= 9 with nonzero minutes, so
/// 09:00:xx still classifies as present. Kept exactly as the product defined
/// it; see DESIGN.md before changing the boundary.
pub fn classify_check_in(time: NaiveTime) -> attendance_record::Status {
    use chrono::Timelike;
    if time.hour() >= 9 && time.minute() > 0 {
        attendance_record::Status::Late
    } else {
        attendance_record::Status::Present
    }
}

/// A shift under four whole hours downgrades to half-day regardless of the
/// check-in classification; otherwise the check-in status stands.
pub fn checkout_status(
    check_in_status: attendance_record::Status,
    work_minutes: i64,
) -> attendance_record::Status {
    if work_minutes / 60 < 4 {
        attendance_record::Status::HalfDay
    } else {
        check_in_status
    }
}

pub fn rating_score(rating: performance_review::Rating) -> i32 {
    match rating {
        performance_review::Rating::Excellent => 5,
        performance_review::Rating::Good => 4,
        performance_review::Rating::Satisfactory => 3,
        performance_review::Rating::NeedsImprovement => 2,
        performance_review::Rating::Unsatisfactory => 1,
    }
}

pub fn format_work_duration(work_minutes: i32) -> String {
    format!("{} hours {} minutes", work_minutes / 60, work_minutes % 60)
}

// ---------------------------------------------------------------------------
// GraphQL enums
// ---------------------------------------------------------------------------

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AppRole {
    Admin,
    Manager,
    Employee,
}

impl From<Role> for AppRole {
    fn from(value: Role) -> Self {
        match value {
            Role::Admin => AppRole::Admin,
            Role::Manager => AppRole::Manager,
            Role::Employee => AppRole::Employee,
        }
    }
}

impl From<AppRole> for user_role::Role {
    fn from(value: AppRole) -> Self {
        match value {
            AppRole::Admin => user_role::Role::Admin,
            AppRole::Manager => user_role::Role::Manager,
            AppRole::Employee => user_role::Role::Employee,
        }
    }
}

impl From<user_role::Role> for AppRole {
    fn from(value: user_role::Role) -> Self {
        match value {
            user_role::Role::Admin => AppRole::Admin,
            user_role::Role::Manager => AppRole::Manager,
            user_role::Role::Employee => AppRole::Employee,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
}

impl From<EmployeeStatus> for employee::Status {
    fn from(value: EmployeeStatus) -> Self {
        match value {
            EmployeeStatus::Active => employee::Status::Active,
            EmployeeStatus::Inactive => employee::Status::Inactive,
            EmployeeStatus::OnLeave => employee::Status::OnLeave,
        }
    }
}

impl From<employee::Status> for EmployeeStatus {
    fn from(value: employee::Status) -> Self {
        match value {
            employee::Status::Active => EmployeeStatus::Active,
            employee::Status::Inactive => EmployeeStatus::Inactive,
            employee::Status::OnLeave => EmployeeStatus::OnLeave,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
}

impl From<attendance_record::Status> for AttendanceStatus {
    fn from(value: attendance_record::Status) -> Self {
        match value {
            attendance_record::Status::Present => AttendanceStatus::Present,
            attendance_record::Status::Absent => AttendanceStatus::Absent,
            attendance_record::Status::Late => AttendanceStatus::Late,
            attendance_record::Status::HalfDay => AttendanceStatus::HalfDay,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Maternity,
    Paternity,
    Unpaid,
}

impl From<LeaveType> for leave_request::LeaveType {
    fn from(value: LeaveType) -> Self {
        match value {
            LeaveType::Annual => leave_request::LeaveType::Annual,
            LeaveType::Sick => leave_request::LeaveType::Sick,
            LeaveType::Personal => leave_request::LeaveType::Personal,
            LeaveType::Maternity => leave_request::LeaveType::Maternity,
            LeaveType::Paternity => leave_request::LeaveType::Paternity,
            LeaveType::Unpaid => leave_request::LeaveType::Unpaid,
        }
    }
}

impl From<leave_request::LeaveType> for LeaveType {
    fn from(value: leave_request::LeaveType) -> Self {
        match value {
            leave_request::LeaveType::Annual => LeaveType::Annual,
            leave_request::LeaveType::Sick => LeaveType::Sick,
            leave_request::LeaveType::Personal => LeaveType::Personal,
            leave_request::LeaveType::Maternity => LeaveType::Maternity,
            leave_request::LeaveType::Paternity => LeaveType::Paternity,
            leave_request::LeaveType::Unpaid => LeaveType::Unpaid,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl From<LeaveStatus> for leave_request::Status {
    fn from(value: LeaveStatus) -> Self {
        match value {
            LeaveStatus::Pending => leave_request::Status::Pending,
            LeaveStatus::Approved => leave_request::Status::Approved,
            LeaveStatus::Rejected => leave_request::Status::Rejected,
            LeaveStatus::Cancelled => leave_request::Status::Cancelled,
        }
    }
}

impl From<leave_request::Status> for LeaveStatus {
    fn from(value: leave_request::Status) -> Self {
        match value {
            leave_request::Status::Pending => LeaveStatus::Pending,
            leave_request::Status::Approved => LeaveStatus::Approved,
            leave_request::Status::Rejected => LeaveStatus::Rejected,
            leave_request::Status::Cancelled => LeaveStatus::Cancelled,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum PayrollStatus {
    Draft,
    Pending,
    Approved,
    Paid,
}

impl From<PayrollStatus> for payroll_record::Status {
    fn from(value: PayrollStatus) -> Self {
        match value {
            PayrollStatus::Draft => payroll_record::Status::Draft,
            PayrollStatus::Pending => payroll_record::Status::Pending,
            PayrollStatus::Approved => payroll_record::Status::Approved,
            PayrollStatus::Paid => payroll_record::Status::Paid,
        }
    }
}

impl From<payroll_record::Status> for PayrollStatus {
    fn from(value: payroll_record::Status) -> Self {
        match value {
            payroll_record::Status::Draft => PayrollStatus::Draft,
            payroll_record::Status::Pending => PayrollStatus::Pending,
            payroll_record::Status::Approved => PayrollStatus::Approved,
            payroll_record::Status::Paid => PayrollStatus::Paid,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReviewRating {
    Excellent,
    Good,
    Satisfactory,
    NeedsImprovement,
    Unsatisfactory,
}

impl From<ReviewRating> for performance_review::Rating {
    fn from(value: ReviewRating) -> Self {
        match value {
            ReviewRating::Excellent => performance_review::Rating::Excellent,
            ReviewRating::Good => performance_review::Rating::Good,
            ReviewRating::Satisfactory => performance_review::Rating::Satisfactory,
            ReviewRating::NeedsImprovement => performance_review::Rating::NeedsImprovement,
            ReviewRating::Unsatisfactory => performance_review::Rating::Unsatisfactory,
        }
    }
}

impl From<performance_review::Rating> for ReviewRating {
    fn from(value: performance_review::Rating) -> Self {
        match value {
            performance_review::Rating::Excellent => ReviewRating::Excellent,
            performance_review::Rating::Good => ReviewRating::Good,
            performance_review::Rating::Satisfactory => ReviewRating::Satisfactory,
            performance_review::Rating::NeedsImprovement => ReviewRating::NeedsImprovement,
            performance_review::Rating::Unsatisfactory => ReviewRating::Unsatisfactory,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
}

impl From<EmploymentType> for job_posting::EmploymentType {
    fn from(value: EmploymentType) -> Self {
        match value {
            EmploymentType::FullTime => job_posting::EmploymentType::FullTime,
            EmploymentType::PartTime => job_posting::EmploymentType::PartTime,
            EmploymentType::Contract => job_posting::EmploymentType::Contract,
        }
    }
}

impl From<job_posting::EmploymentType> for EmploymentType {
    fn from(value: job_posting::EmploymentType) -> Self {
        match value {
            job_posting::EmploymentType::FullTime => EmploymentType::FullTime,
            job_posting::EmploymentType::PartTime => EmploymentType::PartTime,
            job_posting::EmploymentType::Contract => EmploymentType::Contract,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum PostingStatus {
    Draft,
    Active,
    Closed,
}

impl From<PostingStatus> for job_posting::Status {
    fn from(value: PostingStatus) -> Self {
        match value {
            PostingStatus::Draft => job_posting::Status::Draft,
            PostingStatus::Active => job_posting::Status::Active,
            PostingStatus::Closed => job_posting::Status::Closed,
        }
    }
}

impl From<job_posting::Status> for PostingStatus {
    fn from(value: job_posting::Status) -> Self {
        match value {
            job_posting::Status::Draft => PostingStatus::Draft,
            job_posting::Status::Active => PostingStatus::Active,
            job_posting::Status::Closed => PostingStatus::Closed,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, SimpleObject)]
pub struct UserNode {
    pub id: ID,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub role: Option<AppRole>,
    pub created_at: DateTimeWithTimeZone,
}

impl UserNode {
    fn from_model(model: user::Model, role: Option<Role>) -> Self {
        Self {
            id: ID(model.id.to_string()),
            email: model.email,
            display_name: model.display_name,
            avatar_url: model.avatar_url,
            is_active: model.is_active,
            role: role.map(AppRole::from),
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub user: UserNode,
    pub role: Option<AppRole>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuthPayload {
    pub ok: bool,
    pub user: Option<UserNode>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeeNode {
    pub id: ID,
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub status: EmployeeStatus,
    pub join_date: NaiveDate,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    pub salary_cents: Option<i64>,
    pub user_id: Option<ID>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<employee::Model> for EmployeeNode {
    fn from(model: employee::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_code: model.employee_code,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            department: model.department,
            position: model.position,
            status: model.status.into(),
            join_date: model.join_date,
            birth_date: model.birth_date,
            address: model.address,
            avatar_url: model.avatar_url,
            salary_cents: model.salary_cents,
            user_id: model.user_id.map(|id| ID(id.to_string())),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// The embedded shape other slices attach to their rows, mirroring the
/// relational embeds the list views request.
#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeeSummary {
    pub id: ID,
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
}

impl From<&employee::Model> for EmployeeSummary {
    fn from(model: &employee::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_code: model.employee_code.clone(),
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            department: model.department.clone(),
            position: model.position.clone(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendanceRecordNode {
    pub id: ID,
    pub user_id: ID,
    pub user_name: Option<String>,
    pub date: NaiveDate,
    pub check_in: Option<DateTimeWithTimeZone>,
    pub check_out: Option<DateTimeWithTimeZone>,
    pub status: AttendanceStatus,
    pub work_minutes: Option<i32>,
    pub work_hours: Option<String>,
}

impl AttendanceRecordNode {
    fn from_model(model: attendance_record::Model, user_name: Option<String>) -> Self {
        Self {
            id: ID(model.id.to_string()),
            user_id: ID(model.user_id.to_string()),
            user_name,
            date: model.date,
            check_in: model.check_in,
            check_out: model.check_out,
            status: model.status.into(),
            work_minutes: model.work_minutes,
            work_hours: model.work_minutes.map(format_work_duration),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct LeaveRequestNode {
    pub id: ID,
    pub employee_id: ID,
    pub user_id: ID,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_count: i32,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub approved_by: Option<ID>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub employee: Option<EmployeeSummary>,
}

impl LeaveRequestNode {
    fn from_model(model: leave_request::Model, employee: Option<EmployeeSummary>) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_id: ID(model.employee_id.to_string()),
            user_id: ID(model.user_id.to_string()),
            leave_type: model.leave_type.into(),
            start_date: model.start_date,
            end_date: model.end_date,
            days_count: model.days_count,
            reason: model.reason,
            status: model.status.into(),
            approved_by: model.approved_by.map(|id| ID(id.to_string())),
            approved_at: model.approved_at,
            rejection_reason: model.rejection_reason,
            created_at: model.created_at,
            employee,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PayrollNode {
    pub id: ID,
    pub employee_id: ID,
    pub month: i32,
    pub year: i32,
    pub base_salary_cents: i64,
    pub overtime_hours: i32,
    pub overtime_pay_cents: i64,
    pub bonus_cents: i64,
    pub bonus_reason: Option<String>,
    pub deductions_cents: i64,
    pub deduction_reason: Option<String>,
    pub insurance_cents: i64,
    pub tax_cents: i64,
    pub net_salary_cents: i64,
    pub status: PayrollStatus,
    pub approved_by: Option<ID>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub employee: Option<EmployeeSummary>,
}

impl PayrollNode {
    fn from_model(model: payroll_record::Model, employee: Option<EmployeeSummary>) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_id: ID(model.employee_id.to_string()),
            month: model.month,
            year: model.year,
            base_salary_cents: model.base_salary_cents,
            overtime_hours: model.overtime_hours,
            overtime_pay_cents: model.overtime_pay_cents,
            bonus_cents: model.bonus_cents,
            bonus_reason: model.bonus_reason,
            deductions_cents: model.deductions_cents,
            deduction_reason: model.deduction_reason,
            insurance_cents: model.insurance_cents,
            tax_cents: model.tax_cents,
            net_salary_cents: model.net_salary_cents,
            status: model.status.into(),
            approved_by: model.approved_by.map(|id| ID(id.to_string())),
            approved_at: model.approved_at,
            paid_at: model.paid_at,
            notes: model.notes,
            created_at: model.created_at,
            employee,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PerformanceReviewNode {
    pub id: ID,
    pub employee_id: ID,
    pub reviewer_id: ID,
    pub review_period_start: NaiveDate,
    pub review_period_end: NaiveDate,
    pub overall_rating: ReviewRating,
    pub score: i32,
    pub goals_achieved: Option<i32>,
    pub strengths: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub goals_for_next_period: Option<String>,
    pub comments: Option<String>,
    pub employee_comments: Option<String>,
    pub is_acknowledged: bool,
    pub acknowledged_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub employee: Option<EmployeeSummary>,
}

impl PerformanceReviewNode {
    fn from_model(model: performance_review::Model, employee: Option<EmployeeSummary>) -> Self {
        Self {
            id: ID(model.id.to_string()),
            employee_id: ID(model.employee_id.to_string()),
            reviewer_id: ID(model.reviewer_id.to_string()),
            review_period_start: model.review_period_start,
            review_period_end: model.review_period_end,
            score: rating_score(model.overall_rating),
            overall_rating: model.overall_rating.into(),
            goals_achieved: model.goals_achieved,
            strengths: model.strengths,
            areas_for_improvement: model.areas_for_improvement,
            goals_for_next_period: model.goals_for_next_period,
            comments: model.comments,
            employee_comments: model.employee_comments,
            is_acknowledged: model.is_acknowledged,
            acknowledged_at: model.acknowledged_at,
            created_at: model.created_at,
            employee,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct UserRoleNode {
    pub user_id: ID,
    pub role: AppRole,
    pub created_at: DateTimeWithTimeZone,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct JobPostingNode {
    pub id: ID,
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_range: Option<String>,
    pub description: Option<String>,
    pub status: PostingStatus,
    pub applicant_count: i32,
    pub posted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

impl From<job_posting::Model> for JobPostingNode {
    fn from(model: job_posting::Model) -> Self {
        Self {
            id: ID(model.id.to_string()),
            title: model.title,
            department: model.department,
            location: model.location,
            employment_type: model.employment_type.into(),
            salary_range: model.salary_range,
            description: model.description,
            status: model.status.into(),
            applicant_count: model.applicant_count,
            posted_at: model.posted_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeeStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub on_leave: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DepartmentCount {
    pub department: Option<String>,
    pub headcount: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendanceStats {
    pub present: i64,
    pub late: i64,
    pub half_day: i64,
    pub absent: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct LeaveStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PayrollStats {
    pub count: i64,
    pub total_net_cents: i64,
    pub total_bonus_cents: i64,
    pub pending: i64,
    pub paid: i64,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, InputObject)]
pub struct NewEmployeeInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub employee_code: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub join_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub salary_cents: Option<i64>,
    pub user_id: Option<ID>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateEmployeeInput {
    pub id: ID,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub employee_code: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub join_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub salary_cents: Option<i64>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewLeaveRequestInput {
    pub employee_id: ID,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_count: i32,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewPayrollInput {
    pub employee_id: ID,
    pub month: i32,
    pub year: i32,
    pub base_salary_cents: i64,
    pub overtime_hours: Option<i32>,
    pub overtime_pay_cents: Option<i64>,
    pub bonus_cents: Option<i64>,
    pub bonus_reason: Option<String>,
    pub deductions_cents: Option<i64>,
    pub deduction_reason: Option<String>,
    pub insurance_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdatePayrollInput {
    pub id: ID,
    pub base_salary_cents: Option<i64>,
    pub overtime_hours: Option<i32>,
    pub overtime_pay_cents: Option<i64>,
    pub bonus_cents: Option<i64>,
    pub bonus_reason: Option<String>,
    pub deductions_cents: Option<i64>,
    pub deduction_reason: Option<String>,
    pub insurance_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewReviewInput {
    pub employee_id: ID,
    pub review_period_start: NaiveDate,
    pub review_period_end: NaiveDate,
    pub overall_rating: ReviewRating,
    pub goals_achieved: Option<i32>,
    pub strengths: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub goals_for_next_period: Option<String>,
    pub comments: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateReviewInput {
    pub id: ID,
    pub overall_rating: Option<ReviewRating>,
    pub goals_achieved: Option<i32>,
    pub strengths: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub goals_for_next_period: Option<String>,
    pub comments: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewJobPostingInput {
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub salary_range: Option<String>,
    pub description: Option<String>,
    pub status: Option<PostingStatus>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateJobPostingInput {
    pub id: ID,
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub salary_range: Option<String>,
    pub description: Option<String>,
    pub status: Option<PostingStatus>,
}

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

#[Object]
impl QueryRoot {
    async fn hr(&self) -> HrQuery {
        HrQuery
    }
}

#[Object]
impl MutationRoot {
    async fn hr(&self) -> HrMutation {
        HrMutation
    }
}

#[derive(Default)]
pub struct HrQuery;

#[derive(Default)]
pub struct HrMutation;

#[Object]
impl HrQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let model = user::Entity::find_by_id(viewer.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "User not found"))?;
        Ok(MePayload {
            user: UserNode::from_model(model, viewer.role),
            role: viewer.role.map(AppRole::from),
        })
    }

    async fn employees(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
        status: Option<EmployeeStatus>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<EmployeeNode>> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_LIST_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let span = info_span!(
            "hr.employees.list",
            has_q = q.is_some(),
            scoped = !viewer.sees_all_records(),
            first = limit
        );
        let _guard = span.enter();

        let mut query = employee::Entity::find();
        if !viewer.sees_all_records() {
            query = query.filter(employee::Column::UserId.eq(viewer.user_id));
        }
        if let Some(status) = status {
            query = query.filter(employee::Column::Status.eq(employee::Status::from(status)));
        }
        if let Some(filter) = sanitize_optional_filter(q) {
            let pattern = format!("%{}%", filter.to_lowercase());
            let first_expr = Expr::expr(Func::lower(Expr::col(employee::Column::FirstName)));
            let last_expr = Expr::expr(Func::lower(Expr::col(employee::Column::LastName)));
            let email_expr = Expr::expr(Func::lower(Expr::col(employee::Column::Email)));
            query = query.filter(
                Condition::any()
                    .add(first_expr.like(pattern.clone()))
                    .add(last_expr.like(pattern.clone()))
                    .add(email_expr.like(pattern)),
            );
        }
        let rows = query
            .order_by_desc(employee::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(EmployeeNode::from).collect())
    }

    async fn employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<EmployeeNode>> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&id)?;
        let record = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = match record {
            Some(record) => record,
            None => return Ok(None),
        };
        if !viewer.sees_all_records() && record.user_id != Some(viewer.user_id) {
            return Err(error_with_code("FORBIDDEN", "Insufficient permissions"));
        }
        Ok(Some(record.into()))
    }

    async fn employee_stats(&self, ctx: &Context<'_>) -> async_graphql::Result<EmployeeStats> {
        require_capability(ctx, Action::ViewAllRecords)?;
        let db = database(ctx)?;
        let total = employee::Entity::find()
            .count(db.as_ref())
            .await
            .map_err(db_error)?;
        let mut by_status = [0u64; 3];
        for (idx, status) in [
            employee::Status::Active,
            employee::Status::Inactive,
            employee::Status::OnLeave,
        ]
        .into_iter()
        .enumerate()
        {
            by_status[idx] = employee::Entity::find()
                .filter(employee::Column::Status.eq(status))
                .count(db.as_ref())
                .await
                .map_err(db_error)?;
        }
        Ok(EmployeeStats {
            total: total as i64,
            active: by_status[0] as i64,
            inactive: by_status[1] as i64,
            on_leave: by_status[2] as i64,
        })
    }

    async fn department_breakdown(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<DepartmentCount>> {
        require_capability(ctx, Action::ViewAllRecords)?;
        let db = database(ctx)?;
        let rows = DepartmentRow::find_by_statement(Statement::from_string(
            db.get_database_backend(),
            "SELECT department, COUNT(*) AS headcount FROM employee GROUP BY department ORDER BY headcount DESC"
                .to_string(),
        ))
        .all(db.as_ref())
        .await
        .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|row| DepartmentCount {
                department: row.department,
                headcount: row.headcount,
            })
            .collect())
    }

    async fn attendance_records(
        &self,
        ctx: &Context<'_>,
        date: Option<NaiveDate>,
    ) -> async_graphql::Result<Vec<AttendanceRecordNode>> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let day = date.unwrap_or_else(|| Local::now().date_naive());
        let mut query = attendance_record::Entity::find()
            .filter(attendance_record::Column::Date.eq(day));
        if !viewer.sees_all_records() {
            query = query.filter(attendance_record::Column::UserId.eq(viewer.user_id));
        }
        let rows = query
            .order_by_asc(attendance_record::Column::CheckIn)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let names =
            display_names(db.as_ref(), rows.iter().map(|row| row.user_id).collect()).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let name = names.get(&row.user_id).cloned();
                AttendanceRecordNode::from_model(row, name)
            })
            .collect())
    }

    async fn today_attendance(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Option<AttendanceRecordNode>> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let today = Local::now().date_naive();
        let record = attendance_record::Entity::find()
            .filter(attendance_record::Column::UserId.eq(viewer.user_id))
            .filter(attendance_record::Column::Date.eq(today))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(record.map(|row| AttendanceRecordNode::from_model(row, None)))
    }

    async fn attendance_stats(
        &self,
        ctx: &Context<'_>,
        date: Option<NaiveDate>,
    ) -> async_graphql::Result<AttendanceStats> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let day = date.unwrap_or_else(|| Local::now().date_naive());
        let mut query = attendance_record::Entity::find()
            .filter(attendance_record::Column::Date.eq(day));
        if !viewer.sees_all_records() {
            query = query.filter(attendance_record::Column::UserId.eq(viewer.user_id));
        }
        let rows = query.all(db.as_ref()).await.map_err(db_error)?;
        let count = |status: attendance_record::Status| {
            rows.iter().filter(|row| row.status == status).count() as i64
        };
        Ok(AttendanceStats {
            present: count(attendance_record::Status::Present),
            late: count(attendance_record::Status::Late),
            half_day: count(attendance_record::Status::HalfDay),
            absent: count(attendance_record::Status::Absent),
        })
    }

    async fn leave_requests(
        &self,
        ctx: &Context<'_>,
        status: Option<LeaveStatus>,
    ) -> async_graphql::Result<Vec<LeaveRequestNode>> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let mut query = leave_request::Entity::find();
        if !viewer.sees_all_records() {
            query = query.filter(leave_request::Column::UserId.eq(viewer.user_id));
        }
        if let Some(status) = status {
            query = query.filter(leave_request::Column::Status.eq(leave_request::Status::from(status)));
        }
        let rows = query
            .order_by_desc(leave_request::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let summaries =
            employee_summaries(db.as_ref(), rows.iter().map(|row| row.employee_id).collect())
                .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let summary = summaries.get(&row.employee_id).cloned();
                LeaveRequestNode::from_model(row, summary)
            })
            .collect())
    }

    async fn leave_stats(&self, ctx: &Context<'_>) -> async_graphql::Result<LeaveStats> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let mut query = leave_request::Entity::find();
        if !viewer.sees_all_records() {
            query = query.filter(leave_request::Column::UserId.eq(viewer.user_id));
        }
        let rows = query.all(db.as_ref()).await.map_err(db_error)?;
        let count = |status: leave_request::Status| {
            rows.iter().filter(|row| row.status == status).count() as i64
        };
        Ok(LeaveStats {
            total: rows.len() as i64,
            pending: count(leave_request::Status::Pending),
            approved: count(leave_request::Status::Approved),
            rejected: count(leave_request::Status::Rejected),
        })
    }

    async fn payroll_records(
        &self,
        ctx: &Context<'_>,
        month: i32,
        year: i32,
    ) -> async_graphql::Result<Vec<PayrollNode>> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        validate_period(month, year)?;
        let span = info_span!("hr.payroll.list", month, year, scoped = !viewer.sees_all_records());
        let _guard = span.enter();

        let mut query = payroll_record::Entity::find()
            .filter(payroll_record::Column::Month.eq(month))
            .filter(payroll_record::Column::Year.eq(year));
        if !viewer.sees_all_records() {
            let own = employee_for_user(db.as_ref(), viewer.user_id).await?;
            match own {
                Some(own) => {
                    query = query.filter(payroll_record::Column::EmployeeId.eq(own.id));
                }
                None => return Ok(vec![]),
            }
        }
        let rows = query
            .order_by_desc(payroll_record::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let summaries =
            employee_summaries(db.as_ref(), rows.iter().map(|row| row.employee_id).collect())
                .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let summary = summaries.get(&row.employee_id).cloned();
                PayrollNode::from_model(row, summary)
            })
            .collect())
    }

    async fn payroll_stats(
        &self,
        ctx: &Context<'_>,
        month: i32,
        year: i32,
    ) -> async_graphql::Result<PayrollStats> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        validate_period(month, year)?;
        let mut query = payroll_record::Entity::find()
            .filter(payroll_record::Column::Month.eq(month))
            .filter(payroll_record::Column::Year.eq(year));
        if !viewer.sees_all_records() {
            let own = employee_for_user(db.as_ref(), viewer.user_id).await?;
            match own {
                Some(own) => {
                    query = query.filter(payroll_record::Column::EmployeeId.eq(own.id));
                }
                None => {
                    return Ok(PayrollStats {
                        count: 0,
                        total_net_cents: 0,
                        total_bonus_cents: 0,
                        pending: 0,
                        paid: 0,
                    })
                }
            }
        }
        let rows = query.all(db.as_ref()).await.map_err(db_error)?;
        let pending = rows
            .iter()
            .filter(|row| {
                matches!(
                    row.status,
                    payroll_record::Status::Draft | payroll_record::Status::Pending
                )
            })
            .count() as i64;
        let paid = rows
            .iter()
            .filter(|row| row.status == payroll_record::Status::Paid)
            .count() as i64;
        Ok(PayrollStats {
            count: rows.len() as i64,
            total_net_cents: rows.iter().map(|row| row.net_salary_cents).sum(),
            total_bonus_cents: rows.iter().map(|row| row.bonus_cents).sum(),
            pending,
            paid,
        })
    }

    async fn performance_reviews(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<PerformanceReviewNode>> {
        let viewer = require_user(ctx)?;
        let db = database(ctx)?;
        let mut query = performance_review::Entity::find();
        if !viewer.sees_all_records() {
            let own = employee_for_user(db.as_ref(), viewer.user_id).await?;
            match own {
                Some(own) => {
                    query = query.filter(performance_review::Column::EmployeeId.eq(own.id));
                }
                None => return Ok(vec![]),
            }
        }
        let rows = query
            .order_by_desc(performance_review::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let summaries =
            employee_summaries(db.as_ref(), rows.iter().map(|row| row.employee_id).collect())
                .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let summary = summaries.get(&row.employee_id).cloned();
                PerformanceReviewNode::from_model(row, summary)
            })
            .collect())
    }

    async fn user_roles(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<UserRoleNode>> {
        require_capability(ctx, Action::ManageRoles)?;
        let db = database(ctx)?;
        let rows = user_role::Entity::find()
            .order_by_desc(user_role::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let ids: Vec<Uuid> = rows.iter().map(|row| row.user_id).collect();
        let users = if ids.is_empty() {
            vec![]
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(ids))
                .all(db.as_ref())
                .await
                .map_err(db_error)?
        };
        let user_map: HashMap<Uuid, user::Model> =
            users.into_iter().map(|model| (model.id, model)).collect();
        Ok(rows
            .into_iter()
            .map(|row| {
                let user = user_map.get(&row.user_id);
                UserRoleNode {
                    user_id: ID(row.user_id.to_string()),
                    role: row.role.into(),
                    created_at: row.created_at,
                    email: user.map(|u| u.email.clone()),
                    display_name: user.map(|u| u.display_name.clone()),
                }
            })
            .collect())
    }

    async fn job_postings(
        &self,
        ctx: &Context<'_>,
        status: Option<PostingStatus>,
    ) -> async_graphql::Result<Vec<JobPostingNode>> {
        require_user(ctx)?;
        let db = database(ctx)?;
        let mut query = job_posting::Entity::find();
        if let Some(status) = status {
            query = query.filter(job_posting::Column::Status.eq(job_posting::Status::from(status)));
        }
        let rows = query
            .order_by_desc(job_posting::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(JobPostingNode::from).collect())
    }
}

#[Object]
impl HrMutation {
    async fn sign_up(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
        full_name: String,
    ) -> async_graphql::Result<AuthPayload> {
        let db = database(ctx)?;
        let email = normalize_email(&email)?;
        let display_name = validate_display_name(&full_name)?;
        if password.chars().count() < 8 {
            return Err(validation_error("Password must be at least 8 characters"));
        }
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        if existing.is_some() {
            return Ok(AuthPayload {
                ok: false,
                user: None,
                error: Some("Email already registered".into()),
            });
        }
        let password_hash = hash_password(&password)
            .map_err(|_| error_with_code("INTERNAL", "Failed to hash password"))?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let user_id = Uuid::new_v4();
        let txn = db.begin().await.map_err(db_error)?;
        user::ActiveModel {
            id: Set(user_id),
            email: Set(email),
            display_name: Set(display_name),
            avatar_url: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        user_secret::ActiveModel {
            user_id: Set(user_id),
            password_hash: Set(password_hash),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        // Every sign-up starts as a plain employee; promotion is an admin act.
        user_role::ActiveModel {
            user_id: Set(user_id),
            role: Set(user_role::Role::Employee),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;

        let feed = change_feed(ctx)?;
        feed.publish(ChangeTable::UserRole, ChangeOp::Insert, user_id, Some(user_id));
        let model = user::Entity::find_by_id(user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load new user"))?;
        Ok(AuthPayload {
            ok: true,
            user: Some(UserNode::from_model(model, Some(Role::Employee))),
            error: None,
        })
    }

    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        let db = database(ctx)?;
        let normalized = normalize_email(&email)?;
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(normalized))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(user) = user else {
            return Ok(invalid_credentials());
        };
        if !user.is_active {
            return Ok(AuthPayload {
                ok: false,
                user: None,
                error: Some("Account disabled".into()),
            });
        }
        let secret = user_secret::Entity::find_by_id(user.id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(secret) = secret else {
            return Ok(invalid_credentials());
        };
        let parsed_hash = PasswordHash::new(&secret.password_hash)
            .map_err(|_| error_with_code("INTERNAL", "Invalid password hash"))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(invalid_credentials());
        }
        let role_row = user_role::Entity::find_by_id(user.id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let role = crate::auth::resolve_role(role_row);
        let token = issue_token(user.id, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue session token"))?;
        append_session_cookie(ctx, &token, auth.session_ttl_minutes);
        Ok(AuthPayload {
            ok: true,
            user: Some(UserNode::from_model(user, role)),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        append_session_cookie(ctx, "", -1);
        Ok(true)
    }

    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: NewEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let current = require_capability(ctx, Action::ManageEmployees)?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        let first_name = require_nonempty("firstName", &input.first_name)?;
        let last_name = require_nonempty("lastName", &input.last_name)?;
        let existing = employee::Entity::find()
            .filter(employee::Column::Email.eq(email.clone()))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        if existing.is_some() {
            return Err(error_with_code("CONFLICT", "Employee email already exists"));
        }
        let linked_user = match &input.user_id {
            Some(id) => Some(parse_uuid(id)?),
            None => None,
        };
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_code: Set(input.employee_code),
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            phone: Set(input.phone),
            department: Set(input.department),
            position: Set(input.position),
            status: Set(input
                .status
                .map(employee::Status::from)
                .unwrap_or(employee::Status::Active)),
            join_date: Set(input.join_date.unwrap_or_else(|| Local::now().date_naive())),
            birth_date: Set(input.birth_date),
            address: Set(input.address),
            avatar_url: Set(None),
            salary_cents: Set(input.salary_cents),
            user_id: Set(linked_user),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::Employee,
            ChangeOp::Insert,
            record.id,
            Some(current.user_id),
        );
        Ok(record.into())
    }

    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        input: UpdateEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let current = require_capability(ctx, Action::ManageEmployees)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&input.id)?;
        let model = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        let mut active: employee::ActiveModel = model.into();
        if let Some(first_name) = input.first_name {
            active.first_name = Set(require_nonempty("firstName", &first_name)?);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(require_nonempty("lastName", &last_name)?);
        }
        if let Some(email) = input.email {
            active.email = Set(normalize_email(&email)?);
        }
        if let Some(code) = input.employee_code {
            active.employee_code = Set(Some(code));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(department) = input.department {
            active.department = Set(Some(department));
        }
        if let Some(position) = input.position {
            active.position = Set(Some(position));
        }
        if let Some(status) = input.status {
            active.status = Set(status.into());
        }
        if let Some(join_date) = input.join_date {
            active.join_date = Set(join_date);
        }
        if let Some(birth_date) = input.birth_date {
            active.birth_date = Set(Some(birth_date));
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(salary_cents) = input.salary_cents {
            active.salary_cents = Set(Some(salary_cents));
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::Employee,
            ChangeOp::Update,
            updated.id,
            Some(current.user_id),
        );
        Ok(updated.into())
    }

    async fn delete_employee(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let current = require_capability(ctx, Action::ManageEmployees)?;
        let db = database(ctx)?;
        let employee_id = parse_uuid(&id)?;
        let result = employee::Entity::delete_by_id(employee_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        if result.rows_affected == 0 {
            return Err(error_with_code("NOT_FOUND", "Employee not found"));
        }
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::Employee,
            ChangeOp::Delete,
            employee_id,
            Some(current.user_id),
        );
        Ok(true)
    }

    async fn check_in(&self, ctx: &Context<'_>) -> async_graphql::Result<AttendanceRecordNode> {
        let current = require_user(ctx)?;
        let db = database(ctx)?;
        let local_now = Local::now();
        let today = local_now.date_naive();
        let existing = attendance_record::Entity::find()
            .filter(attendance_record::Column::UserId.eq(current.user_id))
            .filter(attendance_record::Column::Date.eq(today))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        if existing.is_some() {
            return Err(error_with_code("CONFLICT", "Already checked in today"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record = attendance_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(current.user_id),
            date: Set(today),
            check_in: Set(Some(now)),
            check_out: Set(None),
            status: Set(classify_check_in(local_now.time())),
            work_minutes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::AttendanceRecord,
            ChangeOp::Insert,
            record.id,
            Some(current.user_id),
        );
        Ok(AttendanceRecordNode::from_model(record, None))
    }

    async fn check_out(&self, ctx: &Context<'_>) -> async_graphql::Result<AttendanceRecordNode> {
        let current = require_user(ctx)?;
        let db = database(ctx)?;
        let today = Local::now().date_naive();
        let record = attendance_record::Entity::find()
            .filter(attendance_record::Column::UserId.eq(current.user_id))
            .filter(attendance_record::Column::Date.eq(today))
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| validation_error("Not checked in today"))?;
        if record.check_out.is_some() {
            return Err(error_with_code("CONFLICT", "Already checked out today"));
        }
        let check_in = record
            .check_in
            .ok_or_else(|| error_with_code("INTERNAL", "Attendance record has no check-in"))?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let work_minutes = (now - check_in).num_minutes().max(0);
        let status = checkout_status(record.status, work_minutes);
        let record_id = record.id;
        let mut active: attendance_record::ActiveModel = record.into();
        active.check_out = Set(Some(now));
        active.work_minutes = Set(Some(work_minutes as i32));
        active.status = Set(status);
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::AttendanceRecord,
            ChangeOp::Update,
            record_id,
            Some(current.user_id),
        );
        Ok(AttendanceRecordNode::from_model(updated, None))
    }

    async fn create_leave_request(
        &self,
        ctx: &Context<'_>,
        input: NewLeaveRequestInput,
    ) -> async_graphql::Result<LeaveRequestNode> {
        let current = require_user(ctx)?;
        let db = database(ctx)?;
        if input.end_date < input.start_date {
            return Err(validation_error("endDate must be on or after startDate"));
        }
        let expected = inclusive_leave_days(input.start_date, input.end_date);
        if i64::from(input.days_count) != expected {
            return Err(validation_error(format!(
                "daysCount must equal the inclusive span ({} days)",
                expected
            )));
        }
        let employee_id = parse_uuid(&input.employee_id)?;
        let employee_row = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        if !current.sees_all_records() && employee_row.user_id != Some(current.user_id) {
            return Err(error_with_code("FORBIDDEN", "Insufficient permissions"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record = leave_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee_id),
            user_id: Set(current.user_id),
            leave_type: Set(input.leave_type.into()),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            days_count: Set(input.days_count),
            reason: Set(input.reason),
            status: Set(leave_request::Status::Pending),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::LeaveRequest,
            ChangeOp::Insert,
            record.id,
            Some(current.user_id),
        );
        let summary = EmployeeSummary::from(&employee_row);
        Ok(LeaveRequestNode::from_model(record, Some(summary)))
    }

    async fn approve_leave_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<LeaveRequestNode> {
        let current = require_capability(ctx, Action::ApproveLeave)?;
        let db = database(ctx)?;
        let request_id = parse_uuid(&id)?;
        let record = leave_request::Entity::find_by_id(request_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Leave request not found"))?;
        if record.status != leave_request::Status::Pending {
            return Err(error_with_code("CONFLICT", "Leave request is not pending"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: leave_request::ActiveModel = record.into();
        active.status = Set(leave_request::Status::Approved);
        active.approved_by = Set(Some(current.user_id));
        active.approved_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::LeaveRequest,
            ChangeOp::Update,
            request_id,
            Some(updated.user_id),
        );
        Ok(LeaveRequestNode::from_model(updated, None))
    }

    async fn reject_leave_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<LeaveRequestNode> {
        let current = require_capability(ctx, Action::ApproveLeave)?;
        let db = database(ctx)?;
        let request_id = parse_uuid(&id)?;
        let record = leave_request::Entity::find_by_id(request_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Leave request not found"))?;
        if record.status != leave_request::Status::Pending {
            return Err(error_with_code("CONFLICT", "Leave request is not pending"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: leave_request::ActiveModel = record.into();
        active.status = Set(leave_request::Status::Rejected);
        active.approved_by = Set(Some(current.user_id));
        active.approved_at = Set(Some(now));
        active.rejection_reason = Set(reason);
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::LeaveRequest,
            ChangeOp::Update,
            request_id,
            Some(updated.user_id),
        );
        Ok(LeaveRequestNode::from_model(updated, None))
    }

    async fn cancel_leave_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<LeaveRequestNode> {
        let current = require_user(ctx)?;
        let db = database(ctx)?;
        let request_id = parse_uuid(&id)?;
        let record = leave_request::Entity::find_by_id(request_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Leave request not found"))?;
        if record.user_id != current.user_id {
            return Err(error_with_code(
                "FORBIDDEN",
                "Only the requester may cancel a leave request",
            ));
        }
        if record.status != leave_request::Status::Pending {
            return Err(error_with_code("CONFLICT", "Leave request is not pending"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: leave_request::ActiveModel = record.into();
        active.status = Set(leave_request::Status::Cancelled);
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::LeaveRequest,
            ChangeOp::Update,
            request_id,
            Some(current.user_id),
        );
        Ok(LeaveRequestNode::from_model(updated, None))
    }

    async fn create_payroll(
        &self,
        ctx: &Context<'_>,
        input: NewPayrollInput,
    ) -> async_graphql::Result<PayrollNode> {
        let current = require_capability(ctx, Action::ManagePayroll)?;
        let db = database(ctx)?;
        validate_period(input.month, input.year)?;
        let employee_id = parse_uuid(&input.employee_id)?;
        let employee_row = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        let existing = payroll_record::Entity::find()
            .filter(payroll_record::Column::EmployeeId.eq(employee_id))
            .filter(payroll_record::Column::Month.eq(input.month))
            .filter(payroll_record::Column::Year.eq(input.year))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        if existing.is_some() {
            return Err(error_with_code(
                "CONFLICT",
                "Payroll already exists for this employee and period",
            ));
        }
        let overtime_pay = input.overtime_pay_cents.unwrap_or(0);
        let bonus = input.bonus_cents.unwrap_or(0);
        let deductions = input.deductions_cents.unwrap_or(0);
        let insurance = input.insurance_cents.unwrap_or(0);
        let tax = input.tax_cents.unwrap_or(0);
        let net = net_salary_cents(
            input.base_salary_cents,
            overtime_pay,
            bonus,
            deductions,
            insurance,
            tax,
        );
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record = payroll_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee_id),
            month: Set(input.month),
            year: Set(input.year),
            base_salary_cents: Set(input.base_salary_cents),
            overtime_hours: Set(input.overtime_hours.unwrap_or(0)),
            overtime_pay_cents: Set(overtime_pay),
            bonus_cents: Set(bonus),
            bonus_reason: Set(input.bonus_reason),
            deductions_cents: Set(deductions),
            deduction_reason: Set(input.deduction_reason),
            insurance_cents: Set(insurance),
            tax_cents: Set(tax),
            net_salary_cents: Set(net),
            status: Set(payroll_record::Status::Draft),
            approved_by: Set(None),
            approved_at: Set(None),
            paid_at: Set(None),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::PayrollRecord,
            ChangeOp::Insert,
            record.id,
            Some(current.user_id),
        );
        let summary = EmployeeSummary::from(&employee_row);
        Ok(PayrollNode::from_model(record, Some(summary)))
    }

    async fn update_payroll(
        &self,
        ctx: &Context<'_>,
        input: UpdatePayrollInput,
    ) -> async_graphql::Result<PayrollNode> {
        let current = require_capability(ctx, Action::ManagePayroll)?;
        let db = database(ctx)?;
        let payroll_id = parse_uuid(&input.id)?;
        let model = payroll_record::Entity::find_by_id(payroll_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Payroll record not found"))?;

        let component_changed = input.base_salary_cents.is_some()
            || input.overtime_pay_cents.is_some()
            || input.bonus_cents.is_some()
            || input.deductions_cents.is_some()
            || input.insurance_cents.is_some()
            || input.tax_cents.is_some();

        let base = input.base_salary_cents.unwrap_or(model.base_salary_cents);
        let overtime_pay = input.overtime_pay_cents.unwrap_or(model.overtime_pay_cents);
        let bonus = input.bonus_cents.unwrap_or(model.bonus_cents);
        let deductions = input.deductions_cents.unwrap_or(model.deductions_cents);
        let insurance = input.insurance_cents.unwrap_or(model.insurance_cents);
        let tax = input.tax_cents.unwrap_or(model.tax_cents);

        let mut active: payroll_record::ActiveModel = model.into();
        if let Some(value) = input.base_salary_cents {
            active.base_salary_cents = Set(value);
        }
        if let Some(value) = input.overtime_hours {
            active.overtime_hours = Set(value);
        }
        if let Some(value) = input.overtime_pay_cents {
            active.overtime_pay_cents = Set(value);
        }
        if let Some(value) = input.bonus_cents {
            active.bonus_cents = Set(value);
        }
        if let Some(value) = input.bonus_reason {
            active.bonus_reason = Set(Some(value));
        }
        if let Some(value) = input.deductions_cents {
            active.deductions_cents = Set(value);
        }
        if let Some(value) = input.deduction_reason {
            active.deduction_reason = Set(Some(value));
        }
        if let Some(value) = input.insurance_cents {
            active.insurance_cents = Set(value);
        }
        if let Some(value) = input.tax_cents {
            active.tax_cents = Set(value);
        }
        if let Some(value) = input.notes {
            active.notes = Set(Some(value));
        }
        if component_changed {
            active.net_salary_cents = Set(net_salary_cents(
                base,
                overtime_pay,
                bonus,
                deductions,
                insurance,
                tax,
            ));
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::PayrollRecord,
            ChangeOp::Update,
            payroll_id,
            Some(current.user_id),
        );
        Ok(PayrollNode::from_model(updated, None))
    }

    async fn approve_payroll(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<PayrollNode> {
        let current = require_capability(ctx, Action::ManagePayroll)?;
        let db = database(ctx)?;
        let payroll_id = parse_uuid(&id)?;
        let record = payroll_record::Entity::find_by_id(payroll_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Payroll record not found"))?;
        if !matches!(
            record.status,
            payroll_record::Status::Draft | payroll_record::Status::Pending
        ) {
            return Err(error_with_code("CONFLICT", "Payroll is not awaiting approval"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: payroll_record::ActiveModel = record.into();
        active.status = Set(payroll_record::Status::Approved);
        active.approved_by = Set(Some(current.user_id));
        active.approved_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::PayrollRecord,
            ChangeOp::Update,
            payroll_id,
            Some(current.user_id),
        );
        Ok(PayrollNode::from_model(updated, None))
    }

    async fn mark_payroll_paid(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<PayrollNode> {
        let current = require_capability(ctx, Action::ManagePayroll)?;
        let db = database(ctx)?;
        let payroll_id = parse_uuid(&id)?;
        let record = payroll_record::Entity::find_by_id(payroll_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Payroll record not found"))?;
        if record.status != payroll_record::Status::Approved {
            return Err(error_with_code("CONFLICT", "Payroll must be approved before payment"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: payroll_record::ActiveModel = record.into();
        active.status = Set(payroll_record::Status::Paid);
        active.paid_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::PayrollRecord,
            ChangeOp::Update,
            payroll_id,
            Some(current.user_id),
        );
        Ok(PayrollNode::from_model(updated, None))
    }

    async fn create_review(
        &self,
        ctx: &Context<'_>,
        input: NewReviewInput,
    ) -> async_graphql::Result<PerformanceReviewNode> {
        let current = require_capability(ctx, Action::ManageReviews)?;
        let db = database(ctx)?;
        if input.review_period_end < input.review_period_start {
            return Err(validation_error(
                "reviewPeriodEnd must be on or after reviewPeriodStart",
            ));
        }
        if let Some(goals) = input.goals_achieved {
            if !(0..=100).contains(&goals) {
                return Err(validation_error("goalsAchieved must be between 0 and 100"));
            }
        }
        let employee_id = parse_uuid(&input.employee_id)?;
        let employee_row = employee::Entity::find_by_id(employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record = performance_review::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee_id),
            reviewer_id: Set(current.user_id),
            review_period_start: Set(input.review_period_start),
            review_period_end: Set(input.review_period_end),
            overall_rating: Set(input.overall_rating.into()),
            goals_achieved: Set(input.goals_achieved),
            strengths: Set(input.strengths),
            areas_for_improvement: Set(input.areas_for_improvement),
            goals_for_next_period: Set(input.goals_for_next_period),
            comments: Set(input.comments),
            employee_comments: Set(None),
            is_acknowledged: Set(false),
            acknowledged_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::PerformanceReview,
            ChangeOp::Insert,
            record.id,
            Some(current.user_id),
        );
        let summary = EmployeeSummary::from(&employee_row);
        Ok(PerformanceReviewNode::from_model(record, Some(summary)))
    }

    async fn update_review(
        &self,
        ctx: &Context<'_>,
        input: UpdateReviewInput,
    ) -> async_graphql::Result<PerformanceReviewNode> {
        let current = require_capability(ctx, Action::ManageReviews)?;
        let db = database(ctx)?;
        let review_id = parse_uuid(&input.id)?;
        let model = performance_review::Entity::find_by_id(review_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Review not found"))?;
        if let Some(goals) = input.goals_achieved {
            if !(0..=100).contains(&goals) {
                return Err(validation_error("goalsAchieved must be between 0 and 100"));
            }
        }
        let mut active: performance_review::ActiveModel = model.into();
        if let Some(rating) = input.overall_rating {
            active.overall_rating = Set(rating.into());
        }
        if let Some(goals) = input.goals_achieved {
            active.goals_achieved = Set(Some(goals));
        }
        if let Some(value) = input.strengths {
            active.strengths = Set(Some(value));
        }
        if let Some(value) = input.areas_for_improvement {
            active.areas_for_improvement = Set(Some(value));
        }
        if let Some(value) = input.goals_for_next_period {
            active.goals_for_next_period = Set(Some(value));
        }
        if let Some(value) = input.comments {
            active.comments = Set(Some(value));
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::PerformanceReview,
            ChangeOp::Update,
            review_id,
            Some(current.user_id),
        );
        Ok(PerformanceReviewNode::from_model(updated, None))
    }

    async fn acknowledge_review(
        &self,
        ctx: &Context<'_>,
        id: ID,
        employee_comments: Option<String>,
    ) -> async_graphql::Result<PerformanceReviewNode> {
        let current = require_user(ctx)?;
        let db = database(ctx)?;
        let review_id = parse_uuid(&id)?;
        let record = performance_review::Entity::find_by_id(review_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Review not found"))?;
        let employee_row = employee::Entity::find_by_id(record.employee_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Employee not found"))?;
        if employee_row.user_id != Some(current.user_id) {
            return Err(error_with_code(
                "FORBIDDEN",
                "Only the reviewed employee may acknowledge",
            ));
        }
        if record.is_acknowledged {
            return Err(error_with_code("CONFLICT", "Review already acknowledged"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active: performance_review::ActiveModel = record.into();
        active.is_acknowledged = Set(true);
        active.acknowledged_at = Set(Some(now));
        active.employee_comments = Set(employee_comments);
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::PerformanceReview,
            ChangeOp::Update,
            review_id,
            Some(current.user_id),
        );
        let summary = EmployeeSummary::from(&employee_row);
        Ok(PerformanceReviewNode::from_model(updated, Some(summary)))
    }

    async fn assign_role(
        &self,
        ctx: &Context<'_>,
        user_id: ID,
        role: AppRole,
    ) -> async_graphql::Result<UserRoleNode> {
        let current = require_capability(ctx, Action::ManageRoles)?;
        let db = database(ctx)?;
        let target_id = parse_uuid(&user_id)?;
        let target = user::Entity::find_by_id(target_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "User not found"))?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let existing = user_role::Entity::find_by_id(target_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let row = match existing {
            Some(existing) => {
                let mut active: user_role::ActiveModel = existing.into();
                active.role = Set(role.into());
                active.update(db.as_ref()).await.map_err(db_error)?
            }
            None => {
                user_role::ActiveModel {
                    user_id: Set(target_id),
                    role: Set(role.into()),
                    created_at: Set(now),
                }
                .insert(db.as_ref())
                .await
                .map_err(db_error)?
            }
        };
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::UserRole,
            ChangeOp::Update,
            target_id,
            Some(current.user_id),
        );
        Ok(UserRoleNode {
            user_id: ID(row.user_id.to_string()),
            role: row.role.into(),
            created_at: row.created_at,
            email: Some(target.email),
            display_name: Some(target.display_name),
        })
    }

    async fn create_job_posting(
        &self,
        ctx: &Context<'_>,
        input: NewJobPostingInput,
    ) -> async_graphql::Result<JobPostingNode> {
        let current = require_capability(ctx, Action::ManagePostings)?;
        let db = database(ctx)?;
        let title = require_nonempty("title", &input.title)?;
        let status = input
            .status
            .map(job_posting::Status::from)
            .unwrap_or(job_posting::Status::Draft);
        let now: DateTimeWithTimeZone = Utc::now().into();
        let posted_at = (status == job_posting::Status::Active).then_some(now);
        let record = job_posting::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title),
            department: Set(input.department),
            location: Set(input.location),
            employment_type: Set(input
                .employment_type
                .map(job_posting::EmploymentType::from)
                .unwrap_or(job_posting::EmploymentType::FullTime)),
            salary_range: Set(input.salary_range),
            description: Set(input.description),
            status: Set(status),
            applicant_count: Set(0),
            posted_at: Set(posted_at),
            created_by: Set(Some(current.user_id)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::JobPosting,
            ChangeOp::Insert,
            record.id,
            Some(current.user_id),
        );
        Ok(record.into())
    }

    async fn update_job_posting(
        &self,
        ctx: &Context<'_>,
        input: UpdateJobPostingInput,
    ) -> async_graphql::Result<JobPostingNode> {
        let current = require_capability(ctx, Action::ManagePostings)?;
        let db = database(ctx)?;
        let posting_id = parse_uuid(&input.id)?;
        let model = job_posting::Entity::find_by_id(posting_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Job posting not found"))?;
        let was_draft = model.status == job_posting::Status::Draft;
        let mut active: job_posting::ActiveModel = model.into();
        if let Some(title) = input.title {
            active.title = Set(require_nonempty("title", &title)?);
        }
        if let Some(department) = input.department {
            active.department = Set(Some(department));
        }
        if let Some(location) = input.location {
            active.location = Set(Some(location));
        }
        if let Some(employment_type) = input.employment_type {
            active.employment_type = Set(employment_type.into());
        }
        if let Some(salary_range) = input.salary_range {
            active.salary_range = Set(Some(salary_range));
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        if let Some(status) = input.status {
            let next = job_posting::Status::from(status);
            if was_draft && next == job_posting::Status::Active {
                active.posted_at = Set(Some(now));
            }
            active.status = Set(next);
        }
        active.updated_at = Set(now);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::JobPosting,
            ChangeOp::Update,
            posting_id,
            Some(current.user_id),
        );
        Ok(updated.into())
    }

    async fn close_job_posting(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<JobPostingNode> {
        let current = require_capability(ctx, Action::ManagePostings)?;
        let db = database(ctx)?;
        let posting_id = parse_uuid(&id)?;
        let record = job_posting::Entity::find_by_id(posting_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Job posting not found"))?;
        if record.status != job_posting::Status::Active {
            return Err(error_with_code("CONFLICT", "Job posting is not active"));
        }
        let mut active: job_posting::ActiveModel = record.into();
        active.status = Set(job_posting::Status::Closed);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        let feed = change_feed(ctx)?;
        feed.publish(
            ChangeTable::JobPosting,
            ChangeOp::Update,
            posting_id,
            Some(current.user_id),
        );
        Ok(updated.into())
    }
}

#[Subscription]
impl SubscriptionRoot {
    /// Row-change feed. Events are re-fetch triggers only; subscribers run
    /// their usual filtered query when one arrives.
    async fn changes(
        &self,
        ctx: &Context<'_>,
        table: Option<ChangeTable>,
        user_id: Option<ID>,
    ) -> async_graphql::Result<impl Stream<Item = ChangeEvent>> {
        require_user(ctx)?;
        let feed = change_feed(ctx)?;
        let receiver = feed.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(move |event| {
            let event = event.ok()?;
            if let Some(wanted) = table {
                if event.table != wanted {
                    return None;
                }
            }
            if let Some(wanted) = &user_id {
                if event.user_id.as_ref() != Some(wanted) {
                    return None;
                }
            }
            Some(event)
        });
        Ok(stream)
    }
}

// ---------------------------------------------------------------------------
// Context + error helpers
// ---------------------------------------------------------------------------

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

fn change_feed(ctx: &Context<'_>) -> async_graphql::Result<Arc<ChangeFeed>> {
    ctx.data::<Arc<ChangeFeed>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing change feed"))
}

fn require_user(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    ctx.data::<CurrentUser>()
        .cloned()
        .map_err(|_| error_with_code("UNAUTHENTICATED", "Login required"))
}

fn require_capability(ctx: &Context<'_>, action: Action) -> async_graphql::Result<CurrentUser> {
    let user = require_user(ctx)?;
    if user.can(action) {
        Ok(user)
    } else {
        Err(error_with_code("FORBIDDEN", "Insufficient permissions"))
    }
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

fn validation_error(message: impl Into<String>) -> Error {
    error_with_code("VALIDATION", message)
}

fn invalid_credentials() -> AuthPayload {
    AuthPayload {
        ok: false,
        user: None,
        error: Some("Invalid credentials".into()),
    }
}

fn append_session_cookie(ctx: &Context<'_>, token: &str, ttl_minutes: i64) {
    let max_age = (ttl_minutes.max(0) * 60).to_string();
    let cookie = if ttl_minutes < 0 {
        format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE)
    } else {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, token, max_age
        )
    };
    ctx.append_http_header("Set-Cookie", cookie);
}

fn normalize_email(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(validation_error("Invalid email address"));
    }
    Ok(trimmed)
}

fn validate_display_name(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error("fullName is required"));
    }
    if trimmed.chars().count() > 100 {
        return Err(validation_error("fullName must be <= 100 characters"));
    }
    Ok(trimmed.to_string())
}

fn require_nonempty(field: &str, value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn validate_period(month: i32, year: i32) -> async_graphql::Result<()> {
    if !(1..=12).contains(&month) {
        return Err(validation_error("month must be between 1 and 12"));
    }
    if !(2000..=2100).contains(&year) {
        return Err(validation_error("year is out of range"));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> argon2::password_hash::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

#[derive(Debug, FromQueryResult)]
struct DepartmentRow {
    department: Option<String>,
    headcount: i64,
}

async fn employee_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> async_graphql::Result<Option<employee::Model>> {
    employee::Entity::find()
        .filter(employee::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(db_error)
}

async fn employee_summaries(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> async_graphql::Result<HashMap<Uuid, EmployeeSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = employee::Entity::find()
        .filter(employee::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(rows
        .iter()
        .map(|model| (model.id, EmployeeSummary::from(model)))
        .collect())
}

async fn display_names(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> async_graphql::Result<HashMap<Uuid, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(rows
        .into_iter()
        .map(|model| (model.id, model.display_name))
        .collect())
}

// ---------------------------------------------------------------------------
// Demo seed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SeededHrRecords {
    pub users: Vec<user::Model>,
    pub employees: Vec<employee::Model>,
}

impl SeededHrRecords {
    pub fn user_email(&self, email: &str) -> Option<&user::Model> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn employee_email(&self, email: &str) -> Option<&employee::Model> {
        self.employees.iter().find(|e| e.email == email)
    }
}

pub async fn seed_hr_demo(db: &DatabaseConnection) -> Result<SeededHrRecords, DbErr> {
    let seeded_at: DateTimeWithTimeZone = Utc::now().into();
    let admin = insert_seed_user(db, "admin@hrm.test", "Admin An", user_role::Role::Admin, "adminpass").await?;
    let manager = insert_seed_user(
        db,
        "manager@hrm.test",
        "Manager Minh",
        user_role::Role::Manager,
        "managerpass",
    )
    .await?;
    let worker = insert_seed_user(
        db,
        "employee@hrm.test",
        "Employee Em",
        user_role::Role::Employee,
        "employeepass",
    )
    .await?;

    let mut employees = Vec::new();
    for (code, first, last, email, department, position, salary, user_id) in [
        (
            "EMP001",
            "An",
            "Nguyen",
            "an.nguyen@hrm.test",
            "Engineering",
            "Platform Lead",
            9_000_00i64,
            Some(admin.id),
        ),
        (
            "EMP002",
            "Minh",
            "Tran",
            "minh.tran@hrm.test",
            "Engineering",
            "Engineering Manager",
            8_000_00,
            Some(manager.id),
        ),
        (
            "EMP003",
            "Em",
            "Le",
            "em.le@hrm.test",
            "Design",
            "Product Designer",
            5_500_00,
            Some(worker.id),
        ),
    ] {
        let record = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_code: Set(Some(code.into())),
            first_name: Set(first.into()),
            last_name: Set(last.into()),
            email: Set(email.into()),
            phone: Set(None),
            department: Set(Some(department.into())),
            position: Set(Some(position.into())),
            status: Set(employee::Status::Active),
            join_date: Set(Local::now().date_naive()),
            birth_date: Set(None),
            address: Set(None),
            avatar_url: Set(None),
            salary_cents: Set(Some(salary)),
            user_id: Set(user_id),
            created_at: Set(seeded_at),
            updated_at: Set(seeded_at),
        }
        .insert(db)
        .await?;
        employees.push(record);
    }

    let designer = employees[2].clone();
    leave_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(designer.id),
        user_id: Set(worker.id),
        leave_type: Set(leave_request::LeaveType::Annual),
        start_date: Set(Local::now().date_naive()),
        end_date: Set(Local::now().date_naive()),
        days_count: Set(1),
        reason: Set(Some("Family matters".into())),
        status: Set(leave_request::Status::Pending),
        approved_by: Set(None),
        approved_at: Set(None),
        rejection_reason: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let now = Local::now();
    use chrono::Datelike;
    payroll_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(designer.id),
        month: Set(now.month() as i32),
        year: Set(now.year()),
        base_salary_cents: Set(5_500_00),
        overtime_hours: Set(0),
        overtime_pay_cents: Set(0),
        bonus_cents: Set(500_00),
        bonus_reason: Set(Some("Launch bonus".into())),
        deductions_cents: Set(0),
        deduction_reason: Set(None),
        insurance_cents: Set(220_00),
        tax_cents: Set(480_00),
        net_salary_cents: Set(net_salary_cents(5_500_00, 0, 500_00, 0, 220_00, 480_00)),
        status: Set(payroll_record::Status::Draft),
        approved_by: Set(None),
        approved_at: Set(None),
        paid_at: Set(None),
        notes: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    job_posting::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Senior Backend Engineer".into()),
        department: Set(Some("Engineering".into())),
        location: Set(Some("Remote".into())),
        employment_type: Set(job_posting::EmploymentType::FullTime),
        salary_range: Set(Some("Negotiable".into())),
        description: Set(Some("Own the HR platform services.".into())),
        status: Set(job_posting::Status::Active),
        applicant_count: Set(0),
        posted_at: Set(Some(seeded_at)),
        created_by: Set(Some(admin.id)),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    Ok(SeededHrRecords {
        users: vec![admin, manager, worker],
        employees,
    })
}

async fn insert_seed_user(
    db: &DatabaseConnection,
    email: &str,
    display_name: &str,
    role: user_role::Role,
    password: &str,
) -> Result<user::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let user_id = Uuid::new_v4();
    let password_hash = hash_password(password)
        .map_err(|err| DbErr::Custom(format!("failed to hash seed password: {}", err)))?;
    let model = user::ActiveModel {
        id: Set(user_id),
        email: Set(email.into()),
        display_name: Set(display_name.into()),
        avatar_url: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    user_secret::ActiveModel {
        user_id: Set(user_id),
        password_hash: Set(password_hash),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    user_role::ActiveModel {
        user_id: Set(user_id),
        role: Set(role),
        created_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}
