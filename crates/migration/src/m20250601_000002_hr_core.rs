use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
#[sea_orm(iden = "app_user")]
enum AppUser {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Id,
    EmployeeCode,
    FirstName,
    LastName,
    Email,
    Phone,
    Department,
    Position,
    Status,
    JoinDate,
    BirthDate,
    Address,
    AvatarUrl,
    SalaryCents,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AttendanceRecord {
    Table,
    Id,
    UserId,
    Date,
    CheckIn,
    CheckOut,
    Status,
    WorkMinutes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LeaveRequest {
    Table,
    Id,
    EmployeeId,
    UserId,
    LeaveType,
    StartDate,
    EndDate,
    DaysCount,
    Reason,
    Status,
    ApprovedBy,
    ApprovedAt,
    RejectionReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PayrollRecord {
    Table,
    Id,
    EmployeeId,
    Month,
    Year,
    BaseSalaryCents,
    OvertimeHours,
    OvertimePayCents,
    BonusCents,
    BonusReason,
    DeductionsCents,
    DeductionReason,
    InsuranceCents,
    TaxCents,
    NetSalaryCents,
    Status,
    ApprovedBy,
    ApprovedAt,
    PaidAt,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PerformanceReview {
    Table,
    Id,
    EmployeeId,
    ReviewerId,
    ReviewPeriodStart,
    ReviewPeriodEnd,
    OverallRating,
    GoalsAchieved,
    Strengths,
    AreasForImprovement,
    GoalsForNextPeriod,
    Comments,
    EmployeeComments,
    IsAcknowledged,
    AcknowledgedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employee::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Employee::EmployeeCode).string_len(32))
                    .col(ColumnDef::new(Employee::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(Employee::LastName).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Employee::Email)
                            .string_len(320)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Employee::Phone).string_len(64))
                    .col(ColumnDef::new(Employee::Department).string_len(128))
                    .col(ColumnDef::new(Employee::Position).string_len(128))
                    .col(
                        ColumnDef::new(Employee::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Employee::JoinDate)
                            .date()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(ColumnDef::new(Employee::BirthDate).date())
                    .col(ColumnDef::new(Employee::Address).string_len(512))
                    .col(ColumnDef::new(Employee::AvatarUrl).string_len(512))
                    .col(ColumnDef::new(Employee::SalaryCents).big_integer())
                    .col(ColumnDef::new(Employee::UserId).uuid())
                    .col(
                        ColumnDef::new(Employee::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Employee::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_user")
                            .from(Employee::Table, Employee::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employee_user")
                    .table(Employee::Table)
                    .col(Employee::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AttendanceRecord::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(AttendanceRecord::UserId).uuid().not_null())
                    .col(ColumnDef::new(AttendanceRecord::Date).date().not_null())
                    .col(ColumnDef::new(AttendanceRecord::CheckIn).timestamp_with_time_zone())
                    .col(ColumnDef::new(AttendanceRecord::CheckOut).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AttendanceRecord::Status)
                            .string_len(16)
                            .not_null()
                            .default("present"),
                    )
                    .col(ColumnDef::new(AttendanceRecord::WorkMinutes).integer())
                    .col(
                        ColumnDef::new(AttendanceRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecord::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_user")
                            .from(AttendanceRecord::Table, AttendanceRecord::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_user_date")
                    .table(AttendanceRecord::Table)
                    .col(AttendanceRecord::UserId)
                    .col(AttendanceRecord::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LeaveRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LeaveRequest::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(LeaveRequest::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(LeaveRequest::UserId).uuid().not_null())
                    .col(ColumnDef::new(LeaveRequest::LeaveType).string_len(16).not_null())
                    .col(ColumnDef::new(LeaveRequest::StartDate).date().not_null())
                    .col(ColumnDef::new(LeaveRequest::EndDate).date().not_null())
                    .col(ColumnDef::new(LeaveRequest::DaysCount).integer().not_null())
                    .col(ColumnDef::new(LeaveRequest::Reason).text())
                    .col(
                        ColumnDef::new(LeaveRequest::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(LeaveRequest::ApprovedBy).uuid())
                    .col(ColumnDef::new(LeaveRequest::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(LeaveRequest::RejectionReason).text())
                    .col(
                        ColumnDef::new(LeaveRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(LeaveRequest::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leave_employee")
                            .from(LeaveRequest::Table, LeaveRequest::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leave_user")
                            .from(LeaveRequest::Table, LeaveRequest::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leave_employee")
                    .table(LeaveRequest::Table)
                    .col(LeaveRequest::EmployeeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PayrollRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PayrollRecord::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(PayrollRecord::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(PayrollRecord::Month).integer().not_null())
                    .col(ColumnDef::new(PayrollRecord::Year).integer().not_null())
                    .col(
                        ColumnDef::new(PayrollRecord::BaseSalaryCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PayrollRecord::OvertimeHours)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PayrollRecord::OvertimePayCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PayrollRecord::BonusCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PayrollRecord::BonusReason).text())
                    .col(
                        ColumnDef::new(PayrollRecord::DeductionsCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PayrollRecord::DeductionReason).text())
                    .col(
                        ColumnDef::new(PayrollRecord::InsuranceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PayrollRecord::TaxCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PayrollRecord::NetSalaryCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PayrollRecord::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(PayrollRecord::ApprovedBy).uuid())
                    .col(ColumnDef::new(PayrollRecord::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PayrollRecord::PaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PayrollRecord::Notes).text())
                    .col(
                        ColumnDef::new(PayrollRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(PayrollRecord::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payroll_employee")
                            .from(PayrollRecord::Table, PayrollRecord::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payroll_employee_period")
                    .table(PayrollRecord::Table)
                    .col(PayrollRecord::EmployeeId)
                    .col(PayrollRecord::Month)
                    .col(PayrollRecord::Year)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PerformanceReview::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PerformanceReview::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(PerformanceReview::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(PerformanceReview::ReviewerId).uuid().not_null())
                    .col(
                        ColumnDef::new(PerformanceReview::ReviewPeriodStart)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceReview::ReviewPeriodEnd)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceReview::OverallRating)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PerformanceReview::GoalsAchieved).integer())
                    .col(ColumnDef::new(PerformanceReview::Strengths).text())
                    .col(ColumnDef::new(PerformanceReview::AreasForImprovement).text())
                    .col(ColumnDef::new(PerformanceReview::GoalsForNextPeriod).text())
                    .col(ColumnDef::new(PerformanceReview::Comments).text())
                    .col(ColumnDef::new(PerformanceReview::EmployeeComments).text())
                    .col(
                        ColumnDef::new(PerformanceReview::IsAcknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PerformanceReview::AcknowledgedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PerformanceReview::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(PerformanceReview::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_employee")
                            .from(PerformanceReview::Table, PerformanceReview::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_reviewer")
                            .from(PerformanceReview::Table, PerformanceReview::ReviewerId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_employee")
                    .table(PerformanceReview::Table)
                    .col(PerformanceReview::EmployeeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PerformanceReview::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PayrollRecord::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LeaveRequest::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AttendanceRecord::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Employee::Table).to_owned())
            .await?;
        Ok(())
    }
}
