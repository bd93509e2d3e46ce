use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
#[sea_orm(iden = "app_user")]
enum AppUser {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum JobPosting {
    Table,
    Id,
    Title,
    Department,
    Location,
    EmploymentType,
    SalaryRange,
    Description,
    Status,
    ApplicantCount,
    PostedAt,
    CreatedBy,
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
                    .table(JobPosting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobPosting::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(JobPosting::Title).string_len(256).not_null())
                    .col(ColumnDef::new(JobPosting::Department).string_len(128))
                    .col(ColumnDef::new(JobPosting::Location).string_len(128))
                    .col(
                        ColumnDef::new(JobPosting::EmploymentType)
                            .string_len(16)
                            .not_null()
                            .default("full-time"),
                    )
                    .col(ColumnDef::new(JobPosting::SalaryRange).string_len(128))
                    .col(ColumnDef::new(JobPosting::Description).text())
                    .col(
                        ColumnDef::new(JobPosting::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(JobPosting::ApplicantCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(JobPosting::PostedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobPosting::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(JobPosting::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(JobPosting::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posting_creator")
                            .from(JobPosting::Table, JobPosting::CreatedBy)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posting_status")
                    .table(JobPosting::Table)
                    .col(JobPosting::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobPosting::Table).to_owned())
            .await?;
        Ok(())
    }
}
