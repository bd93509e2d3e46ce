use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub status: Status,
    pub join_date: Date,
    pub birth_date: Option<Date>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    pub salary_cents: Option<i64>,
    #[sea_orm(indexed)]
    pub user_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    LeaveRequest,
    Payroll,
    Review,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(super::user::Entity)
                .from(Column::UserId)
                .to(super::user::Column::Id)
                .on_delete(ForeignKeyAction::SetNull)
                .into(),
            Relation::LeaveRequest => Entity::has_many(super::leave_request::Entity).into(),
            Relation::Payroll => Entity::has_many(super::payroll_record::Entity).into(),
            Relation::Review => Entity::has_many(super::performance_review::Entity).into(),
        }
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Status {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "on-leave")]
    OnLeave,
}

impl ActiveModelBehavior for ActiveModel {}
