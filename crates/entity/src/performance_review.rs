use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "performance_review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub employee_id: Uuid,
    pub reviewer_id: Uuid,
    pub review_period_start: Date,
    pub review_period_end: Date,
    pub overall_rating: Rating,
    pub goals_achieved: Option<i32>,
    pub strengths: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub goals_for_next_period: Option<String>,
    pub comments: Option<String>,
    pub employee_comments: Option<String>,
    pub is_acknowledged: bool,
    pub acknowledged_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id",
        on_delete = "Cascade"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReviewerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Reviewer,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum Rating {
    #[sea_orm(string_value = "excellent")]
    Excellent,
    #[sea_orm(string_value = "good")]
    Good,
    #[sea_orm(string_value = "satisfactory")]
    Satisfactory,
    #[sea_orm(string_value = "needs_improvement")]
    NeedsImprovement,
    #[sea_orm(string_value = "unsatisfactory")]
    Unsatisfactory,
}

impl ActiveModelBehavior for ActiveModel {}
