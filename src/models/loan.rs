use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
pub enum LoanStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "RETURNED")]
    Returned,
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub member_id: i32,
    pub copy_id: i32,
    pub borrowed_at: DateTimeUtc,
    /// Fixed at creation; never updated afterwards.
    pub due_at: DateTimeUtc,
    pub returned_at: Option<DateTimeUtc>,
    pub status: LoanStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Member,
    #[sea_orm(
        belongs_to = "super::copy::Entity",
        from = "Column::CopyId",
        to = "super::copy::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Copy,
    #[sea_orm(has_one = "super::fine::Entity")]
    Fine,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Copy.def()
    }
}

impl Related<super::fine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
