//! Therapy session entity
//!
//! A container for rated activities within one academic record. Ownership is
//! derived transitively through `record.professional_id`, never stored here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub record_id: Uuid,

    pub session_date: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::academic_record::Entity",
        from = "Column::RecordId",
        to = "super::academic_record::Column::Id",
        on_delete = "Cascade"
    )]
    AcademicRecord,

    #[sea_orm(has_many = "super::activity::Entity", on_delete = "Cascade")]
    Activities,
}

impl Related<super::academic_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicRecord.def()
    }
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
