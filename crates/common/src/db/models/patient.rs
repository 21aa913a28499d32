//! Patient entity
//!
//! Uniquely identified by `rut` (national-ID natural key) independent of the
//! internal id. The same physical patient maps to one row no matter how many
//! professionals register records for them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub full_name: String,

    /// Natural key correlating a patient across professionals
    #[sea_orm(column_type = "Text", unique)]
    pub rut: String,

    pub birth_date: Option<Date>,

    #[sea_orm(column_type = "Text", nullable)]
    pub guardian_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub guardian_phone: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub guardian_email: Option<String>,

    /// The professional who first registered the patient
    pub professional_id: Uuid,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::professional::Entity",
        from = "Column::ProfessionalId",
        to = "super::professional::Column::Id"
    )]
    Professional,

    #[sea_orm(has_many = "super::academic_record::Entity", on_delete = "Cascade")]
    AcademicRecords,
}

impl Related<super::professional::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Professional.def()
    }
}

impl Related<super::academic_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
