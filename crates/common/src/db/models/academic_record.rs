//! Academic record entity
//!
//! One yearly academic/therapy period for a patient, authored by one
//! professional. At most one record per `(patient_id, year)`; the check runs
//! at the application level before insert, on the same connection.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "academic_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub patient_id: Uuid,

    /// The authoring professional; ownership checks compare against this
    pub professional_id: Uuid,

    pub year: i32,

    #[sea_orm(column_type = "Text")]
    pub course: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub diagnosis: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id",
        on_delete = "Cascade"
    )]
    Patient,

    #[sea_orm(
        belongs_to = "super::professional::Entity",
        from = "Column::ProfessionalId",
        to = "super::professional::Column::Id"
    )]
    Professional,

    #[sea_orm(has_many = "super::session::Entity", on_delete = "Cascade")]
    Sessions,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::professional::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Professional.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
