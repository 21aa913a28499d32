//! SeaORM entity models
//!
//! The SIGET entity hierarchy:
//! Professional -> Patient -> AcademicRecord -> Session -> Activity

mod academic_record;
mod activity;
mod patient;
mod professional;
mod session;

pub use professional::{
    ActiveModel as ProfessionalActiveModel, Column as ProfessionalColumn,
    Entity as ProfessionalEntity, Model as Professional,
};

pub use patient::{
    ActiveModel as PatientActiveModel, Column as PatientColumn, Entity as PatientEntity,
    Model as Patient,
};

pub use academic_record::{
    ActiveModel as AcademicRecordActiveModel, Column as AcademicRecordColumn,
    Entity as AcademicRecordEntity, Model as AcademicRecord,
};

pub use session::{
    ActiveModel as SessionActiveModel, Column as SessionColumn, Entity as SessionEntity,
    Model as Session,
};

pub use activity::{
    ActiveModel as ActivityActiveModel, Column as ActivityColumn, Entity as ActivityEntity,
    Model as Activity,
};
