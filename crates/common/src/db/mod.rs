//! Database layer for SIGET
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Transactional composite operations
//! - Ownership authorization helpers
//! - Connection pool management and schema initialization

pub mod models;
mod ops;
mod ownership;
mod repository;

pub use ops::PatientWithRecord;
pub use ownership::{assert_record_owner, assert_session_owner};
pub use repository::{
    CurrentPatientRow, NewAcademicRecord, NewActivity, NewPatient, NewSession, PatientHistory,
    PatientPatch, ProfessionalPatch, RecordPatch, RecordReportData, Repository, SessionReportData,
    SessionWithActivities,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper.
///
/// The connection is held behind an `Arc`: `DatabaseConnection` is only
/// `Clone` for real backends, and the pool must stay cloneable when the
/// mock backend is compiled in for tests.
#[derive(Clone)]
pub struct DbPool {
    conn: Arc<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Wrap an existing connection (used by tests with a mock backend)
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Recover the connection, e.g. to inspect a mock transaction log
    #[cfg(test)]
    pub(crate) fn into_inner(self) -> DatabaseConnection {
        Arc::try_unwrap(self.conn).expect("connection still shared")
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }

    /// Create the SIGET tables if they do not exist.
    ///
    /// One statement per table, executed in dependency order. Cascade rules
    /// live in the foreign keys: deleting a patient removes its records,
    /// sessions and activities.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            self.conn.execute_unprepared(statement).await?;
        }
        info!("Database schema initialized");
        Ok(())
    }
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS professionals (
        id UUID PRIMARY KEY,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        specialty TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        id UUID PRIMARY KEY,
        full_name TEXT NOT NULL,
        rut TEXT NOT NULL UNIQUE,
        birth_date DATE,
        guardian_name TEXT,
        guardian_phone TEXT,
        guardian_email TEXT,
        professional_id UUID NOT NULL REFERENCES professionals(id),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS academic_records (
        id UUID PRIMARY KEY,
        patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
        professional_id UUID NOT NULL REFERENCES professionals(id),
        year INTEGER NOT NULL,
        course TEXT NOT NULL,
        diagnosis TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id UUID PRIMARY KEY,
        record_id UUID NOT NULL REFERENCES academic_records(id) ON DELETE CASCADE,
        session_date TIMESTAMPTZ NOT NULL,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activities (
        id UUID PRIMARY KEY,
        session_id UUID NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        description TEXT NOT NULL,
        rating INTEGER CHECK (rating >= 1 AND rating <= 5)
    );
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statement_order() {
        // Referenced tables must be created before their dependents
        let order: Vec<&str> = SCHEMA_STATEMENTS
            .iter()
            .map(|s| {
                s.split("IF NOT EXISTS")
                    .nth(1)
                    .unwrap()
                    .split_whitespace()
                    .next()
                    .unwrap()
            })
            .collect();
        assert_eq!(
            order,
            vec![
                "professionals",
                "patients",
                "academic_records",
                "sessions",
                "activities"
            ]
        );
    }

    #[test]
    fn test_rating_check_constraint_present() {
        let activities = SCHEMA_STATEMENTS.last().unwrap();
        assert!(activities.contains("rating >= 1 AND rating <= 5"));
    }

    #[test]
    fn test_cascade_chain_covers_the_whole_hierarchy() {
        // Deleting a patient must take records, sessions and activities
        // with it, so each child FK carries the cascade rule
        let cascading: Vec<&str> = SCHEMA_STATEMENTS
            .iter()
            .filter(|s| s.contains("ON DELETE CASCADE"))
            .map(|s| {
                s.split("IF NOT EXISTS")
                    .nth(1)
                    .unwrap()
                    .split_whitespace()
                    .next()
                    .unwrap()
            })
            .collect();
        assert_eq!(cascading, vec!["academic_records", "sessions", "activities"]);

        // Professionals are never cascade targets; their rows outlive any
        // patient deletion
        let professionals = SCHEMA_STATEMENTS[0];
        assert!(!professionals.contains("ON DELETE CASCADE"));
    }
}
