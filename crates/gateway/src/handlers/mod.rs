//! Request handlers for the SIGET gateway

pub mod auth;
pub mod health;
pub mod patients;
pub mod professionals;
pub mod records;
pub mod sessions;
