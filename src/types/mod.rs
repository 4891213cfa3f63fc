//! Core data types for echolog

pub mod record;

pub use record::{Record, DELIMITER, TIMESTAMP_FORMAT};
