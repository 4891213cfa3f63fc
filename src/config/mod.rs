//! Configuration management for echolog

pub mod settings;

pub use settings::{
    ClientConfig, ServerConfig, ServerSettings, StorageSettings, TimestampSettings,
};
