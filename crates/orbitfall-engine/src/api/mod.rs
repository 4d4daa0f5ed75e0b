pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod types;
