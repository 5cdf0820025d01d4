//! Shared models used across adapters, services and configuration

pub mod secret_string;

pub use secret_string::{constant_time_eq, SecretString};
