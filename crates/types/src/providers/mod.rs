//! Provider configuration, errors and the adapter trait

pub mod config;
pub mod errors;
pub mod traits;

pub use config::{ProviderConfig, ProviderRuntimeConfig, DEFAULT_PROVIDER_TIMEOUT_MS};
pub use errors::{ProviderError, ProviderErrorKind, ProviderResult};
pub use traits::{AdapterInfo, ProviderAdapter};
