//! NutriScan configuration
//!
//! Settings, secret resolution, loading and startup logging.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, load_config_from, load_config_from_str, ConfigLoadError};
pub use settings::{
	AggregationSettings, ConfigValidationError, LogFormat, LoggingSettings, ProviderSettings,
	SecuritySettings, Settings, TimeoutSettings, DEFAULT_GLOBAL_TIMEOUT_MS,
};
pub use startup_logger::{log_engine_ready, log_service_info, log_service_shutdown};
