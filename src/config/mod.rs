//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (PORT / HOST / PIPEWORK_ENV overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → Application::configure before serving starts
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the application is frozen for serving
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, ConfigError};
pub use schema::{AppConfig, LimitsConfig, ObservabilityConfig, ServerConfig};
pub use validation::{validate_config, ValidationError};
