//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControllerConfig (validated, immutable)
//!     → sections handed to the services that own them
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a process restart
//! - `server` and `injector` sections are mandatory, the rest have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ControllerConfig;
pub use schema::GatewayConfig;
pub use schema::IngressConfig;
pub use schema::InjectorConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ServerConfig;
pub use schema::ShutdownConfig;
pub use schema::TlsConfig;
