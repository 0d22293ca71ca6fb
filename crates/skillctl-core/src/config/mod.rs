//! Unified configuration layer.
//!
//! Every environment variable read goes through this module; other code consumes the
//! structured configs instead of calling `std::env::var` directly.
//!
//! - `loader`: env_or, env_optional, env_bool, env_list helpers
//! - `schema`: PathsConfig, ObservabilityConfig, RuntimeConfig
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_list, env_optional, env_or};
pub use schema::{ObservabilityConfig, PathsConfig, RuntimeConfig};
