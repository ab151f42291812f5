//! Configuration file loading for busgate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables prefixed `BUSGATE_`
//! 2. `--config <path>` specified file
//! 3. Project root: `./busgate.toml` or `./.busgate.toml`
//! 4. Global: `$XDG_CONFIG_HOME/busgate/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileGatewayConfig, FileLoggingConfig, FileOutputConfig,
    FileOutputFormat,
};
pub use loader::ConfigLoader;
