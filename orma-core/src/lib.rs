//! Ambient services shared by the Orma crates: layered configuration and
//! `tracing` setup.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`OrmaConfig`] | YAML + `.env` + environment configuration with typed access |
//! | [`DatabaseConfig`] | The `orma.database` section |
//! | [`init_tracing`] | Global `tracing` subscriber honoring `RUST_LOG` |

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigSection, ConfigValue, DatabaseConfig, FromConfigValue, OrmaConfig};
pub use logging::{init_tracing, try_init_tracing};

pub mod prelude {
    //! Re-exports of the most commonly used core types.
    pub use crate::{init_tracing, ConfigSection, DatabaseConfig, OrmaConfig};
}
