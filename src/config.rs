//! Configure marshaling.
//!
//! The configuration is process-wide and fixed at first use. It can be set once with
//! [`ConfigBuilder::install`] before anything is marshaled; the first operation that needs the
//! configuration installs the defaults if nothing has been installed yet, after which
//! `install` fails with [`ConfigError::AlreadyConfigured`].
//!
//! ```
//! use abi_marshal::config::{ConfigBuilder, Utf8Policy};
//!
//! ConfigBuilder::new()
//!     .utf8_policy(Utf8Policy::Lossy)
//!     .max_array_len(1 << 20)
//!     .install()
//!     .unwrap();
//! ```

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{ConfigError, MarshalResult};

static CONFIG: OnceCell<MarshalConfig> = OnceCell::new();

/// How inbound text that isn't valid UTF-8 is handled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Utf8Policy {
    /// Invalid text is a `ConversionError`.
    #[default]
    Strict,
    /// Invalid sequences are replaced with `U+FFFD`.
    Lossy,
}

/// The active configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MarshalConfig {
    pub utf8_policy: Utf8Policy,
    /// The maximum length of an inbound array.
    pub max_array_len: usize,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        MarshalConfig {
            utf8_policy: Utf8Policy::Strict,
            max_array_len: u32::MAX as usize,
        }
    }
}

/// Build and install a configuration.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    config: MarshalConfig,
}

impl ConfigBuilder {
    /// A builder with the default configuration.
    pub const fn new() -> Self {
        ConfigBuilder {
            config: MarshalConfig {
                utf8_policy: Utf8Policy::Strict,
                max_array_len: u32::MAX as usize,
            },
        }
    }

    pub const fn utf8_policy(mut self, policy: Utf8Policy) -> Self {
        self.config.utf8_policy = policy;
        self
    }

    /// Set the maximum length of inbound arrays.
    pub const fn max_array_len(mut self, len: usize) -> Self {
        self.config.max_array_len = len;
        self
    }

    /// The configuration that will be installed.
    pub const fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// Install the configuration.
    ///
    /// Returns an error if a configuration has already been installed or used.
    pub fn install(self) -> MarshalResult<()> {
        if CONFIG.set(self.config).is_err() {
            Err(ConfigError::AlreadyConfigured)?
        }

        debug!(config = ?self.config, "installed configuration");
        Ok(())
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The active configuration, installing the defaults if nothing has been installed.
pub fn config() -> &'static MarshalConfig {
    CONFIG.get_or_init(MarshalConfig::default)
}
