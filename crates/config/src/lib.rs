//! Manages tool configuration by loading settings from standard locations.
//!
//! This crate provides a unified configuration object (`Config`) that aggregates
//! settings from the built-in defaults, the user's configuration file and the
//! environment, making them accessible globally via a lazily initialized static
//! reference (`CONFIG`).
//!
//! Project configuration (entry points, exports conditions, dist file names) is
//! not handled here; it lives in each `package.json` and is read by the `dist` crate.

use std::path::PathBuf;
use std::sync::LazyLock;

use etcetera::BaseStrategy;
use figment::providers::{Env, Format, Toml};
use figment::{Figment, Metadata, Provider};
use serde::{Deserialize, Serialize};

/// The default configuration values
const DEFAULT_TOML_CONFIG: &str = include_str!("./distill.default.toml");

/// The file name looked up in the user's configuration directory.
const USER_CONFIG_NAME: &str = "distill.toml";

/// The prefix for environment variable overrides, e.g. `DISTILL_PROMPT__ASSUME_YES=true`.
const ENV_PREFIX: &str = "DISTILL_";

//================================================================================================
// Statics
//================================================================================================

/// Provides a lazily instantiated static reference to the tool `Config`.
///
/// Configuration is parsed only once from canonical locations and then made
/// immutably available for the rest of the process.
pub static CONFIG: LazyLock<Config> = LazyLock::new(load_config);

//================================================================================================
// Types
//================================================================================================

/// Settings that control how confirmation prompts are answered.
#[derive(Deserialize, Serialize, Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct PromptConfig {
    /// Answer every confirmation with "yes" instead of asking.
    #[serde(default)]
    pub assume_yes: bool,
}

/// Represents the tool's primary configuration structure.
#[derive(Deserialize, Serialize, Default, Debug, PartialEq, Eq)]
pub struct Config {
    /// Prompt-related settings.
    #[serde(default)]
    pub prompt: PromptConfig,
}

//================================================================================================
// Impls
//================================================================================================

impl Config {
    /// Constructs a `Figment` instance for configuration loading.
    ///
    /// This method builds a configuration provider by layering default settings,
    /// the user-specific configuration file, and environment variables.
    pub fn figment() -> Figment {
        let mut fig = Figment::from(Config::default()).merge(Toml::string(DEFAULT_TOML_CONFIG));

        if let Some(path) = user_config_path() {
            fig = fig.admerge(Toml::file(path));
        }

        fig.admerge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Creates a `Config` instance from a given provider.
    pub fn from<T: Provider>(provider: T) -> Result<Config, Box<figment::Error>> {
        Figment::from(provider).extract().map_err(Box::new)
    }
}

impl Provider for Config {
    fn metadata(&self) -> figment::Metadata {
        Metadata::named("Distill CLI Config")
    }

    fn data(
        &self,
    ) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        figment::providers::Serialized::defaults(self).data()
    }
}

//================================================================================================
// Functions
//================================================================================================

/// The location of the user's configuration file, if a base directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    etcetera::choose_base_strategy()
        .ok()
        .map(|c| c.config_dir().join(USER_CONFIG_NAME))
}

/// Loads the configuration using the default `Figment` provider.
///
/// This function is used to initialize the `CONFIG` static variable.
fn load_config() -> Config {
    Config::figment().extract().unwrap_or_else(|e| {
        tracing::error!(error = %e, "problem loading config from default sources, falling back to defaults");
        Config::default()
    })
}
