//! Configuration loading.
//!
//! [`RouterConfig`] holds every tunable of the selection subsystem. It can be
//! loaded from YAML, TOML, JSON, INI, RON or JSON5 (format detected from the
//! file extension) with `${VAR}` / `$VAR` substitution, and overridden through
//! `OPTIROUTE__SECTION__FIELD` environment variables.

mod router;

pub use router::{
    CircuitBreakerSettings, DegradationSettings, ProberSettings, RouterConfig, ScoringWeights,
    ScoringSettings, SolverCircuitBreakerConfig, SynthesisSettings,
};

#[cfg(feature = "config")]
pub use loader::*;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The configuration parsed but is semantically invalid.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Prefix for environment overrides (`OPTIROUTE__SCORING__MAX_BACKUPS=2`).
pub const ENV_PREFIX: &str = "OPTIROUTE";

#[cfg(feature = "config")]
mod loader {
    use super::{ConfigError, ConfigResult, RouterConfig, ENV_PREFIX};
    use config::{Config as Cfg, Environment, File};
    use regex::Regex;
    use serde::de::DeserializeOwned;
    use std::path::Path;
    use std::sync::LazyLock;

    pub use config::FileFormat;

    static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("braced env pattern is valid")
    });
    static BARE_VAR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("bare env pattern is valid")
    });

    /// Detect configuration format from file extension
    ///
    /// - YAML: `.yaml`, `.yml`
    /// - TOML: `.toml`
    /// - JSON: `.json`
    /// - INI: `.ini`
    /// - RON: `.ron`
    /// - JSON5: `.json5`
    pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(FileFormat::Yaml),
            "toml" => Ok(FileFormat::Toml),
            "json" => Ok(FileFormat::Json),
            "ini" => Ok(FileFormat::Ini),
            "ron" => Ok(FileFormat::Ron),
            "json5" => Ok(FileFormat::Json5),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Substitute environment variables in a string.
    ///
    /// `${VAR_NAME}` is replaced first, then bare `$VAR_NAME`. Unset
    /// variables are left untouched.
    pub fn substitute_env_vars(content: &str) -> String {
        let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        });
        BARE_VAR
            .replace_all(&braced, |caps: &regex::Captures| {
                std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
            })
            .into_owned()
    }

    /// Load configuration from a string with explicit format.
    pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
    where
        T: DeserializeOwned,
    {
        let substituted = substitute_env_vars(content);

        let config = Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// Load configuration from a file, format detected from the extension.
    pub fn load_config<T>(path: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned,
    {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        from_str(&content, format)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Environment variables use the given prefix and `__` for nesting:
    /// `APP__PROBER__CACHE_TTL_SECS` sets `prober.cache_ttl_secs`.
    pub fn load_with_env<T>(path: &str, env_prefix: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned,
    {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&content);

        let config = Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    impl RouterConfig {
        /// Load from a file with `OPTIROUTE__*` overrides, then validate.
        pub fn load(path: &str) -> ConfigResult<Self> {
            let config: RouterConfig = load_with_env(path, ENV_PREFIX)?;
            config.validate()?;
            Ok(config)
        }

        /// Defaults with `OPTIROUTE__*` overrides only.
        pub fn from_env() -> ConfigResult<Self> {
            let config: RouterConfig = Cfg::builder()
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .separator("__")
                        .try_parsing(true),
                )
                .build()
                .map_err(|e| ConfigError::Parse(e.to_string()))?
                .try_deserialize()
                .map_err(|e| ConfigError::Serialization(e.to_string()))?;
            config.validate()?;
            Ok(config)
        }
    }
}

#[cfg(all(test, feature = "config"))]
mod tests;
