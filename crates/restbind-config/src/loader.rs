//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, RestbindConfig};

/// Loads configuration from defaults, then a file or string, then
/// environment variables. Later layers override earlier ones.
///
/// A file or string replaces the whole configuration; sections it leaves out
/// take their defaults. Environment variables then override single keys.
///
/// # Example
///
/// ```no_run
/// use restbind_config::ConfigLoader;
///
/// # fn main() -> Result<(), restbind_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("restbind.toml")?
///     .with_env_prefix("RESTBIND")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: RestbindConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = RestbindConfig::default();
        self
    }

    /// Loads a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, in an
    /// unsupported format, or fails to parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.config = parse(&content, format)?;
        Ok(self)
    }

    /// Loads a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `"toml"` or `"json"` format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use restbind_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[pagination]\ndefault_page_size = 25\n", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.pagination.default_page_size, Some(25));
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Enables overrides from `PREFIX__SECTION__KEY` environment variables,
    /// e.g. `RESTBIND__SHADOW__RATIO=0.5`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads variables from a `.env` file, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidConfig` if a `.env` file exists but is
    /// malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::invalid_config(format!(".env: {e}"))),
        }
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    pub fn load(mut self) -> Result<RestbindConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            apply_env_vars(&mut self.config, &prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> RestbindConfig {
        self.config
    }
}

fn parse(content: &str, format: &str) -> Result<RestbindConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn apply_env_vars(
    config: &mut RestbindConfig,
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ConfigError> {
    let marker = format!("{prefix}__");
    for (key, value) in vars {
        if let Some(rest) = key.strip_prefix(&marker) {
            let parts: Vec<&str> = rest.split("__").collect();
            apply_env_var(config, &key, &parts, &value)?;
        }
    }
    Ok(())
}

fn apply_env_var(
    config: &mut RestbindConfig,
    key: &str,
    parts: &[&str],
    value: &str,
) -> Result<(), ConfigError> {
    let flag = || parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"));
    let integer = || {
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
    };
    let optional = || (!value.is_empty()).then(|| value.to_string());

    match parts {
        ["PAGINATION", "DEFAULT_PAGE_SIZE"] => {
            config.pagination.default_page_size = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(
                    value
                        .parse()
                        .map_err(|_| ConfigError::env_parse_error(key, "expected integer or 'none'"))?,
                )
            };
        }

        ["ERRORS", "EXPOSE_INTERNAL_DETAILS"] => config.errors.expose_internal_details = flag()?,
        ["ERRORS", "UNIQUE_ID_HEADER"] => config.errors.unique_id_header = value.to_string(),

        ["OAUTH", "CLIENT_ID"] => config.oauth.client_id = optional(),
        ["OAUTH", "ALLOWED_DOMAINS"] => {
            config.oauth.allowed_domains = value
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        ["OAUTH", "VERIFY_SIGNATURE"] => config.oauth.verify_signature = flag()?,
        ["OAUTH", "VERIFY_AUD"] => config.oauth.verify_aud = flag()?,
        ["OAUTH", "VERIFY_EXP"] => config.oauth.verify_exp = flag()?,
        ["OAUTH", "VERIFY_NBF"] => config.oauth.verify_nbf = flag()?,
        ["OAUTH", "VERIFY_ISS"] => config.oauth.verify_iss = flag()?,
        ["OAUTH", "LEEWAY_SECS"] => config.oauth.leeway_secs = integer()?,
        ["OAUTH", "HTTP_TIMEOUT_SECS"] => config.oauth.http_timeout_secs = integer()?,

        ["SHADOW", "ENABLED"] => config.shadow.enabled = flag()?,
        ["SHADOW", "TARGET"] => config.shadow.target = optional(),
        ["SHADOW", "RATIO"] => {
            config.shadow.ratio = value
                .parse()
                .map_err(|_| ConfigError::env_parse_error(key, "expected float"))?;
        }

        ["LOGGING", "ENABLED"] => config.logging.enabled = flag()?,
        ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
        ["LOGGING", "JSON_FORMAT"] => config.logging.json_format = flag()?,
        ["LOGGING", "SPAN_EVENTS"] => config.logging.span_events = flag()?,
        ["LOGGING", "FILE_LINE_INFO"] => config.logging.file_line_info = flag()?,
        ["LOGGING", "THREAD_IDS"] => config.logging.thread_ids = flag()?,
        ["LOGGING", "INCLUDE_TARGET"] => config.logging.include_target = flag()?,
        ["LOGGING", "SERVICE_NAME"] => config.logging.service_name = value.to_string(),

        _ => {}
    }

    Ok(())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
