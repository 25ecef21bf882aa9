//! Configuration types.

use std::sync::Arc;
use std::time::Duration;

use restbind_core::PageSize;
use restbind_extract::{HttpKeySource, KeyCache, OAuthResolver, ValidationOptions};
use restbind_response::{ErrorPolicy, UNIQUE_ID_HEADER};
use restbind_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete restbind configuration.
///
/// Missing sections take their defaults; unknown sections or keys are
/// rejected.
///
/// # Example
///
/// ```
/// use restbind_config::RestbindConfig;
///
/// let config = RestbindConfig::default();
/// assert!(config.errors.expose_internal_details);
/// assert!(config.pagination.default_page_size.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestbindConfig {
    /// Pagination defaults.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Error rendering.
    #[serde(default)]
    pub errors: ErrorsConfig,

    /// OAuth token verification.
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Shadow-traffic mirroring.
    #[serde(default)]
    pub shadow: ShadowConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LogConfig,
}

impl RestbindConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a page size is zero, the
    /// shadow ratio is outside `0.0..=1.0`, or shadowing is enabled without a
    /// target.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.default_page_size == Some(0) {
            return Err(ConfigError::invalid_value(
                "pagination.default_page_size",
                "must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&self.shadow.ratio) {
            return Err(ConfigError::invalid_value(
                "shadow.ratio",
                "must be between 0.0 and 1.0",
            ));
        }

        if self.shadow.enabled && self.shadow.target.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::invalid_value(
                "shadow.target",
                "must be set when shadowing is enabled",
            ));
        }

        if self.errors.unique_id_header.is_empty() {
            return Err(ConfigError::invalid_value(
                "errors.unique_id_header",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Error rendering policy for exception handlers.
    #[must_use]
    pub fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy {
            expose_internal_details: self.errors.expose_internal_details,
            unique_id_header: self.errors.unique_id_header.clone(),
        }
    }
}

/// `[pagination]`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    /// Page size applied to routes that don't declare one.
    pub default_page_size: Option<u32>,
}

impl PaginationConfig {
    /// The configured default as a route page size.
    #[must_use]
    pub fn page_size(&self) -> Option<PageSize> {
        self.default_page_size.map(PageSize::Fixed)
    }
}

/// `[errors]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Include messages and traces in 500 details.
    pub expose_internal_details: bool,

    /// Inbound header used as the error id.
    pub unique_id_header: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            expose_internal_details: true,
            unique_id_header: UNIQUE_ID_HEADER.to_string(),
        }
    }
}

/// `[oauth]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OAuthConfig {
    /// Expected `aud` claim.
    pub client_id: Option<String>,

    /// Issuer hosts allowed to sign tokens. Empty allows any issuer.
    pub allowed_domains: Vec<String>,

    /// Check token signatures.
    pub verify_signature: bool,

    /// Check `aud`.
    pub verify_aud: bool,

    /// Check `exp`.
    pub verify_exp: bool,

    /// Check `nbf`.
    pub verify_nbf: bool,

    /// Check `iss`.
    pub verify_iss: bool,

    /// Clock skew tolerance.
    pub leeway_secs: u64,

    /// Timeout for discovery and key-set requests.
    pub http_timeout_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        let options = ValidationOptions::default();
        Self {
            client_id: None,
            allowed_domains: Vec::new(),
            verify_signature: options.verify_signature,
            verify_aud: options.verify_aud,
            verify_exp: options.verify_exp,
            verify_nbf: options.verify_nbf,
            verify_iss: options.verify_iss,
            leeway_secs: options.leeway,
            http_timeout_secs: 10,
        }
    }
}

impl OAuthConfig {
    /// The configured token checks.
    #[must_use]
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            verify_signature: self.verify_signature,
            verify_aud: self.verify_aud,
            verify_exp: self.verify_exp,
            verify_nbf: self.verify_nbf,
            verify_iss: self.verify_iss,
            leeway: self.leeway_secs,
        }
    }

    /// Builds an OAuth resolver that discovers keys over HTTP and stores them
    /// in `cache`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidConfig` if the HTTP client cannot be
    /// created.
    pub fn resolver(&self, cache: Arc<KeyCache>) -> Result<OAuthResolver, ConfigError> {
        let source = HttpKeySource::new(Duration::from_secs(self.http_timeout_secs))
            .map_err(|e| ConfigError::invalid_config(format!("oauth key source: {e}")))?;

        let mut resolver = OAuthResolver::new()
            .options(self.validation_options())
            .key_cache(cache)
            .key_source(Arc::new(source));

        if let Some(client_id) = &self.client_id {
            resolver = resolver.client_id(client_id.clone());
        }
        if !self.allowed_domains.is_empty() {
            resolver = resolver.allowed_domains(self.allowed_domains.iter().cloned());
        }

        Ok(resolver)
    }
}

/// `[shadow]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowConfig {
    /// Mirror requests to the trusted server.
    pub enabled: bool,

    /// Trusted server base URL, without a trailing slash.
    pub target: Option<String>,

    /// Fraction of requests to mirror.
    pub ratio: f64,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target: None,
            ratio: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RestbindConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.errors.unique_id_header, "X-Unique-ID");
        assert!(!config.oauth.verify_iss);
        assert!(config.oauth.verify_signature);
        assert_eq!(config.oauth.leeway_secs, 0);
        assert!(!config.shadow.enabled);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = RestbindConfig::default();
        config.pagination.default_page_size = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pagination.default_page_size"));
    }

    #[test]
    fn test_shadow_ratio_bounds() {
        let mut config = RestbindConfig::default();
        config.shadow.ratio = 1.5;
        assert!(config.validate().is_err());

        config.shadow.ratio = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shadow_requires_target() {
        let mut config = RestbindConfig::default();
        config.shadow.enabled = true;
        assert!(config.validate().is_err());

        config.shadow.target = Some("http://trusted.local".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_error_policy_conversion() {
        let mut config = RestbindConfig::default();
        assert_eq!(config.error_policy(), ErrorPolicy::default());

        config.errors.expose_internal_details = false;
        assert_eq!(config.error_policy(), ErrorPolicy::redacted());
    }

    #[test]
    fn test_validation_options_conversion() {
        let config = OAuthConfig {
            verify_exp: false,
            leeway_secs: 30,
            ..OAuthConfig::default()
        };
        let options = config.validation_options();
        assert!(!options.verify_exp);
        assert_eq!(options.leeway, 30);
        assert!(options.verify_aud);
    }

    #[test]
    fn test_resolver_shares_cache() {
        let cache = Arc::new(KeyCache::new());
        let config = OAuthConfig {
            client_id: Some("client".to_string()),
            allowed_domains: vec!["auth.example.com".to_string()],
            ..OAuthConfig::default()
        };

        let resolver = config.resolver(Arc::clone(&cache)).unwrap();
        assert!(Arc::ptr_eq(resolver.cache(), &cache));
    }

    #[test]
    fn test_page_size_conversion() {
        let config = PaginationConfig {
            default_page_size: Some(20),
        };
        assert_eq!(config.page_size().map(|p| p.resolve()), Some(20));
        assert!(PaginationConfig::default().page_size().is_none());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<RestbindConfig, _> = toml::from_str("[pagination]\nsize = 3\n");
        assert!(result.is_err());

        let result: Result<RestbindConfig, _> = toml::from_str("[server]\nport = 3\n");
        assert!(result.is_err());
    }
}
