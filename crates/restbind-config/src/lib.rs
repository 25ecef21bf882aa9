//! Typed configuration for restbind.
//!
//! Configuration is layered: defaults, then a TOML or JSON file, then
//! `RESTBIND__SECTION__KEY` environment variables. Unknown keys are rejected.
//!
//! # Configuration file format
//!
//! ```toml
//! [pagination]
//! default_page_size = 20
//!
//! [errors]
//! expose_internal_details = false
//! unique_id_header = "X-Unique-ID"
//!
//! [oauth]
//! client_id = "my-client"
//! allowed_domains = ["auth.example.com"]
//! verify_exp = true
//! leeway_secs = 0
//! http_timeout_secs = 10
//!
//! [shadow]
//! enabled = true
//! target = "https://legacy.example.com"
//! ratio = 0.1
//!
//! [logging]
//! level = "info"
//! json_format = true
//! ```

#![doc(html_root_url = "https://docs.rs/restbind-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{
    ErrorsConfig, OAuthConfig, PaginationConfig, RestbindConfig, ShadowConfig,
};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use restbind_telemetry::LogConfig;
