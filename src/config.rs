//! Search configuration
//!
//! A `SearchConfig` is built once through `SearchConfigBuilder` and then shared
//! read-only by every lookup. Changing settings means building a new config;
//! requests already issued are never affected.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default GeoNames search endpoint
pub const DEFAULT_ENDPOINT: &str = "http://api.geonames.org/search";

/// Default country used as the active country context
pub const DEFAULT_BASE_COUNTRY: &str = "Nigeria";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Maximum number of redirects the transport follows
const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Errors raised while building a configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The API username is required by the provider
    #[error("A GeoNames username is required")]
    MissingUsername,

    /// A bounding-box edge is outside the valid coordinate range
    #[error("Invalid {edge} bound: {value}")]
    InvalidBound { edge: &'static str, value: f64 },

    /// Unknown style name
    #[error("Invalid style: '{0}'. Valid styles: short, medium, long, full")]
    InvalidStyle(String),

    /// Unknown output format name
    #[error("Invalid format: '{0}'. Valid formats: json, xml, rdf")]
    InvalidFormat(String),
}

/// Provider-defined response verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Style {
    #[default]
    Short,
    Medium,
    Long,
    Full,
}

impl Style {
    /// Returns the wire value for the `style` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "SHORT",
            Self::Medium => "MEDIUM",
            Self::Long => "LONG",
            Self::Full => "FULL",
        }
    }

    /// Parses a style name, case-insensitively
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            "full" => Ok(Self::Full),
            _ => Err(ConfigError::InvalidStyle(s.to_string())),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format requested from the provider
///
/// Only JSON payloads are decoded. Other formats are sent as requested and
/// come back as empty results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Xml,
    Rdf,
}

impl Format {
    /// Returns the wire value for the `type` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Rdf => "rdf",
        }
    }

    /// Parses a format name, case-insensitively
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "rdf" => Ok(Self::Rdf),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional geographic limits; any subset of edges may be set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: Option<f64>,
    pub north: Option<f64>,
    pub west: Option<f64>,
    pub east: Option<f64>,
}

impl BoundingBox {
    /// Returns the set edges as `(parameter name, value)` pairs, in wire order
    pub fn edges(&self) -> Vec<(&'static str, f64)> {
        [
            ("south", self.south),
            ("north", self.north),
            ("west", self.west),
            ("east", self.east),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("south", self.south, 90.0),
            ("north", self.north, 90.0),
            ("west", self.west, 180.0),
            ("east", self.east, 180.0),
        ];
        for (edge, value, limit) in checks {
            if let Some(v) = value {
                if !v.is_finite() || v.abs() > limit {
                    return Err(ConfigError::InvalidBound { edge, value: v });
                }
            }
        }
        Ok(())
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// Redirects followed before giving up
    pub max_redirects: usize,
    /// User-Agent header value
    pub user_agent: String,
    /// Skip TLS certificate validation. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: format!("geosearch/{}", env!("CARGO_PKG_VERSION")),
            accept_invalid_certs: false,
        }
    }
}

/// Frozen configuration shared by every lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub username: String,
    pub lang: String,
    pub style: Style,
    pub format: Format,
    pub max_rows: Option<u32>,
    pub bbox: BoundingBox,
    pub use_cache: bool,
    pub include_all_states: bool,
    pub strip_state_word: bool,
    pub exclude_self_country: bool,
    pub base_country: String,
    pub storage_root: PathBuf,
    /// `None` keeps cached artifacts forever
    pub cache_ttl: Option<Duration>,
    pub endpoint: String,
    pub transport: TransportConfig,
}

impl SearchConfig {
    /// Starts a builder for the given API username
    pub fn builder(username: impl Into<String>) -> SearchConfigBuilder {
        SearchConfigBuilder::new(username)
    }

    /// Returns the platform cache directory, or `./geosearch-cache` if none exists
    pub fn default_storage_root() -> PathBuf {
        ProjectDirs::from("", "", "geosearch")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("geosearch-cache"))
    }
}

/// Fluent builder producing a `SearchConfig`
#[derive(Debug, Clone)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            config: SearchConfig {
                username: username.into(),
                lang: "en".to_string(),
                style: Style::default(),
                format: Format::default(),
                max_rows: None,
                bbox: BoundingBox::default(),
                use_cache: true,
                include_all_states: false,
                strip_state_word: true,
                exclude_self_country: false,
                base_country: DEFAULT_BASE_COUNTRY.to_string(),
                storage_root: SearchConfig::default_storage_root(),
                cache_ttl: None,
                endpoint: DEFAULT_ENDPOINT.to_string(),
                transport: TransportConfig::default(),
            },
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.config.lang = lang.into();
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.config.style = style;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.config.format = format;
        self
    }

    pub fn max_rows(mut self, max_rows: u32) -> Self {
        self.config.max_rows = Some(max_rows);
        self
    }

    pub fn south(mut self, south: f64) -> Self {
        self.config.bbox.south = Some(south);
        self
    }

    pub fn north(mut self, north: f64) -> Self {
        self.config.bbox.north = Some(north);
        self
    }

    pub fn west(mut self, west: f64) -> Self {
        self.config.bbox.west = Some(west);
        self
    }

    pub fn east(mut self, east: f64) -> Self {
        self.config.bbox.east = Some(east);
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.config.use_cache = use_cache;
        self
    }

    /// Append the synthetic "All States" row to successful results
    pub fn include_all_states(mut self, include: bool) -> Self {
        self.config.include_all_states = include;
        self
    }

    /// Remove the word "state" from state names before a city lookup
    pub fn strip_state_word(mut self, strip: bool) -> Self {
        self.config.strip_state_word = strip;
        self
    }

    /// Drop the country's own entry from its subdivision list
    pub fn exclude_self_country(mut self, exclude: bool) -> Self {
        self.config.exclude_self_country = exclude;
        self
    }

    pub fn base_country(mut self, country: impl Into<String>) -> Self {
        self.config.base_country = country.into();
        self
    }

    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.storage_root = root.into();
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = Some(ttl);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.transport.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.transport.user_agent = user_agent.into();
        self
    }

    /// Disable TLS certificate validation for the default transport
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.transport.accept_invalid_certs = accept;
        self
    }

    /// Validates and freezes the configuration
    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        if self.config.username.trim().is_empty() {
            return Err(ConfigError::MissingUsername);
        }
        self.config.bbox.validate()?;
        Ok(self.config)
    }
}
