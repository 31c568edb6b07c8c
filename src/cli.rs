//! Command-line interface parsing for geosearch
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a frozen `SearchConfig`, plus plain-text rendering of results.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ConfigError, Format, SearchConfig, Style};
use crate::result::{SearchResult, SearchStatus};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The arguments do not form a valid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The cache lifetime does not fit in a duration
    #[error("Invalid TTL: {0} hours is too large")]
    InvalidTtl(u64),
}

/// geosearch - look up states and cities through the GeoNames API
#[derive(Parser, Debug)]
#[command(name = "geosearch")]
#[command(about = "GeoNames state and city lookups with a local response cache")]
#[command(version)]
pub struct Cli {
    /// GeoNames account username
    #[arg(long, env = "GEONAMES_USERNAME")]
    pub username: Option<String>,

    /// Response language code
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Response verbosity: short, medium, long, full
    #[arg(long, default_value = "short", value_parser = Style::parse)]
    pub style: Style,

    /// Requested output format: json, xml, rdf
    #[arg(long, default_value = "json", value_parser = Format::parse)]
    pub format: Format,

    /// Maximum number of rows to return
    #[arg(long, value_name = "N")]
    pub max_rows: Option<u32>,

    /// Southern bound of the search area
    #[arg(long, allow_hyphen_values = true)]
    pub south: Option<f64>,

    /// Northern bound of the search area
    #[arg(long, allow_hyphen_values = true)]
    pub north: Option<f64>,

    /// Western bound of the search area
    #[arg(long, allow_hyphen_values = true)]
    pub west: Option<f64>,

    /// Eastern bound of the search area
    #[arg(long, allow_hyphen_values = true)]
    pub east: Option<f64>,

    /// Append an "All States" row to results
    #[arg(long)]
    pub all_states: bool,

    /// Keep the word "state" in state names for city lookups
    #[arg(long)]
    pub keep_state_word: bool,

    /// Drop the country's own entry from the results
    #[arg(long)]
    pub exclude_self: bool,

    /// Neither read nor write the response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Refetch cached responses older than this many hours
    #[arg(long, value_name = "HOURS")]
    pub ttl_hours: Option<u64>,

    /// Directory for cached responses
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Search endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Skip TLS certificate validation
    #[arg(long)]
    pub insecure: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Lookup to perform
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the states of a country
    States {
        /// Country name or code
        country: String,
    },
    /// List the cities of a state
    Cities {
        /// State name
        state: String,
        /// Country the state belongs to
        country: String,
    },
    /// Free-form lookup in a country
    Query {
        /// Search text
        text: String,
        /// Country to search in
        country: String,
    },
}

impl Command {
    /// Country whose metadata decorates the result
    pub fn country(&self) -> &str {
        match self {
            Self::States { country }
            | Self::Cities { country, .. }
            | Self::Query { country, .. } => country,
        }
    }
}

impl Cli {
    /// Builds the search configuration described by the arguments
    ///
    /// # Returns
    /// * `Ok(SearchConfig)` with the requested settings
    /// * `Err(CliError)` if the username is missing, a bound is invalid, or
    ///   the TTL overflows
    pub fn to_config(&self) -> Result<SearchConfig, CliError> {
        let mut builder = SearchConfig::builder(self.username.clone().unwrap_or_default())
            .lang(self.lang.as_str())
            .style(self.style)
            .format(self.format)
            .include_all_states(self.all_states)
            .strip_state_word(!self.keep_state_word)
            .exclude_self_country(self.exclude_self)
            .use_cache(!self.no_cache)
            .base_country(self.command.country())
            .accept_invalid_certs(self.insecure);

        if let Some(max) = self.max_rows {
            builder = builder.max_rows(max);
        }
        if let Some(south) = self.south {
            builder = builder.south(south);
        }
        if let Some(north) = self.north {
            builder = builder.north(north);
        }
        if let Some(west) = self.west {
            builder = builder.west(west);
        }
        if let Some(east) = self.east {
            builder = builder.east(east);
        }
        if let Some(hours) = self.ttl_hours {
            let secs = hours.checked_mul(3600).ok_or(CliError::InvalidTtl(hours))?;
            builder = builder.cache_ttl(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.cache_dir {
            builder = builder.storage_root(dir);
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint.as_str());
        }

        Ok(builder.build()?)
    }
}

/// Renders a result as human-readable text
pub fn render_result(result: &SearchResult) -> String {
    let mut out = String::new();
    match result.status {
        SearchStatus::Success => {
            let country = result.meta("country").unwrap_or("Unknown country");
            let iso = result.meta("ISO").unwrap_or("--");
            let places = result.places();
            let _ = writeln!(out, "{} ({}) - {} result(s)", country, iso, places.len());
            for place in places {
                let coords = match (&place.lat, &place.lng) {
                    (Some(lat), Some(lng)) => format!("{}, {}", lat, lng),
                    _ => "-".to_string(),
                };
                let _ = writeln!(
                    out,
                    "  {:<32} {:<24} {}",
                    place.name,
                    coords,
                    place.fcode.as_deref().unwrap_or("")
                );
            }
        }
        SearchStatus::Empty | SearchStatus::TransportError => {
            let _ = writeln!(
                out,
                "{}: {}",
                result.status_text,
                result.message.as_deref().unwrap_or("no details")
            );
        }
    }
    out
}
