//! geosearch library
//!
//! Builds GeoNames search queries, caches the JSON responses on disk keyed by
//! a hash of the query, and normalizes them into `SearchResult`s.

pub mod cache;
pub mod cli;
pub mod config;
pub mod country;
pub mod query;
pub mod result;
pub mod search;
pub mod transport;

pub use cache::{CacheError, ResponseCache};
pub use config::{BoundingBox, ConfigError, Format, SearchConfig, SearchConfigBuilder, Style};
pub use country::{BuiltinCountries, CountryDirectory, CountryRecord};
pub use query::{CachePath, Context, Parameters, QueryBuilder};
pub use result::{Place, SearchResult, SearchStatus};
pub use search::GeoNameSearch;
pub use transport::{HttpTransport, Transport, TransportError};
