//! GeoNames search client
//!
//! `GeoNameSearch` ties the pieces together: it builds the request from the
//! frozen configuration, consults the response cache, fetches on a miss,
//! writes successful results through the cache, and applies post-processing.

use crate::cache::ResponseCache;
use crate::config::SearchConfig;
use crate::country::{BuiltinCountries, CountryDirectory, CountryRecord};
use crate::query::{clean_state_name, Context, QueryBuilder, SearchRequest};
use crate::result::{normalize, SearchResult};
use crate::transport::{HttpTransport, Transport, TransportError};

/// Client for state, city and free-form lookups
pub struct GeoNameSearch {
    config: SearchConfig,
    countries: Box<dyn CountryDirectory>,
    transport: Box<dyn Transport>,
    cache: ResponseCache,
}

impl GeoNameSearch {
    /// Creates a client using the default HTTP transport and the built-in
    /// country table
    pub fn new(config: SearchConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Creates a client with a custom transport
    pub fn with_transport(config: SearchConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            countries: Box::new(BuiltinCountries),
            transport: Box::new(transport),
            cache: ResponseCache::new(),
        }
    }

    /// Replaces the country directory used for metadata and cache paths
    pub fn with_countries(mut self, countries: impl CountryDirectory + 'static) -> Self {
        self.countries = Box::new(countries);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Query builder bound to this client's configuration and directory
    pub fn query_builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.config, &*self.countries)
    }

    /// Lists the subdivisions of `country`
    pub async fn states(&self, country: &str) -> SearchResult {
        self.search(country, "", Context::States, country).await
    }

    /// Lists the settlements of `state` in `country`
    ///
    /// With `strip_state_word` set, the state name is lower-cased and every
    /// "state" is removed before searching.
    pub async fn cities(&self, state: &str, country: &str) -> SearchResult {
        let state = clean_state_name(state, self.config.strip_state_word);
        self.search(&state, "", Context::Cities, country).await
    }

    /// Free-form lookup in `country`
    ///
    /// The free text is not forwarded: the country name itself is sent as the
    /// search text, so every call for the same country shares one cache entry.
    pub async fn query(&self, _text: &str, country: &str) -> SearchResult {
        self.search(country, "", Context::Query, country).await
    }

    /// Runs one lookup
    ///
    /// `query` and `country` feed the provider parameters, `context` segments
    /// the cache, and `active_country` selects the metadata record. A blank
    /// `active_country` means the configured base country.
    pub async fn search(
        &self,
        query: &str,
        country: &str,
        context: Context,
        active_country: &str,
    ) -> SearchResult {
        let request = self
            .query_builder()
            .request(query, country, context, active_country);
        let record = self.countries.resolve(&request.active_country);
        tracing::debug!(url = %request.url, context = %context, "search");

        let mut result = if !self.config.use_cache {
            self.fetch(&request, record.as_ref()).await
        } else if let Some(ttl) = self.config.cache_ttl {
            let (request_ref, record_ref) = (&request, record.as_ref());
            let producer = move || async move {
                let fetched = self.fetch(request_ref, record_ref).await;
                if fetched.is_success() {
                    Ok(fetched)
                } else {
                    Err(fetched)
                }
            };
            match self.cache.with_expiry(&request.cache_path, producer, ttl).await {
                Ok(result) | Err(result) => result,
            }
        } else {
            self.cached_or_fetch(&request, record.as_ref()).await
        };

        if self.config.include_all_states {
            result.add_all_states();
        }
        if self.config.exclude_self_country {
            result.exclude_country(&request.country_filter, &request.active_country);
        }
        result
    }

    /// Non-expiring cache: any existing artifact is reused
    async fn cached_or_fetch(
        &self,
        request: &SearchRequest,
        record: Option<&CountryRecord>,
    ) -> SearchResult {
        let path = &request.cache_path;
        if self.cache.has(path) {
            match self.cache.load_json::<SearchResult>(path) {
                Ok(cached) => {
                    tracing::debug!(key = path.key(), "cache hit");
                    return cached;
                }
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable cache artifact"),
            }
        }

        let fetched = self.fetch(request, record).await;
        if fetched.is_success() {
            self.cache.write_through(path, fetched)
        } else {
            fetched
        }
    }

    async fn fetch(&self, request: &SearchRequest, record: Option<&CountryRecord>) -> SearchResult {
        let outcome = self.transport.get(&request.url).await;
        normalize(&request.url, outcome, record)
    }
}
