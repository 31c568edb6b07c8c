//! Query construction
//!
//! Turns a query text, an optional country filter, and the frozen
//! `SearchConfig` into the provider's query parameters, the request URL, and
//! the on-disk location of the cached response.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::SearchConfig;
use crate::country::CountryDirectory;

/// Storage segment used when the active country has no directory record
const ALL_COUNTRIES_SEGMENT: &str = "ALL";

/// Which kind of lookup produced a request; segments the cache layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    States,
    Cities,
    Query,
}

impl Context {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::States => "states",
            Self::Cities => "cities",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered query parameters for one request
///
/// `q` and `country` are stored already escaped and encoded; every other
/// value is stored raw and encoded when the URL is rendered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    entries: Vec<(&'static str, String, bool)>,
}

impl Parameters {
    fn push_raw(&mut self, key: &'static str, value: impl Into<String>) {
        self.entries.push((key, value.into(), false));
    }

    fn push_encoded(&mut self, key: &'static str, value: String) {
        self.entries.push((key, value, true));
    }

    /// Returns the stored value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(_, v, _)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Parameter names in insertion order
    pub fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(k, _, _)| *k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders `key=value` pairs joined with `&`
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v, encoded)| {
                if *encoded {
                    format!("{}={}", k, v)
                } else {
                    format!("{}={}", k, urlencoded(v))
                }
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Location of a cached response: `<root>/<COUNTRY|ALL>/<context>/<key>.json`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CachePath {
    dir: PathBuf,
    key: String,
}

impl CachePath {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    /// Directory holding the artifact
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hex digest naming the artifact
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.key)
    }

    pub fn full_path(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }
}

/// Everything needed to issue and cache one lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub parameters: Parameters,
    pub url: String,
    pub cache_path: CachePath,
    pub context: Context,
    /// Escaped and encoded country filter (may be empty)
    pub country_filter: String,
    /// Country whose metadata decorates the result
    pub active_country: String,
}

/// Builds parameters and cache paths from a frozen configuration
#[derive(Clone, Copy)]
pub struct QueryBuilder<'a> {
    config: &'a SearchConfig,
    countries: &'a dyn CountryDirectory,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(config: &'a SearchConfig, countries: &'a dyn CountryDirectory) -> Self {
        Self { config, countries }
    }

    /// Builds the provider parameters for a query and country filter
    ///
    /// `type`, `style`, `username` and `lang` are always present. `q` and
    /// `country` are HTML-escaped and URL-encoded before the emptiness check.
    /// `maxRows` is skipped when unset or zero; each bounding-box edge is
    /// present exactly when it was set.
    pub fn build_parameters(&self, query: &str, country: &str) -> Parameters {
        let query = escape_and_encode(query);
        let country = escape_and_encode(country);

        let mut params = Parameters::default();
        params.push_raw("type", self.config.format.as_str());
        params.push_raw("style", self.config.style.as_str());
        params.push_raw("username", self.config.username.as_str());
        params.push_raw("lang", self.config.lang.as_str());

        if !query.is_empty() {
            params.push_encoded("q", query);
        }
        if !country.is_empty() {
            params.push_encoded("country", country);
        }
        if let Some(max) = self.config.max_rows.filter(|m| *m > 0) {
            params.push_raw("maxRows", max.to_string());
        }
        for (edge, value) in self.config.bbox.edges() {
            params.push_raw(edge, value.to_string());
        }
        params
    }

    /// Full request URL for a parameter set
    ///
    /// Parameters are appended with `&` when the endpoint already carries a
    /// query string.
    pub fn request_url(&self, params: &Parameters) -> String {
        let endpoint = self.config.endpoint.trim_end_matches(['?', '&']);
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", endpoint, separator, params.to_query_string())
    }

    /// Cache location for a query made under `context` for `active_country`
    pub fn cache_path(&self, query: &str, context: Context, active_country: &str) -> CachePath {
        let country_segment = self
            .countries
            .resolve(active_country)
            .map(|record| record.name)
            .filter(|name| !name.is_empty())
            .map(|name| name.to_uppercase())
            .unwrap_or_else(|| ALL_COUNTRIES_SEGMENT.to_string());

        let dir = self
            .config
            .storage_root
            .join(country_segment)
            .join(context.as_str());
        CachePath::new(dir, cache_key(query))
    }

    /// Assembles parameters, URL and cache path for one lookup
    ///
    /// An empty `active_country` falls back to the configured base country.
    pub fn request(
        &self,
        query: &str,
        country: &str,
        context: Context,
        active_country: &str,
    ) -> SearchRequest {
        let active_country = self.active_country(active_country);
        let parameters = self.build_parameters(query, country);
        let url = self.request_url(&parameters);
        SearchRequest {
            cache_path: self.cache_path(query, context, active_country),
            url,
            parameters,
            context,
            country_filter: escape_and_encode(country),
            active_country: active_country.to_string(),
        }
    }

    /// `active_country`, or the configured base country when it is blank
    pub fn active_country<'c>(&self, active_country: &'c str) -> &'c str
    where
        'a: 'c,
    {
        if active_country.trim().is_empty() {
            &self.config.base_country
        } else {
            active_country
        }
    }
}

/// Deterministic cache key: SHA-256 hex of the escaped, encoded query text
pub fn cache_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(escape_and_encode(query).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Removes every "state" from a state name when `strip` is set, then trims
///
/// Stripping lower-cases the whole name first, so "Lagos State" becomes "lagos".
pub fn clean_state_name(state: &str, strip: bool) -> String {
    if strip {
        state.to_lowercase().replace("state", "").trim().to_string()
    } else {
        state.trim().to_string()
    }
}

/// HTML-escapes then form-encodes a value
pub fn escape_and_encode(s: &str) -> String {
    urlencoded(&html_escape(s))
}

/// Escapes HTML special characters and replaces characters that have an
/// HTML 4.01 named entity (`ô` becomes `&ocirc;`)
///
/// Quotes are escaped as `&quot;` and `&#039;`. Characters without a named
/// entity in the Latin-1 or special sets pass through unchanged.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => match named_entity(c) {
                Some(name) => {
                    out.push('&');
                    out.push_str(name);
                    out.push(';');
                }
                None => out.push(c),
            },
        }
    }
    out
}

/// Entity names for U+00A0 through U+00FF, in code point order
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "sup2", "sup3", "acute", "micro",
    "para", "middot", "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil", "Egrave",
    "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml", "ETH", "Ntilde", "Ograve",
    "Oacute", "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml",
    "Yacute", "THORN", "szlig", "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig",
    "ccedil", "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml", "eth",
    "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide", "oslash", "ugrave",
    "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

fn named_entity(c: char) -> Option<&'static str> {
    let name = match c {
        '\u{A0}'..='\u{FF}' => LATIN1_ENTITIES[c as usize - 0xA0],
        '\u{152}' => "OElig",
        '\u{153}' => "oelig",
        '\u{160}' => "Scaron",
        '\u{161}' => "scaron",
        '\u{178}' => "Yuml",
        '\u{192}' => "fnof",
        '\u{2C6}' => "circ",
        '\u{2DC}' => "tilde",
        '\u{2002}' => "ensp",
        '\u{2003}' => "emsp",
        '\u{2009}' => "thinsp",
        '\u{200C}' => "zwnj",
        '\u{200D}' => "zwj",
        '\u{200E}' => "lrm",
        '\u{200F}' => "rlm",
        '\u{2013}' => "ndash",
        '\u{2014}' => "mdash",
        '\u{2018}' => "lsquo",
        '\u{2019}' => "rsquo",
        '\u{201A}' => "sbquo",
        '\u{201C}' => "ldquo",
        '\u{201D}' => "rdquo",
        '\u{201E}' => "bdquo",
        '\u{2020}' => "dagger",
        '\u{2021}' => "Dagger",
        '\u{2022}' => "bull",
        '\u{2026}' => "hellip",
        '\u{2030}' => "permil",
        '\u{2032}' => "prime",
        '\u{2039}' => "lsaquo",
        '\u{203A}' => "rsaquo",
        '\u{20AC}' => "euro",
        '\u{2122}' => "trade",
        _ => return None,
    };
    Some(name)
}

/// Form-encodes a string: alphanumerics and `-_.` pass through, space becomes `+`
pub fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::{BuiltinCountries, NoCountries};

    fn config() -> SearchConfig {
        SearchConfig::builder("demo")
            .storage_root("/tmp/geo")
            .build()
            .unwrap()
    }

    #[test]
    fn test_required_parameters_always_present() {
        let config = config();
        let params = QueryBuilder::new(&config, &NoCountries).build_parameters("", "");

        assert_eq!(params.keys(), vec!["type", "style", "username", "lang"]);
        assert_eq!(params.len(), 4);
        assert!(!params.is_empty());
        assert!(Parameters::default().is_empty());
        assert_eq!(params.get("type"), Some("json"));
        assert_eq!(params.get("style"), Some("SHORT"));
        assert_eq!(params.get("username"), Some("demo"));
        assert_eq!(params.get("lang"), Some("en"));
    }

    #[test]
    fn test_query_and_country_are_escaped_then_encoded() {
        let config = config();
        let params =
            QueryBuilder::new(&config, &NoCountries).build_parameters("Akwa Ibom", "Côte d'Ivoire");

        assert_eq!(params.get("q"), Some("Akwa+Ibom"));
        assert_eq!(params.get("country"), Some("C%26ocirc%3Bte+d%26%23039%3BIvoire"));
    }

    #[test]
    fn test_empty_country_is_omitted() {
        let config = config();
        let params = QueryBuilder::new(&config, &NoCountries).build_parameters("Lagos", "");

        assert!(params.contains("q"));
        assert!(!params.contains("country"));
    }

    #[test]
    fn test_max_rows_zero_is_omitted() {
        let config = SearchConfig::builder("demo").max_rows(0).build().unwrap();
        let params = QueryBuilder::new(&config, &NoCountries).build_parameters("x", "");
        assert!(!params.contains("maxRows"));

        let config = SearchConfig::builder("demo").max_rows(25).build().unwrap();
        let params = QueryBuilder::new(&config, &NoCountries).build_parameters("x", "");
        assert_eq!(params.get("maxRows"), Some("25"));
    }

    #[test]
    fn test_bounding_box_edges_present_iff_set() {
        let unset = config();
        let params = QueryBuilder::new(&unset, &NoCountries).build_parameters("x", "");
        for edge in ["south", "north", "west", "east"] {
            assert!(!params.contains(edge), "{} should be absent", edge);
        }

        let partial = SearchConfig::builder("demo")
            .north(13.9)
            .west(0.0)
            .build()
            .unwrap();
        let params = QueryBuilder::new(&partial, &NoCountries).build_parameters("x", "");
        assert_eq!(params.get("north"), Some("13.9"));
        assert_eq!(params.get("west"), Some("0"));
        assert!(!params.contains("south"));
        assert!(!params.contains("east"));
    }

    #[test]
    fn test_request_url_encodes_raw_values_once() {
        let config = SearchConfig::builder("my user")
            .endpoint("http://example.test/search?")
            .build()
            .unwrap();
        let builder = QueryBuilder::new(&config, &NoCountries);
        let params = builder.build_parameters("New York", "");

        assert_eq!(
            builder.request_url(&params),
            "http://example.test/search?type=json&style=SHORT&username=my+user&lang=en&q=New+York"
        );
    }

    #[test]
    fn test_request_url_joins_existing_query_string_with_ampersand() {
        let config = SearchConfig::builder("demo")
            .endpoint("http://example.test/search?key=1")
            .build()
            .unwrap();
        let builder = QueryBuilder::new(&config, &NoCountries);
        let params = builder.build_parameters("Accra", "");

        assert_eq!(
            builder.request_url(&params),
            "http://example.test/search?key=1&type=json&style=SHORT&username=demo&lang=en&q=Accra"
        );
    }

    #[test]
    fn test_cache_path_uses_uppercased_country_name() {
        let config = config();
        let builder = QueryBuilder::new(&config, &BuiltinCountries);
        let path = builder.cache_path("Lagos", Context::Cities, "ng");

        assert_eq!(path.dir(), Path::new("/tmp/geo/NIGERIA/cities"));
        assert_eq!(path.file_name(), format!("{}.json", cache_key("Lagos")));
    }

    #[test]
    fn test_cache_path_falls_back_to_all() {
        let config = config();
        let builder = QueryBuilder::new(&config, &NoCountries);
        let path = builder.cache_path("Lagos", Context::States, "Nigeria");

        assert_eq!(path.dir(), Path::new("/tmp/geo/ALL/states"));
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        assert_eq!(cache_key("Lagos"), cache_key("Lagos"));
        assert_ne!(cache_key("Lagos"), cache_key("Abuja"));
        assert_eq!(cache_key("Lagos").len(), 64);
    }

    #[test]
    fn test_cache_key_hashes_escaped_text() {
        // Escaping is deterministic, so identical raw text maps to identical keys
        // while text differing only in a special character does not.
        assert_ne!(cache_key("a&b"), cache_key("a b"));
        assert_eq!(cache_key("a&b"), cache_key("a&b"));
    }

    #[test]
    fn test_clean_state_name() {
        assert_eq!(clean_state_name("Lagos State", true), "lagos");
        assert_eq!(clean_state_name("  STATE of Osun ", true), "of osun");
        assert_eq!(clean_state_name(" Lagos State ", false), "Lagos State");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">O'Neil & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#039;Neil &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn test_html_escape_uses_named_entities_for_accented_letters() {
        assert_eq!(html_escape("São Tomé"), "S&atilde;o Tom&eacute;");
        assert_eq!(html_escape("Ÿ – 5€"), "&Yuml; &ndash; 5&euro;");
        // no named entity: passes through
        assert_eq!(html_escape("Ağrı"), "Ağrı");
    }

    #[test]
    fn test_cache_key_differs_for_accented_and_plain_text() {
        assert_ne!(cache_key("Côte"), cache_key("Cote"));
        assert_eq!(escape_and_encode("Côte"), "C%26ocirc%3Bte");
    }

    #[test]
    fn test_urlencoded() {
        assert_eq!(urlencoded("Kano-North_1.5"), "Kano-North_1.5");
        assert_eq!(urlencoded("a b+c/d"), "a+b%2Bc%2Fd");
        assert_eq!(urlencoded("é"), "%C3%A9");
    }

    #[test]
    fn test_request_bundles_everything() {
        let config = config();
        let builder = QueryBuilder::new(&config, &BuiltinCountries);
        let request = builder.request("Nigeria", "", Context::States, "Nigeria");

        assert_eq!(request.context, Context::States);
        assert_eq!(request.country_filter, "");
        assert_eq!(request.active_country, "Nigeria");
        assert!(request.url.contains("q=Nigeria"));
        assert_eq!(request.cache_path.key(), cache_key("Nigeria"));
    }

    #[test]
    fn test_request_without_active_country_uses_base_country() {
        let config = SearchConfig::builder("demo")
            .storage_root("/tmp/geo")
            .base_country("Ghana")
            .build()
            .unwrap();
        let builder = QueryBuilder::new(&config, &BuiltinCountries);
        let request = builder.request("Accra", "", Context::Cities, "");

        assert_eq!(request.active_country, "Ghana");
        assert_eq!(request.cache_path.dir(), Path::new("/tmp/geo/GHANA/cities"));
    }

    #[test]
    fn test_explicit_active_country_overrides_base_country() {
        let config = SearchConfig::builder("demo")
            .storage_root("/tmp/geo")
            .base_country("Ghana")
            .build()
            .unwrap();
        let builder = QueryBuilder::new(&config, &BuiltinCountries);
        let request = builder.request("Lagos", "", Context::Cities, "Nigeria");

        assert_eq!(request.active_country, "Nigeria");
        assert_eq!(request.cache_path.dir(), Path::new("/tmp/geo/NIGERIA/cities"));
    }
}
