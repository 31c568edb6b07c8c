//! Country metadata lookup
//!
//! Results are decorated with the ISO code, query prefix and display name of
//! the active country. The lookup is read-only and never used to validate input:
//! an unknown country simply yields no record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for a single country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// ISO 3166-1 alpha-2 code (e.g. "NG")
    pub short_name: String,
    /// Dedicated subdivision-query prefix, if the country has one
    #[serde(default)]
    pub prefix: Option<String>,
    /// Generic code used when no prefix exists
    #[serde(default)]
    pub code: Option<String>,
    /// Display name (e.g. "Nigeria")
    pub name: String,
}

impl CountryRecord {
    pub fn new(short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            prefix: None,
            code: None,
            name: name.into(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Prefix, falling back to the generic code
    pub fn prefix_or_code(&self) -> Option<&str> {
        self.prefix.as_deref().or(self.code.as_deref())
    }
}

/// Resolves a country name or code to its metadata record
pub trait CountryDirectory: Send + Sync {
    fn resolve(&self, country: &str) -> Option<CountryRecord>;
}

/// A single fixed record answers every lookup.
impl CountryDirectory for CountryRecord {
    fn resolve(&self, _country: &str) -> Option<CountryRecord> {
        Some(self.clone())
    }
}

/// Exact-key mapping, e.g. loaded from a JSON file.
impl CountryDirectory for HashMap<String, CountryRecord> {
    fn resolve(&self, country: &str) -> Option<CountryRecord> {
        self.get(country).cloned()
    }
}

/// A directory that never resolves anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCountries;

impl CountryDirectory for NoCountries {
    fn resolve(&self, _country: &str) -> Option<CountryRecord> {
        None
    }
}

struct BuiltinCountry {
    iso2: &'static str,
    iso3: &'static str,
    dial: &'static str,
    names: &'static [&'static str], // canonical first, then aliases
}

const BUILTIN_COUNTRIES: &[BuiltinCountry] = &[
    BuiltinCountry {
        iso2: "NG",
        iso3: "NGA",
        dial: "+234",
        names: &["Nigeria"],
    },
    BuiltinCountry {
        iso2: "GH",
        iso3: "GHA",
        dial: "+233",
        names: &["Ghana"],
    },
    BuiltinCountry {
        iso2: "KE",
        iso3: "KEN",
        dial: "+254",
        names: &["Kenya"],
    },
    BuiltinCountry {
        iso2: "ZA",
        iso3: "ZAF",
        dial: "+27",
        names: &["South Africa"],
    },
    BuiltinCountry {
        iso2: "EG",
        iso3: "EGY",
        dial: "+20",
        names: &["Egypt"],
    },
    BuiltinCountry {
        iso2: "MA",
        iso3: "MAR",
        dial: "+212",
        names: &["Morocco"],
    },
    BuiltinCountry {
        iso2: "US",
        iso3: "USA",
        dial: "+1",
        names: &["United States", "USA", "United States of America"],
    },
    BuiltinCountry {
        iso2: "CA",
        iso3: "CAN",
        dial: "+1",
        names: &["Canada"],
    },
    BuiltinCountry {
        iso2: "MX",
        iso3: "MEX",
        dial: "+52",
        names: &["Mexico"],
    },
    BuiltinCountry {
        iso2: "BR",
        iso3: "BRA",
        dial: "+55",
        names: &["Brazil"],
    },
    BuiltinCountry {
        iso2: "GB",
        iso3: "GBR",
        dial: "+44",
        names: &["United Kingdom", "UK", "Great Britain"],
    },
    BuiltinCountry {
        iso2: "FR",
        iso3: "FRA",
        dial: "+33",
        names: &["France"],
    },
    BuiltinCountry {
        iso2: "DE",
        iso3: "DEU",
        dial: "+49",
        names: &["Germany"],
    },
    BuiltinCountry {
        iso2: "SE",
        iso3: "SWE",
        dial: "+46",
        names: &["Sweden"],
    },
    BuiltinCountry {
        iso2: "IN",
        iso3: "IND",
        dial: "+91",
        names: &["India"],
    },
    BuiltinCountry {
        iso2: "JP",
        iso3: "JPN",
        dial: "+81",
        names: &["Japan"],
    },
    BuiltinCountry {
        iso2: "AU",
        iso3: "AUS",
        dial: "+61",
        names: &["Australia"],
    },
];

/// Dynamic provider over the built-in country table
///
/// Matches display names, aliases, and ISO alpha-2/alpha-3 codes,
/// case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCountries;

impl CountryDirectory for BuiltinCountries {
    fn resolve(&self, country: &str) -> Option<CountryRecord> {
        let needle = country.trim();
        if needle.is_empty() {
            return None;
        }
        BUILTIN_COUNTRIES
            .iter()
            .find(|c| {
                c.iso2.eq_ignore_ascii_case(needle)
                    || c.iso3.eq_ignore_ascii_case(needle)
                    || c.names.iter().any(|n| n.eq_ignore_ascii_case(needle))
            })
            .map(|c| {
                CountryRecord::new(c.iso2, c.names[0])
                    .with_prefix(c.dial)
                    .with_code(c.iso3)
            })
    }
}
