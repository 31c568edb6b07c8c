//! Cache module for storing provider responses to disk
//!
//! This module provides a file-backed response cache. Each query gets one JSON
//! artifact under `<root>/<COUNTRY|ALL>/<context>/<key>.json`. Artifacts live
//! forever unless a lookup asks for a TTL, in which case staleness is judged by
//! the file's modification time. Storage failures never abort a lookup; they
//! only mean the next identical query goes back to the network.

mod manager;

pub use manager::{CacheError, ResponseCache};
