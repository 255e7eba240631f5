//! Output format validation.
//!
//! CMR encodes the response serialization in the URL extension
//! (`granules.json`, `collections.umm_json`, ...). Collection, tool,
//! service, and variable searches accept a few formats that granule
//! searches do not.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CmrError, CmrResult};

/// Formats accepted by every query kind.
const BASE_FORMATS: &[&str] = &[
    "json", "xml", "echo10", "iso", "iso19115", "csv", "atom", "kml", "native",
];

/// Additional formats accepted by collection, tool, service, and variable
/// queries. The last entry matches versioned UMM JSON, e.g. `umm_json_v1_4`.
const EXTENDED_FORMATS: &[&str] = &["dif", "dif10", "opendata", "umm_json", "umm_json_v[0-9]_[0-9]"];

fn base_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(BASE_FORMATS))
}

fn extended_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(EXTENDED_FORMATS))
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("format patterns are valid regexes"))
        .collect()
}

/// Validate a requested output format, returning it verbatim on success.
///
/// An empty request falls back to `json`. Matching is an unanchored regex
/// search against each allowed pattern, so a candidate merely *containing*
/// a valid token is accepted (`jsonn` passes because it contains `json`).
/// This mirrors the behavior of the service's reference client; callers
/// should not rely on it to catch typos.
pub(crate) fn validate_format(requested: &str, extended: bool) -> CmrResult<String> {
    if requested.is_empty() {
        return Ok("json".to_string());
    }

    let mut patterns = base_patterns().iter();
    if patterns.any(|p| p.is_match(requested)) {
        return Ok(requested.to_string());
    }

    if extended {
        let mut patterns = extended_patterns().iter();
        if patterns.any(|p| p.is_match(requested)) {
            return Ok(requested.to_string());
        }
    }

    Err(CmrError::UnsupportedFormat(requested.to_string()))
}
