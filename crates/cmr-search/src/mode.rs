//! CMR deployment environments.
//!
//! CMR runs three public instances that differ only by host: production,
//! user acceptance testing, and system integration testing. A custom base
//! URL is supported for pointing a query at a local or mocked server.

use crate::error::{CmrError, CmrResult};

/// Production search endpoint.
pub const CMR_OPS: &str = "https://cmr.earthdata.nasa.gov/search/";
/// User acceptance testing endpoint.
pub const CMR_UAT: &str = "https://cmr.uat.earthdata.nasa.gov/search/";
/// System integration testing endpoint.
pub const CMR_SIT: &str = "https://cmr.sit.earthdata.nasa.gov/search/";

/// Which CMR deployment a query targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Production (`cmr.earthdata.nasa.gov`).
    #[default]
    Ops,
    /// User acceptance testing (`cmr.uat.earthdata.nasa.gov`).
    Uat,
    /// System integration testing (`cmr.sit.earthdata.nasa.gov`).
    Sit,
    /// An arbitrary base URL, e.g. a self-hosted CMR or a test server.
    Custom(String),
}

impl Mode {
    /// Resolve the mode to a base URL ending in `/`.
    ///
    /// An empty custom URL fails fast rather than producing a request
    /// target that can never resolve.
    pub fn base_url(&self) -> CmrResult<String> {
        match self {
            Mode::Ops => Ok(CMR_OPS.to_string()),
            Mode::Uat => Ok(CMR_UAT.to_string()),
            Mode::Sit => Ok(CMR_SIT.to_string()),
            Mode::Custom(url) => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(CmrError::InvalidMode(
                        "custom endpoint URL must not be empty".to_string(),
                    ));
                }
                if url.ends_with('/') {
                    Ok(url.to_string())
                } else {
                    Ok(format!("{}/", url))
                }
            }
        }
    }
}
