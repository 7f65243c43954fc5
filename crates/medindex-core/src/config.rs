//! Source portal configuration.

use std::time::Duration;

/// Listing page of the agency's regulated-medicines module.
pub const DEFAULT_LISTING_URL: &str = "https://www.titck.gov.tr/dinamikmodul/43";

/// Default timeout applied to each network call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the source portal.
///
/// Plain data handed in by the host process; environment loading stays on
/// the caller's side.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// URL of the listing page that links the dated spreadsheets.
    pub listing_url: String,
    /// Per-request timeout for the listing fetch and the download.
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
