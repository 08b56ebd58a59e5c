pub mod plain;

pub use plain::PlainFetcher;

use async_trait::async_trait;

use crate::metadata::types::FetchedBody;

/// Network access used by the image pipeline.
///
/// Both operations are total: any network error, timeout, bad status or wrong
/// content-type resolves to the empty outcome instead of an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Body of an HTML page, or an empty string unless the response is a 2xx `text/html`.
    async fn fetch_html(&self, url: &str) -> String;

    /// Raw bytes and content-type of a 2xx response.
    ///
    /// Implementations may give up early once the body exceeds `max_bytes`;
    /// callers still apply their own size policy to whatever comes back.
    async fn fetch_bytes(&self, url: &str, max_bytes: usize) -> Option<FetchedBody>;

    /// Get the name of this fetcher for logging/debugging
    fn name(&self) -> &'static str;
}
