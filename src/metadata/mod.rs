//! Building blocks for turning an event link into image bytes: URL handling,
//! content-type helpers and the fetcher seam.

pub mod content_type;
pub mod fetchers;
pub mod types;
pub mod urls;

pub use fetchers::{PageFetcher, PlainFetcher};
