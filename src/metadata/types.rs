use reqwest::StatusCode;

/// Why a page or image request produced nothing usable.
///
/// These never leave the fetch/store layer: they are logged and collapse to an
/// empty result, since a missing image is always an acceptable outcome.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("unexpected content-type {0:?}")]
    ContentType(String),

    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("empty body")]
    Empty,
}

/// Raw response payload of an image request.
#[derive(Debug, Clone, Default)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    /// Value of the `content-type` header, empty when absent
    pub content_type: String,
}

impl FetchedBody {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}
