//! Content-addressed store for downloaded event images
//!
//! Files are named `<sha256-hex>.<ext>`, so the same bytes fetched from
//! different URLs collapse to one file, and a file is never rewritten once it
//! exists.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::{
    app::cache::ResolutionCache,
    config::Config,
    metadata::{
        content_type::{declares_html, extension_for_content_type, looks_like_html},
        fetchers::PageFetcher,
        types::{FetchError, FetchedBody},
        urls::extension_from_url,
    },
    storage::BackendLocal,
};

/// Extension used when neither the content-type nor the URL gives one away
const DEFAULT_EXTENSION: &str = "jpg";

/// Hex SHA-256 of the payload
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Extension from the response content-type, falling back to the URL path, then to `jpg`
pub fn image_extension(content_type: &str, image_url: &str) -> String {
    let ext = extension_for_content_type(content_type);
    if !ext.is_empty() {
        return ext.to_string();
    }

    let ext = extension_from_url(image_url);
    if !ext.is_empty() {
        return ext;
    }

    DEFAULT_EXTENSION.to_string()
}

pub fn stored_file_name(bytes: &[u8], ext: &str) -> String {
    format!("{}.{ext}", content_hash(bytes))
}

pub struct ImageStore {
    fetcher: Arc<dyn PageFetcher>,
    storage: BackendLocal,
    public_path: String,
    max_bytes: usize,
    by_url: ResolutionCache,
}

impl ImageStore {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        storage: BackendLocal,
        public_path: &str,
        max_bytes: usize,
    ) -> Self {
        Self {
            fetcher,
            storage,
            public_path: public_path.trim_end_matches('/').to_string(),
            max_bytes,
            by_url: ResolutionCache::new(),
        }
    }

    pub fn from_config(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new(
            fetcher,
            BackendLocal::new(&config.images_dir),
            &config.image_public_path,
            config.max_image_bytes,
        )
    }

    /// Public path of the stored copy of `image_url`, or an empty string.
    ///
    /// Each URL is downloaded at most once per store; failures are remembered too.
    pub async fn store(&self, image_url: &str) -> String {
        if image_url.is_empty() {
            return String::new();
        }

        self.by_url
            .get_or_resolve(image_url, || self.download(image_url))
            .await
    }

    /// `(resolved urls, urls with an image)`
    pub fn stats(&self) -> (usize, usize) {
        self.by_url.stats()
    }

    fn check(&self, body: &FetchedBody) -> Result<(), FetchError> {
        if body.bytes.is_empty() {
            return Err(FetchError::Empty);
        }
        if body.bytes.len() > self.max_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }
        if declares_html(&body.content_type) || looks_like_html(&body.bytes) {
            return Err(FetchError::ContentType(body.content_type.clone()));
        }
        Ok(())
    }

    async fn download(&self, image_url: &str) -> String {
        let Some(body) = self.fetcher.fetch_bytes(image_url, self.max_bytes).await else {
            log::debug!("image={image_url} outcome=unavailable");
            return String::new();
        };

        if let Err(reason) = self.check(&body) {
            log::debug!("image={image_url} outcome=rejected reason={reason}");
            return String::new();
        }

        let ext = image_extension(&body.content_type, image_url);
        let file_name = stored_file_name(&body.bytes, &ext);

        if self.storage.exists(&file_name).await {
            log::debug!("image={image_url} outcome=reused file={file_name}");
        } else {
            if let Err(err) = self.storage.write(&file_name, &body.bytes).await {
                log::warn!("image={image_url} outcome=error err={err}");
                return String::new();
            }
            log::info!(
                "image={image_url} outcome=stored file={file_name} bytes={}",
                body.bytes.len()
            );
        }

        format!("{}/{file_name}", self.public_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_extension_prefers_content_type() {
        assert_eq!(image_extension("image/png", "https://cdn.test/a.jpg"), "png");
    }

    #[test]
    fn test_extension_falls_back_to_url() {
        assert_eq!(
            image_extension("application/octet-stream", "https://cdn.test/a.WEBP?v=2"),
            "webp"
        );
        assert_eq!(image_extension("", "https://cdn.test/poster.gif"), "gif");
    }

    #[test]
    fn test_extension_defaults_to_jpg() {
        assert_eq!(image_extension("", "https://cdn.test/poster"), "jpg");
        assert_eq!(image_extension("binary/octet-stream", "https://cdn.test/"), "jpg");
    }

    #[test]
    fn test_file_name_depends_only_on_bytes_and_ext() {
        let a = stored_file_name(b"same bytes", "png");
        let b = stored_file_name(b"same bytes", "png");
        let c = stored_file_name(b"other bytes", "png");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 64 + ".png".len());
    }
}
