use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::TimeZone;
use chrono_tz::America::Chicago;

use crate::{
    config::Config,
    events::Event,
    metadata::{fetchers::PageFetcher, types::FetchedBody},
};

/// In-memory fetcher that counts every call it receives.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    images: HashMap<String, FetchedBody>,
    delay: Option<Duration>,
    html_calls: AtomicUsize,
    bytes_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_image(mut self, url: &str, bytes: impl Into<Vec<u8>>, content_type: &str) -> Self {
        self.images
            .insert(url.to_string(), FetchedBody::new(bytes, content_type));
        self
    }

    /// Make every call wait, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn html_calls(&self) -> usize {
        self.html_calls.load(Ordering::SeqCst)
    }

    pub fn bytes_calls(&self) -> usize {
        self.bytes_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_html(&self, url: &str) -> String {
        self.html_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.pages.get(url).cloned().unwrap_or_default()
    }

    async fn fetch_bytes(&self, url: &str, _max_bytes: usize) -> Option<FetchedBody> {
        self.bytes_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.images.get(url).cloned()
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Default config with images stored under `dir`.
pub fn config_in(dir: &std::path::Path) -> Config {
    Config {
        images_dir: dir.join("images"),
        ..Config::default()
    }
}

pub fn event(title: &str, url: &str, description: &str) -> Event {
    Event {
        title: title.to_string(),
        description: description.to_string(),
        location: "Venue".to_string(),
        start: Chicago.with_ymd_and_hms(2030, 1, 15, 18, 0, 0).unwrap(),
        end: Chicago.with_ymd_and_hms(2030, 1, 15, 20, 0, 0).unwrap(),
        url: url.to_string(),
    }
}

/// Bytes that start like a PNG, padded to `len`.
pub fn png_bytes(len: usize, seed: u8) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.resize(len, seed);
    bytes
}

pub fn og_page(image: &str) -> String {
    format!(r#"<html><head><meta property="og:image" content="{image}"></head><body></body></html>"#)
}
