use std::sync::Arc;

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    app::cache::ResolutionCache,
    config::Config,
    events::{EnrichedEvent, Event},
    images::ImageStore,
    metadata::{
        fetchers::PageFetcher,
        urls::{extract_first_url, resolve_url},
    },
    scrape::locate_image_url,
};

/// Page an event links to: its explicit URL, else the first URL in its description.
pub fn candidate_page_url(event: &Event) -> String {
    let url = event.url.trim();
    if !url.is_empty() {
        return url.to_string();
    }
    extract_first_url(&event.description)
}

/// Resolves one representative image per event.
///
/// Owns both run-scoped caches: page URL -> public path and (through the
/// image store) image URL -> public path. Build one per batch.
pub struct Resolver {
    fetcher: Arc<dyn PageFetcher>,
    images: ImageStore,
    pages: ResolutionCache,
    recurring_title_matches: Vec<String>,
    max_concurrent: usize,
}

impl Resolver {
    pub fn new(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            images: ImageStore::from_config(config, fetcher.clone()),
            fetcher,
            pages: ResolutionCache::new(),
            recurring_title_matches: config.recurring_title_matches.clone(),
            max_concurrent: config.max_concurrent_resolutions.max(1),
        }
    }

    /// Series name `title` belongs to if it is exempt from scraping.
    fn exempt_series(&self, title: &str) -> Option<&str> {
        self.recurring_title_matches
            .iter()
            .find(|series| title.contains(series.as_str()))
            .map(String::as_str)
    }

    /// Public image path for an event, or an empty string.
    pub async fn resolve(&self, event: &Event) -> String {
        if event.title.is_empty() {
            return String::new();
        }

        if let Some(series) = self.exempt_series(&event.title) {
            log::debug!("event={:?} outcome=skip series={series:?}", event.title);
            return String::new();
        }

        let page_url = candidate_page_url(event);
        if page_url.is_empty() {
            log::debug!("event={:?} outcome=skip reason=no-url", event.title);
            return String::new();
        }

        self.pages
            .get_or_resolve(&page_url, || self.resolve_page(&page_url))
            .await
    }

    async fn resolve_page(&self, page_url: &str) -> String {
        let html = self.fetcher.fetch_html(page_url).await;
        if html.is_empty() {
            log::debug!("page={page_url} outcome=no-html fetcher={}", self.fetcher.name());
            return String::new();
        }

        let candidate = locate_image_url(&html);
        if candidate.is_empty() {
            log::debug!("page={page_url} outcome=no-image");
            return String::new();
        }

        let image_url = resolve_url(&candidate, page_url);
        if image_url.is_empty() {
            log::debug!("page={page_url} outcome=bad-image-url candidate={candidate:?}");
            return String::new();
        }

        let image_path = self.images.store(&image_url).await;
        log::debug!("page={page_url} image={image_url} path={image_path:?}");
        image_path
    }

    /// Resolve every event concurrently and attach the result.
    ///
    /// Order of the input is preserved. A task that dies leaves its event
    /// without an image instead of failing the batch.
    pub async fn enrich(self: Arc<Self>, events: Vec<Event>) -> Vec<EnrichedEvent> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (idx, event) in events.iter().enumerate() {
            let resolver = self.clone();
            let semaphore = semaphore.clone();
            let event = event.clone();
            tasks.spawn(async move {
                let image_path = match semaphore.acquire_owned().await {
                    Ok(_permit) => resolver.resolve(&event).await,
                    Err(_) => String::new(),
                };
                (idx, image_path)
            });
        }

        let mut enriched: Vec<EnrichedEvent> =
            events.into_iter().map(EnrichedEvent::unresolved).collect();

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((idx, image_path)) => enriched[idx].image_path = image_path,
                Err(err) => log::error!("image resolution task failed: {err}"),
            }
        }

        let (pages, pages_with_image) = self.pages.stats();
        let (images, images_stored) = self.images.stats();
        let resolved = enriched.iter().filter(|e| !e.image_path.is_empty()).count();
        log::info!(
            "resolved images for {resolved}/{} events (pages={pages} with_image={pages_with_image} image_urls={images} stored={images_stored})",
            enriched.len()
        );

        enriched
    }
}
