use std::{error::Error, time::Duration};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::config::Config;
use crate::metadata::fetchers::PageFetcher;
use crate::metadata::types::{FetchError, FetchedBody};

/// Plain reqwest client: one GET per call, no retries.
pub struct PlainFetcher {
    client: reqwest::Client,
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

fn content_type_of(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

impl PlainFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(10));

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            log::debug!("using proxy {proxy:#?}");
            client = client.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: client.build()?,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(resp)
    }

    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.get(url).await?;

        let content_type = content_type_of(&resp);
        if !content_type.to_ascii_lowercase().contains("text/html") {
            return Err(FetchError::ContentType(content_type));
        }

        Ok(resp.text().await?)
    }

    async fn get_bytes(&self, url: &str, max_bytes: usize) -> Result<FetchedBody, FetchError> {
        let mut resp = self.get(url).await?;

        // we might get a declared length up front; don't bother streaming if so
        if resp
            .content_length()
            .is_some_and(|len| len > max_bytes as u64)
        {
            return Err(FetchError::TooLarge { limit: max_bytes });
        }

        let content_type = content_type_of(&resp);

        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(FetchError::TooLarge { limit: max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedBody::new(bytes, content_type))
    }
}

fn log_failure(kind: &str, url: &str, err: &FetchError) {
    match err {
        FetchError::Request(inner) => {
            log::warn!("{kind}={url} outcome=error err={err}: {:#?}", get_error(inner))
        }
        _ => log::debug!("{kind}={url} outcome=rejected reason={err}"),
    }
}

#[async_trait]
impl PageFetcher for PlainFetcher {
    async fn fetch_html(&self, url: &str) -> String {
        log::debug!("page={url}: requesting");
        match self.get_html(url).await {
            Ok(html) => html,
            Err(err) => {
                log_failure("page", url, &err);
                String::new()
            }
        }
    }

    async fn fetch_bytes(&self, url: &str, max_bytes: usize) -> Option<FetchedBody> {
        log::debug!("image={url}: requesting");
        match self.get_bytes(url, max_bytes).await {
            Ok(body) => Some(body),
            Err(err) => {
                log_failure("image", url, &err);
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "Plain"
    }
}
