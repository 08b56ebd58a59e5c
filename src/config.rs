use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Zone every event is converted to before it is written out
const DEFAULT_EVENT_ZONE: &str = "America/Chicago";
/// How far ahead recurring events are expanded
const DEFAULT_WINDOW_MONTHS: u32 = 3;
/// Upper bound on occurrences generated for a single recurring series
const DEFAULT_MAX_ITERATIONS: u16 = 1000;

const DEFAULT_IMAGES_DIR: &str = "assets/images/events/external";
const DEFAULT_IMAGE_PUBLIC_PATH: &str = "images/events/external";
const DEFAULT_MAX_IMAGE_BYTES: usize = 6 * 1024 * 1024;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; STLGameDevRoundUp/1.0; +https://stlgame.dev)";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_CONCURRENT_RESOLUTIONS: usize = 16;

/// Series that reuse one page for every occurrence, so scraping them is wasted work.
const DEFAULT_RECURRING_TITLE_MATCHES: [&str; 2] = ["GameDev Social", "Share & Play"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_event_zone")]
    pub event_zone: String,
    #[serde(default = "default_window_months")]
    pub window_months: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u16,

    /// Directory downloaded images are written to
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    /// Prefix under which `images_dir` is served
    #[serde(default = "default_image_public_path")]
    pub image_public_path: String,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Events whose title contains any of these are never scraped
    #[serde(default = "default_recurring_title_matches")]
    pub recurring_title_matches: Vec<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_resolutions")]
    pub max_concurrent_resolutions: usize,
    /// Optional http(s)/socks5 proxy for every outgoing request
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_zone: default_event_zone(),
            window_months: default_window_months(),
            max_iterations: default_max_iterations(),
            images_dir: default_images_dir(),
            image_public_path: default_image_public_path(),
            max_image_bytes: default_max_image_bytes(),
            recurring_title_matches: default_recurring_title_matches(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_resolutions: default_max_concurrent_resolutions(),
            proxy: None,
        }
    }
}

fn default_event_zone() -> String {
    DEFAULT_EVENT_ZONE.to_string()
}

fn default_window_months() -> u32 {
    DEFAULT_WINDOW_MONTHS
}

fn default_max_iterations() -> u16 {
    DEFAULT_MAX_ITERATIONS
}

fn default_images_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGES_DIR)
}

fn default_image_public_path() -> String {
    DEFAULT_IMAGE_PUBLIC_PATH.to_string()
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

fn default_recurring_title_matches() -> Vec<String> {
    DEFAULT_RECURRING_TITLE_MATCHES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_concurrent_resolutions() -> usize {
    DEFAULT_MAX_CONCURRENT_RESOLUTIONS
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;

        if self.window_months == 0 {
            return Err(ConfigError::invalid("window_months", "must be greater than 0"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("max_iterations", "must be greater than 0"));
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::invalid("max_image_bytes", "must be greater than 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.max_concurrent_resolutions == 0 {
            return Err(ConfigError::invalid(
                "max_concurrent_resolutions",
                "must be greater than 0",
            ));
        }
        if self.image_public_path.trim_matches('/').is_empty() {
            return Err(ConfigError::invalid("image_public_path", "must not be empty"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }

        // an empty entry would match every title and silently disable scraping
        if let Some(idx) = self
            .recurring_title_matches
            .iter()
            .position(|m| m.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "recurring_title_matches",
                format!("entry #{} is empty", idx + 1),
            ));
        }

        Ok(())
    }

    /// Target zone, parsed from `event_zone`.
    pub fn zone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.event_zone.parse::<chrono_tz::Tz>().map_err(|_| {
            ConfigError::invalid(
                "event_zone",
                format!("unknown time zone {:?}", self.event_zone),
            )
        })
    }

    /// Load config from a yaml file, writing the defaults there first if it does not exist.
    pub fn load_with(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_yml::to_string(&Self::default())?)?;
            log::info!("wrote default config to {}", path.display());
        }

        let config_str = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&config_str)?;

        config.validate()?;

        Ok(config)
    }
}
