use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod events;
mod feed;
mod images;
mod metadata;
mod scrape;
mod storage;
#[cfg(test)]
mod tests;

use app::Resolver;
use config::Config;
use events::EnrichedEvent;
use feed::Window;
use metadata::{PageFetcher, PlainFetcher};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &cli::Args) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load_with(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging();

    let config = load_config(&args)?;
    let zone = config.zone()?;

    let ics = std::fs::read_to_string(&args.ics)
        .with_context(|| format!("failed to read calendar {}", args.ics.display()))?;

    let window = Window::upcoming(chrono::Utc::now().with_timezone(&zone), config.window_months)?;
    let events = feed::expand(&ics, &window, zone, config.max_iterations)?;

    let enriched = if args.no_images {
        events.into_iter().map(EnrichedEvent::unresolved).collect()
    } else {
        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(PlainFetcher::new(&config).context("failed to build http client")?);
        let resolver = Arc::new(Resolver::new(&config, fetcher));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(resolver.enrich(events))
    };

    events::write_json(&args.output, enriched)
}
