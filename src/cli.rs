use std::path::PathBuf;

use clap::Parser;

/// Expand a calendar feed into upcoming events and attach an image to each.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Calendar feed to read
    #[clap(long, default_value = "calendar.ics")]
    pub ics: PathBuf,

    /// Where the event list is written
    #[clap(long, default_value = "data/events.json")]
    pub output: PathBuf,

    /// YAML config; created with defaults if missing.
    /// Built-in defaults are used when omitted
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Skip image resolution and write events with empty image paths
    #[clap(long, default_value = "false")]
    pub no_images: bool,
}
