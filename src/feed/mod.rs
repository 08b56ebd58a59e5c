//! Calendar feed ingestion: ICS text in, concrete events in the target zone out.

pub mod expand;
pub mod parse;

use chrono::{DateTime, Months};
use chrono_tz::Tz;
use thiserror::Error;

use crate::events::Event;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to parse calendar: {0}")]
    Parse(String),
    #[error("window of {months} months from {start} is out of range")]
    Window { start: String, months: u32 },
}

/// Half-open range `[start, end)` of event times to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Window {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// From `now` to the same local date and time `months` later.
    pub fn upcoming(now: DateTime<Tz>, months: u32) -> Result<Self, FeedError> {
        let end = now
            .checked_add_months(Months::new(months))
            .ok_or_else(|| FeedError::Window {
                start: now.to_rfc3339(),
                months,
            })?;
        Ok(Self::new(now, end))
    }

    /// Whether an event spanning `start..end` falls inside the window.
    ///
    /// Zero-length events count when their start does.
    pub fn overlaps(&self, start: &DateTime<Tz>, end: &DateTime<Tz>) -> bool {
        if start >= &self.end {
            return false;
        }
        if start == end {
            return start >= &self.start;
        }
        end > &self.start
    }
}

/// Every event occurrence from `ics` that overlaps `window`, converted to `zone`.
pub fn expand(
    ics: &str,
    window: &Window,
    zone: Tz,
    max_iterations: u16,
) -> Result<Vec<Event>, FeedError> {
    let entries = parse::parse_entries(ics)?;
    let events = expand::expand_entries(&entries, window, zone, max_iterations);

    log::info!(
        "expanded {} calendar entries into {} events between {} and {}",
        entries.len(),
        events.len(),
        window.start.to_rfc3339(),
        window.end.to_rfc3339()
    );

    Ok(events)
}
