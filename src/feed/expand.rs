//! Turns feed entries into the concrete occurrences inside a window.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use super::{
    parse::{EntryTime, FeedEntry},
    Window,
};
use crate::events::Event;

/// Identity of one occurrence of a series: `(UID, start instant)`.
type OccurrenceKey = (String, DateTime<Utc>);

/// Occurrences of every entry in `entries` that overlap `window`, in `zone`.
pub fn expand_entries(
    entries: &[FeedEntry],
    window: &Window,
    zone: Tz,
    max_iterations: u16,
) -> Vec<Event> {
    let overridden: HashSet<OccurrenceKey> = entries
        .iter()
        .filter_map(|entry| {
            let recurrence_id = entry.recurrence_id.as_ref()?.to_zoned(zone)?;
            Some((entry.uid.clone(), recurrence_id.with_timezone(&Utc)))
        })
        .collect();

    let mut events = Vec::new();
    for entry in entries {
        let Some((start, end)) = entry_span(entry, zone) else {
            log::warn!("skipping entry with unrepresentable time uid={:?}", entry.uid);
            continue;
        };

        match (&entry.rrule, &entry.recurrence_id) {
            (Some(rrule), None) => {
                events.extend(expand_series(
                    entry,
                    rrule,
                    (start, end),
                    window,
                    zone,
                    max_iterations,
                    &overridden,
                ));
            }
            _ => {
                if window.overlaps(&start, &end) {
                    events.push(occurrence(entry, start, end));
                }
            }
        }
    }

    events
}

/// Start and end of an entry in `zone`.
///
/// Without `DTEND` a timed entry ends when it starts and an all-day entry lasts one day.
fn entry_span(entry: &FeedEntry, zone: Tz) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let start = entry.start.to_zoned(zone)?;
    let end = match &entry.end {
        Some(end) => end.to_zoned(zone)?.max(start),
        None if entry.start.is_date() => start + Duration::days(1),
        None => start,
    };
    Some((start, end))
}

fn expand_series(
    master: &FeedEntry,
    rrule: &str,
    (start, end): (DateTime<Tz>, DateTime<Tz>),
    window: &Window,
    zone: Tz,
    max_iterations: u16,
    overridden: &HashSet<OccurrenceKey>,
) -> Vec<Event> {
    let rrule_str = build_rrule_string(master, rrule, zone);
    let rrule_set: RRuleSet = match rrule_str.parse() {
        Ok(set) => set,
        Err(err) => {
            log::warn!(
                "failed to parse RRULE, using the first occurrence only uid={:?} err={err}",
                master.uid
            );
            return if window.overlaps(&start, &end) {
                vec![occurrence(master, start, end)]
            } else {
                Vec::new()
            };
        }
    };

    let duration = end - start;

    // Occurrences that began before the window but are still running count too.
    let tz: rrule::Tz = Utc.into();
    let after = (window.start - duration - Duration::seconds(1)).with_timezone(&tz);
    let before = (window.end + Duration::seconds(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(max_iterations);
    if result.limited {
        log::warn!(
            "recurrence expansion hit the iteration cap uid={:?} max_iterations={max_iterations}",
            master.uid
        );
    }

    result
        .dates
        .iter()
        .filter_map(|occ| {
            let occ_start = occ.with_timezone(&zone);
            let occ_end = occ_start + duration;
            let key = (master.uid.clone(), occ.with_timezone(&Utc));
            (window.overlaps(&occ_start, &occ_end) && !overridden.contains(&key))
                .then(|| occurrence(master, occ_start, occ_end))
        })
        .collect()
}

/// iCalendar text the rrule crate parses: `DTSTART`, `RRULE` and `EXDATE` lines.
fn build_rrule_string(master: &FeedEntry, rrule: &str, zone: Tz) -> String {
    let mut lines = vec![rrule_time_line("DTSTART", &master.start, zone)];
    lines.push(format!("RRULE:{rrule}"));
    lines.extend(
        master
            .exdates
            .iter()
            .map(|exdate| rrule_time_line("EXDATE", exdate, zone)),
    );
    lines.join("\n")
}

/// Times the rrule crate cannot resolve itself are pinned to `zone`.
fn rrule_time_line(name: &str, time: &EntryTime, zone: Tz) -> String {
    match time {
        EntryTime::Date(d) => format!("{name};TZID={}:{}T000000", zone.name(), d.format("%Y%m%d")),
        EntryTime::Utc(dt) => format!("{name}:{}", dt.format("%Y%m%dT%H%M%SZ")),
        EntryTime::Floating(dt) => {
            format!("{name};TZID={}:{}", zone.name(), dt.format("%Y%m%dT%H%M%S"))
        }
        EntryTime::Zoned { datetime, tzid } => {
            let tz = EntryTime::known_zone(tzid).unwrap_or(zone);
            format!("{name};TZID={}:{}", tz.name(), datetime.format("%Y%m%dT%H%M%S"))
        }
    }
}

fn occurrence(entry: &FeedEntry, start: DateTime<Tz>, end: DateTime<Tz>) -> Event {
    Event {
        title: entry.summary.clone(),
        description: entry.description.clone(),
        location: entry.location.clone(),
        start,
        end,
        url: entry.url.clone(),
    }
}
