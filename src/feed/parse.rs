//! VEVENT extraction using the icalendar crate's parser.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    parser::{read_calendar, unfold, Component, Property},
    CalendarDateTime, DatePerhapsTime,
};

use super::FeedError;

/// A time value as written in the feed, before any zone is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryTime {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
    Zoned { datetime: NaiveDateTime, tzid: String },
}

impl EntryTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EntryTime::Date(_))
    }

    /// Zone named by a `TZID`, when it is one the tz database knows.
    pub fn known_zone(tzid: &str) -> Option<Tz> {
        tzid.trim().parse::<Tz>().ok()
    }

    /// The instant this value denotes in `zone`.
    ///
    /// Dates start at local midnight. Floating times and unknown `TZID`s are
    /// read as wall-clock time in `zone`.
    pub fn to_zoned(&self, zone: Tz) -> Option<DateTime<Tz>> {
        match self {
            EntryTime::Date(date) => local(zone, date.and_hms_opt(0, 0, 0)?),
            EntryTime::Utc(dt) => Some(dt.with_timezone(&zone)),
            EntryTime::Floating(naive) => local(zone, *naive),
            EntryTime::Zoned { datetime, tzid } => {
                let source = Self::known_zone(tzid).unwrap_or(zone);
                local(source, *datetime).map(|dt| dt.with_timezone(&zone))
            }
        }
    }
}

/// Wall-clock time in `zone`; the earlier instant when ambiguous, shifted past a DST gap.
fn local(zone: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

impl From<DatePerhapsTime> for EntryTime {
    fn from(value: DatePerhapsTime) -> Self {
        match value {
            DatePerhapsTime::Date(date) => EntryTime::Date(date),
            DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => EntryTime::Utc(dt),
            DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
                EntryTime::Floating(naive)
            }
            DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
                EntryTime::Zoned {
                    datetime: date_time,
                    tzid,
                }
            }
        }
    }
}

/// One VEVENT: a single event, a recurring master or an override of one occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub url: String,
    pub start: EntryTime,
    pub end: Option<EntryTime>,
    pub rrule: Option<String>,
    pub exdates: Vec<EntryTime>,
    pub recurrence_id: Option<EntryTime>,
}

/// Every VEVENT in `ics` that has a usable `DTSTART`.
pub fn parse_entries(ics: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let unfolded = unfold(ics);
    let calendar = read_calendar(&unfolded).map_err(|err| FeedError::Parse(err.to_string()))?;

    let mut entries = Vec::new();
    for vevent in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        match parse_entry(vevent) {
            Some(entry) => entries.push(entry),
            None => log::warn!(
                "skipping VEVENT without a usable DTSTART uid={:?}",
                text_prop(vevent, "UID")
            ),
        }
    }

    Ok(entries)
}

fn parse_entry(vevent: &Component) -> Option<FeedEntry> {
    let start = time_prop(vevent, "DTSTART")?;
    let end = time_prop(vevent, "DTEND");

    let exdates = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();

    Some(FeedEntry {
        uid: text_prop(vevent, "UID"),
        summary: text_prop(vevent, "SUMMARY"),
        description: text_prop(vevent, "DESCRIPTION"),
        location: text_prop(vevent, "LOCATION"),
        url: text_prop(vevent, "URL"),
        start,
        end,
        rrule: vevent
            .find_prop("RRULE")
            .map(|p| p.val.to_string())
            .filter(|rule| !rule.trim().is_empty()),
        exdates,
        recurrence_id: time_prop(vevent, "RECURRENCE-ID"),
    })
}

fn text_prop(vevent: &Component, name: &str) -> String {
    vevent
        .find_prop(name)
        .map(|p| p.val.to_string().trim().to_string())
        .unwrap_or_default()
}

fn time_prop(vevent: &Component, name: &str) -> Option<EntryTime> {
    let prop = vevent.find_prop(name)?;
    DatePerhapsTime::try_from(prop).ok().map(EntryTime::from)
}

/// Values of one `EXDATE` line, which may list several comma-separated times.
fn parse_exdate_property(prop: &Property) -> Vec<EntryTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                return NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EntryTime::Date);
            }
            if let Some(utc) = s.strip_suffix('Z') {
                return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EntryTime::Utc(dt.and_utc()));
            }
            let naive = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").ok()?;
            Some(match &tzid {
                Some(tzid) => EntryTime::Zoned {
                    datetime: naive,
                    tzid: tzid.clone(),
                },
                None => EntryTime::Floating(naive),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Chicago;

    fn ics(body: &[&str]) -> String {
        let mut lines = vec!["BEGIN:VCALENDAR", "VERSION:2.0", "PRODID:-//test//EN"];
        lines.extend_from_slice(body);
        lines.push("END:VCALENDAR");
        lines.join("\r\n") + "\r\n"
    }

    #[test]
    fn test_escaped_backslash_kept_literal() {
        let ics = ics(&[
            "BEGIN:VEVENT",
            "UID:path@test",
            "SUMMARY:Build night",
            "DESCRIPTION:dir C:\\\\new and https://x.test/e",
            "DTSTART:20300101T120000Z",
            "END:VEVENT",
        ]);

        let entries = parse_entries(&ics).unwrap();
        assert_eq!(entries[0].description, r"dir C:\new and https://x.test/e");
    }

    #[test]
    fn test_parse_single_entry() {
        let ics = ics(&[
            "BEGIN:VEVENT",
            "UID:launch@test",
            "SUMMARY:Launch Party",
            "DESCRIPTION:Join us\\, friends.\\nDetails: https://example.com/e",
            " vent/launch",
            "LOCATION:Venue",
            "URL:https://example.com/launch",
            "DTSTART;TZID=America/Chicago:20300115T180000",
            "DTEND;TZID=America/Chicago:20300115T200000",
            "END:VEVENT",
        ]);

        let entries = parse_entries(&ics).unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.uid, "launch@test");
        assert_eq!(entry.summary, "Launch Party");
        assert_eq!(
            entry.description,
            "Join us, friends.\nDetails: https://example.com/event/launch"
        );
        assert_eq!(entry.url, "https://example.com/launch");
        assert!(entry.rrule.is_none());
        assert_eq!(
            entry.start.to_zoned(Chicago),
            Chicago.with_ymd_and_hms(2030, 1, 15, 18, 0, 0).single()
        );
    }

    #[test]
    fn test_parse_exdates() {
        let ics = ics(&[
            "BEGIN:VEVENT",
            "UID:jam@test",
            "SUMMARY:Weekly Jam",
            "DTSTART;TZID=America/Chicago:20300103T190000",
            "RRULE:FREQ=WEEKLY;COUNT=4",
            "EXDATE;TZID=America/Chicago:20300110T190000,20300117T190000",
            "EXDATE:20300124T010000Z",
            "END:VEVENT",
        ]);

        let entries = parse_entries(&ics).unwrap();
        let entry = &entries[0];
        assert_eq!(entry.rrule.as_deref(), Some("FREQ=WEEKLY;COUNT=4"));
        assert_eq!(entry.exdates.len(), 3);
        assert!(matches!(entry.exdates[0], EntryTime::Zoned { .. }));
        assert!(matches!(entry.exdates[2], EntryTime::Utc(_)));
    }

    #[test]
    fn test_missing_dtstart_skipped() {
        let ics = ics(&[
            "BEGIN:VEVENT",
            "UID:broken@test",
            "SUMMARY:No start",
            "END:VEVENT",
            "BEGIN:VEVENT",
            "UID:ok@test",
            "SUMMARY:Has start",
            "DTSTART:20300101T120000Z",
            "END:VEVENT",
        ]);

        let entries = parse_entries(&ics).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uid, "ok@test");
    }

    #[test]
    fn test_to_zoned_variants() {
        let date = EntryTime::Date(NaiveDate::from_ymd_opt(2030, 1, 20).unwrap());
        assert_eq!(
            date.to_zoned(Chicago),
            Chicago.with_ymd_and_hms(2030, 1, 20, 0, 0, 0).single()
        );

        let utc = EntryTime::Utc(Utc.with_ymd_and_hms(2030, 1, 6, 0, 0, 0).unwrap());
        assert_eq!(
            utc.to_zoned(Chicago),
            Chicago.with_ymd_and_hms(2030, 1, 5, 18, 0, 0).single()
        );

        let naive = NaiveDate::from_ymd_opt(2030, 1, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let unknown = EntryTime::Zoned {
            datetime: naive,
            tzid: "Central Standard Time".into(),
        };
        assert_eq!(
            unknown.to_zoned(Chicago),
            Chicago.with_ymd_and_hms(2030, 1, 5, 10, 0, 0).single()
        );

        let eastern = EntryTime::Zoned {
            datetime: naive,
            tzid: "America/New_York".into(),
        };
        assert_eq!(
            eastern.to_zoned(Chicago),
            Chicago.with_ymd_and_hms(2030, 1, 5, 9, 0, 0).single()
        );
    }
}
