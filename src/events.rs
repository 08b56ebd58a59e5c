use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

/// One concrete occurrence produced by feed expansion, already in the target zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(rename = "dateTime", serialize_with = "serialize_zoned")]
    pub start: DateTime<Tz>,
    #[serde(rename = "endTime", serialize_with = "serialize_zoned")]
    pub end: DateTime<Tz>,
    /// Explicit link from the feed, empty when absent
    #[serde(rename = "eventUrl")]
    pub url: String,
}

/// An event plus the image resolved for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: Event,
    /// Public path of the stored image, empty when none was found
    #[serde(rename = "imagePath")]
    pub image_path: String,
}

impl EnrichedEvent {
    pub fn new(event: Event, image_path: String) -> Self {
        Self { event, image_path }
    }

    pub fn unresolved(event: Event) -> Self {
        Self::new(event, String::new())
    }
}

fn serialize_zoned<S: Serializer>(value: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, false))
}

/// Sort by start time; events starting together keep their feed order.
pub fn sort_by_start(events: &mut [EnrichedEvent]) {
    events.sort_by_key(|e| e.event.start);
}

pub fn to_json(events: &[EnrichedEvent]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(events)
}

/// Sort and write the final event list.
pub fn write_json(path: &Path, mut events: Vec<EnrichedEvent>) -> anyhow::Result<()> {
    sort_by_start(&mut events);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = to_json(&events).context("failed to serialize events")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;

    log::info!("wrote {} events to {}", events.len(), path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;

    fn event(title: &str, day: u32) -> Event {
        Event {
            title: title.to_string(),
            description: String::new(),
            location: "Venue".to_string(),
            start: Chicago.with_ymd_and_hms(2030, 1, day, 18, 0, 0).unwrap(),
            end: Chicago.with_ymd_and_hms(2030, 1, day, 20, 0, 0).unwrap(),
            url: String::new(),
        }
    }

    #[test]
    fn test_serialized_shape() {
        let enriched = EnrichedEvent::new(event("Launch", 15), "images/events/external/ab.png".into());
        let json: serde_json::Value = serde_json::from_str(&to_json(&[enriched]).unwrap()).unwrap();

        let first = &json[0];
        assert_eq!(first["title"], "Launch");
        assert_eq!(first["description"], "");
        assert_eq!(first["location"], "Venue");
        assert_eq!(first["dateTime"], "2030-01-15T18:00:00.000-06:00");
        assert_eq!(first["endTime"], "2030-01-15T20:00:00.000-06:00");
        assert_eq!(first["eventUrl"], "");
        assert_eq!(first["imagePath"], "images/events/external/ab.png");
        assert_eq!(first.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_sort_by_start_is_stable() {
        let mut events = vec![
            EnrichedEvent::unresolved(event("late", 20)),
            EnrichedEvent::unresolved(event("tie-a", 10)),
            EnrichedEvent::unresolved(event("early", 2)),
            EnrichedEvent::unresolved(event("tie-b", 10)),
        ];

        sort_by_start(&mut events);

        let titles: Vec<&str> = events.iter().map(|e| e.event.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "tie-a", "tie-b", "late"]);
    }

    #[test]
    fn test_write_json_creates_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data").join("events.json");

        write_json(
            &path,
            vec![
                EnrichedEvent::unresolved(event("second", 9)),
                EnrichedEvent::unresolved(event("first", 8)),
            ],
        )
        .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json[0]["title"], "first");
        assert_eq!(json[1]["title"], "second");
    }
}
