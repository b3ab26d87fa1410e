//! Calendar event passthrough model.

use serde::{Deserialize, Serialize};

/// One event record from the external calendar API.
///
/// Only the fields the frontend renders are modeled; everything else is
/// carried through untouched in `extra` so the proxied response matches the
/// upstream record exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Start/end of an event: either a date-time or an all-day date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_round_trips_unmodeled_fields() {
        let raw = serde_json::json!({
            "id": "evt_1",
            "status": "confirmed",
            "summary": "Standup",
            "start": { "dateTime": "2025-06-02T09:00:00-07:00", "timeZone": "America/Los_Angeles" },
            "end": { "dateTime": "2025-06-02T09:15:00-07:00" },
            "htmlLink": "https://calendar.google.com/event?eid=abc",
            "attendees": [{ "email": "asha@example.com" }],
        });

        let event: CalendarEvent = serde_json::from_value(raw.clone()).unwrap();
        let round_tripped = serde_json::to_value(&event).unwrap();
        assert_eq!(round_tripped, raw);
    }

    #[test]
    fn all_day_event_keeps_date_only() {
        let raw = serde_json::json!({
            "id": "evt_2",
            "start": { "date": "2025-06-03" },
            "end": { "date": "2025-06-04" },
        });

        let event: CalendarEvent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }
}
