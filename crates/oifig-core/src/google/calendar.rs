//! Google Calendar API v3 Client
//!
//! List calendars, list/get events, create/update/delete events.

use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::extract_array;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// OAuth scopes required for Calendar operations.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

pub struct CalendarApi {
    client: GoogleClient,
}

super::google_api_wrapper!(CalendarApi);

impl CalendarApi {
    /// List all calendars for the authenticated user
    pub async fn list_calendars(&self) -> Result<Vec<Value>, String> {
        info!("Listing Google calendars");

        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);
        let response = self.client.get(&url, &[]).await?;

        Ok(extract_array(&response, "items"))
    }

    /// List events in a calendar
    ///
    /// # Arguments
    /// * `calendar_id` - Calendar ID ("primary" for the user's primary calendar)
    /// * `time_min` / `time_max` - RFC3339 bounds
    /// * `max_results` - Maximum number of events to return
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: Option<&str>,
        time_max: Option<&str>,
        max_results: Option<usize>,
    ) -> Result<Vec<Value>, String> {
        info!("Listing events for calendar: {}", calendar_id);

        let mut query_params = vec![];

        if let Some(min) = time_min {
            query_params.push(("timeMin", min.to_string()));
        }

        if let Some(max) = time_max {
            query_params.push(("timeMax", max.to_string()));
        }

        if let Some(max) = max_results {
            query_params.push(("maxResults", max.to_string()));
        }

        // Expand recurrences and order chronologically
        query_params.push(("orderBy", "startTime".to_string()));
        query_params.push(("singleEvents", "true".to_string()));

        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );
        let events = self
            .client
            .get_paginated(&url, &query_params, "items", max_results)
            .await?;

        debug!("Retrieved {} events", events.len());
        Ok(events)
    }

    /// Get a specific event by ID
    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Value, String> {
        info!("Fetching event: {} from calendar: {}", event_id, calendar_id);

        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            event_id
        );
        self.client.get(&url, &[]).await
    }

    /// Create a new event
    ///
    /// `start` and `end` accept RFC3339 timestamps or date-only YYYY-MM-DD
    /// for all-day events.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_event(
        &self,
        calendar_id: &str,
        summary: &str,
        start: &str,
        end: &str,
        location: Option<&str>,
        description: Option<&str>,
        attendees: Option<Vec<String>>,
    ) -> Result<Value, String> {
        info!("Creating event: {} in calendar: {}", summary, calendar_id);

        let mut event = json!({
            "summary": summary,
            "start": parse_datetime(start),
            "end": parse_datetime(end),
        });

        if let Some(loc) = location {
            event["location"] = json!(loc);
        }
        if let Some(desc) = description {
            event["description"] = json!(desc);
        }
        if let Some(emails) = attendees {
            event["attendees"] = json!(emails
                .iter()
                .map(|e| json!({"email": e}))
                .collect::<Vec<_>>());
        }

        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );
        self.client.post(&url, &event).await
    }

    /// Patch an existing event; only the provided fields change.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        summary: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        location: Option<&str>,
        description: Option<&str>,
    ) -> Result<Value, String> {
        info!("Updating event: {} in calendar: {}", event_id, calendar_id);

        let mut patch = serde_json::Map::new();
        if let Some(s) = summary {
            patch.insert("summary".to_string(), json!(s));
        }
        if let Some(s) = start {
            patch.insert("start".to_string(), parse_datetime(s));
        }
        if let Some(e) = end {
            patch.insert("end".to_string(), parse_datetime(e));
        }
        if let Some(l) = location {
            patch.insert("location".to_string(), json!(l));
        }
        if let Some(d) = description {
            patch.insert("description".to_string(), json!(d));
        }

        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            event_id
        );
        self.client.patch(&url, &Value::Object(patch)).await
    }

    /// Delete an event
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<Value, String> {
        info!("Deleting event: {} from calendar: {}", event_id, calendar_id);

        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            event_id
        );
        self.client.delete(&url).await
    }
}

/// Calendar start/end values are `{"date": ...}` for all-day events and
/// `{"dateTime": ...}` otherwise.
fn parse_datetime(dt: &str) -> Value {
    if dt.len() == 10 && !dt.contains('T') {
        json!({ "date": dt })
    } else {
        json!({ "dateTime": dt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_with_timestamp() {
        let v = parse_datetime("2026-08-06T10:00:00Z");
        assert_eq!(v["dateTime"], "2026-08-06T10:00:00Z");
        assert!(v.get("date").is_none());
    }

    #[test]
    fn test_parse_datetime_date_only() {
        let v = parse_datetime("2026-08-06");
        assert_eq!(v["date"], "2026-08-06");
        assert!(v.get("dateTime").is_none());
    }
}
