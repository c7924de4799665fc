//! Calendar tool router

use serde_json::{json, Value};

use oifig_core::auth::CredentialManager;
use oifig_core::google::{calendar, CalendarApi};

use super::{
    mutating_tool, optional_str, optional_string_array, optional_usize, read_only_tool,
    require_str, scope_vec, ToolError, ToolSpec,
};

const USER_ID_DESC: &str = "Email address of the configured Google account to act as";

pub(super) fn tools() -> Vec<ToolSpec> {
    vec![
        read_only_tool(
            "calendar_list_calendars",
            "List all calendars the account can see.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC}
                },
                "required": ["user_id"]
            }),
        ),
        read_only_tool(
            "calendar_list_events",
            "List events in a calendar within an optional time window.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "calendar_id": {"type": "string", "description": "Calendar ID; defaults to 'primary'"},
                    "time_min": {"type": "string", "description": "RFC3339 lower bound"},
                    "time_max": {"type": "string", "description": "RFC3339 upper bound"},
                    "max_results": {"type": "integer"}
                },
                "required": ["user_id"]
            }),
        ),
        read_only_tool(
            "calendar_get_event",
            "Fetch a single event by ID.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "calendar_id": {"type": "string", "description": "Calendar ID; defaults to 'primary'"},
                    "event_id": {"type": "string"}
                },
                "required": ["user_id", "event_id"]
            }),
        ),
        mutating_tool(
            "calendar_create_event",
            "Create an event. Start/end accept RFC3339 timestamps, or YYYY-MM-DD for all-day events.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "calendar_id": {"type": "string", "description": "Calendar ID; defaults to 'primary'"},
                    "summary": {"type": "string"},
                    "start": {"type": "string"},
                    "end": {"type": "string"},
                    "location": {"type": "string"},
                    "description": {"type": "string"},
                    "attendees": {"type": "array", "items": {"type": "string"}, "description": "Attendee email addresses"}
                },
                "required": ["user_id", "summary", "start", "end"]
            }),
            false,
        ),
        mutating_tool(
            "calendar_update_event",
            "Update an event; only the provided fields change.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "calendar_id": {"type": "string", "description": "Calendar ID; defaults to 'primary'"},
                    "event_id": {"type": "string"},
                    "summary": {"type": "string"},
                    "start": {"type": "string"},
                    "end": {"type": "string"},
                    "location": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["user_id", "event_id"]
            }),
            false,
        ),
        mutating_tool(
            "calendar_delete_event",
            "Delete an event.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "calendar_id": {"type": "string", "description": "Calendar ID; defaults to 'primary'"},
                    "event_id": {"type": "string"}
                },
                "required": ["user_id", "event_id"]
            }),
            true,
        ),
    ]
}

pub(super) async fn call(
    manager: &CredentialManager,
    action: &str,
    params: &Value,
) -> Result<Value, ToolError> {
    let account = require_str(params, "user_id")?;
    let cred = manager
        .ensure_ready(account, &scope_vec(calendar::SCOPES))
        .await?;
    let api = CalendarApi::new(cred.access_token)?;

    let calendar_id = optional_str(params, "calendar_id").unwrap_or("primary");

    match action {
        "list_calendars" => {
            let calendars = api.list_calendars().await?;
            Ok(json!({ "calendars": calendars }))
        }
        "list_events" => {
            let events = api
                .list_events(
                    calendar_id,
                    optional_str(params, "time_min"),
                    optional_str(params, "time_max"),
                    optional_usize(params, "max_results"),
                )
                .await?;
            let count = events.len();
            Ok(json!({ "count": count, "events": events }))
        }
        "get_event" => {
            let event = api
                .get_event(calendar_id, require_str(params, "event_id")?)
                .await?;
            Ok(event)
        }
        "create_event" => {
            let event = api
                .create_event(
                    calendar_id,
                    require_str(params, "summary")?,
                    require_str(params, "start")?,
                    require_str(params, "end")?,
                    optional_str(params, "location"),
                    optional_str(params, "description"),
                    optional_string_array(params, "attendees"),
                )
                .await?;
            Ok(event)
        }
        "update_event" => {
            let event = api
                .update_event(
                    calendar_id,
                    require_str(params, "event_id")?,
                    optional_str(params, "summary"),
                    optional_str(params, "start"),
                    optional_str(params, "end"),
                    optional_str(params, "location"),
                    optional_str(params, "description"),
                )
                .await?;
            Ok(event)
        }
        "delete_event" => {
            api.delete_event(calendar_id, require_str(params, "event_id")?)
                .await?;
            Ok(json!({ "success": true }))
        }
        _ => Err(ToolError::InvalidParams(format!(
            "unknown calendar action: {}",
            action
        ))),
    }
}
