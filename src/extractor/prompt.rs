//! Prompt and response schema for task extraction.

use chrono::{DateTime, FixedOffset};

/// The extraction system prompt (loaded from `Prompts/task_extraction.md` at compile time).
pub(crate) const EXTRACTION_PROMPT: &str = include_str!("../../Prompts/task_extraction.md");

/// Schema name sent with the structured-output request.
pub(crate) const SCHEMA_NAME: &str = "task_draft";

/// Build `(system_prompt, user_prompt)` for one inbound message.
///
/// The current timestamp is stated with its weekday and offset so relative
/// dates ("next Monday") resolve against `now` rather than the model's idea
/// of today.
#[must_use]
pub(crate) fn build_extraction_prompt(message: &str, now: DateTime<FixedOffset>) -> (String, String) {
    let system = EXTRACTION_PROMPT.to_owned();

    let mut user_prompt = String::new();
    user_prompt.push_str(&format!(
        "CURRENT_TIMESTAMP: {} ({})\n",
        now.to_rfc3339(),
        now.format("%A")
    ));
    user_prompt.push_str(&format!("TIMEZONE_OFFSET: {}\n\n", now.offset()));
    user_prompt.push_str("## Message\n\n");
    user_prompt.push_str(&format!("\"{}\"\n\n", message.trim()));
    user_prompt.push_str("Extract the task from this message.");

    (system, user_prompt)
}

/// JSON schema the model output must satisfy.
///
/// Every property is listed in `required` (nullable ones via a `null` type
/// union) as strict structured output demands.
#[must_use]
pub fn draft_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": {
                "type": "string",
                "description": "Title of the task"
            },
            "body": {
                "type": "string",
                "description": "Body/description of the task"
            },
            "reminder": {
                "type": ["string", "null"],
                "description": "ISO-8601 reminder date/time, or null if not provided"
            },
            "tags": {
                "type": ["array", "null"],
                "items": { "type": "string" },
                "description": "List of tags, or null if none"
            },
            "isCompleted": {
                "type": ["boolean", "null"],
                "description": "Whether the task is completed, default false"
            }
        },
        "required": ["title", "body", "reminder", "tags", "isCompleted"],
        "additionalProperties": false
    })
}
