//! Boundary validation for model output.
//!
//! Raw model text is reduced to its JSON body, deserialized into a
//! [`TaskDraft`], and its reminder normalised to an RFC 3339 timestamp in the
//! offset of the injected `now`. Anything that does not fit fails; nothing is
//! guessed.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use regex::Regex;

use super::ExtractionError;
use crate::model::TaskDraft;

/// Hour used when a reminder names a day but no time of day.
pub const DEFAULT_REMINDER_HOUR: u32 = 9;

/// Phrases that pin a time of day. A model timestamp at exactly midnight is
/// only trusted when the message names one of these.
static TIME_OF_DAY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b\d{1,2}(:\d{2})?\s*(a\.?m\.?|p\.?m\.?)(\W|$)
        | \b\d{1,2}:\d{2}\b
        | \b\d{1,2}\s*h(rs?)?\b
        | \b(noon|midday|midnight|morning|afternoon|evening|tonight|night|o'?clock|eod|end\ of\ (the\ )?day)\b
        | \b(in|after)\s+(an?|\d+)\s+(minutes?|mins?|hours?|hrs?)\b
        | \b(at|by|around)\s+\d{1,2}\b
        ",
    )
    .ok()
});

/// Whether `message` names a time of day (as opposed to only a date).
#[must_use]
pub fn mentions_time_of_day(message: &str) -> bool {
    TIME_OF_DAY
        .as_ref()
        .is_some_and(|re| re.is_match(message))
}

/// JSON body of a completion. Strict schema output is bare JSON; a single
/// surrounding code fence (optionally tagged `json`) is tolerated.
pub(crate) fn json_body(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let fenced = fenced.strip_prefix("json").unwrap_or(fenced);
    fenced.strip_suffix("```").unwrap_or(fenced).trim()
}

/// Parse raw model output into a validated draft.
///
/// `message` is the original inbound text and `now` supplies the local
/// offset for timestamps without one. A resolved time of day is kept as is,
/// except a midnight stamp on a message naming no time, which models emit for
/// date-only requests; that one moves to [`DEFAULT_REMINDER_HOUR`].
pub(crate) fn parse_draft(
    raw: &str,
    message: &str,
    now: DateTime<FixedOffset>,
) -> Result<TaskDraft, ExtractionError> {
    let json_str = json_body(raw);
    if json_str.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(ExtractionError::SchemaViolation(
            "response is not a JSON object".to_owned(),
        ));
    }
    let mut draft: TaskDraft = serde_json::from_value(value)
        .map_err(|e| ExtractionError::SchemaViolation(e.to_string()))?;

    draft.reminder = match draft.reminder.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw_reminder) if raw_reminder.eq_ignore_ascii_case("null") => None,
        Some(raw_reminder) => {
            let resolved = resolve_reminder(raw_reminder, now)?;
            let at_midnight = resolved.num_seconds_from_midnight() == 0;
            let resolved = if at_midnight && !mentions_time_of_day(message) {
                at_default_hour(resolved.date_naive(), *now.offset())?
            } else {
                resolved
            };
            Some(resolved.to_rfc3339())
        }
    };

    draft.tags = draft.tags.map(|tags| {
        tags.into_iter()
            .map(|tag| tag.trim().to_owned())
            .filter(|tag| !tag.is_empty())
            .collect()
    });

    Ok(draft)
}

/// Resolve a model-produced reminder string to an absolute local timestamp.
///
/// Accepted shapes: RFC 3339 with offset, naive date-time (taken in `now`'s
/// offset), and bare `YYYY-MM-DD` (09:00 in `now`'s offset).
pub fn resolve_reminder(
    raw: &str,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, ExtractionError> {
    let offset = *now.offset();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&offset));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return localize(naive, offset, raw);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return at_default_hour(date, offset);
    }

    Err(ExtractionError::InvalidReminder(raw.to_owned()))
}

fn at_default_hour(
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, ExtractionError> {
    let time = NaiveTime::from_hms_opt(DEFAULT_REMINDER_HOUR, 0, 0)
        .ok_or_else(|| ExtractionError::InvalidReminder(date.to_string()))?;
    localize(date.and_time(time), offset, &date.to_string())
}

fn localize(
    naive: NaiveDateTime,
    offset: FixedOffset,
    raw: &str,
) -> Result<DateTime<FixedOffset>, ExtractionError> {
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ExtractionError::InvalidReminder(raw.to_owned()))
}
