use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Assignment;
use crate::db::types::AssignmentStatus;
use crate::repositories::assignment_groups::AssignmentGroupRow;
use crate::services::deadlines;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentCreate {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default = "default_status")]
    pub(crate) status: AssignmentStatus,
    #[serde(deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) deadline: OffsetDateTime,
    #[serde(default = "default_max_points")]
    #[serde(alias = "maxPoints")]
    #[validate(range(min = 1, message = "max_points must be positive"))]
    pub(crate) max_points: i32,
    #[serde(default = "default_allow_late")]
    #[serde(alias = "allowLateSubmissions")]
    pub(crate) allow_late_submissions: bool,
    #[serde(default)]
    #[serde(alias = "latePenaltyPercentage")]
    #[validate(range(min = 0, max = 100, message = "late_penalty_percentage must be 0-100"))]
    pub(crate) late_penalty_percentage: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignmentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<AssignmentStatus>,
    #[serde(default, deserialize_with = "deserialize_option_offset_datetime_flexible")]
    pub(crate) deadline: Option<OffsetDateTime>,
    #[serde(default)]
    #[serde(alias = "maxPoints")]
    #[validate(range(min = 1, message = "max_points must be positive"))]
    pub(crate) max_points: Option<i32>,
    #[serde(default)]
    #[serde(alias = "allowLateSubmissions")]
    pub(crate) allow_late_submissions: Option<bool>,
    #[serde(default)]
    #[serde(alias = "latePenaltyPercentage")]
    #[validate(range(min = 0, max = 100, message = "late_penalty_percentage must be 0-100"))]
    pub(crate) late_penalty_percentage: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignGroupRequest {
    #[serde(alias = "groupId")]
    pub(crate) group_id: String,
    #[serde(default, deserialize_with = "deserialize_option_offset_datetime_flexible")]
    #[serde(alias = "customDeadline")]
    pub(crate) custom_deadline: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) status: AssignmentStatus,
    pub(crate) deadline: String,
    pub(crate) max_points: i32,
    pub(crate) allow_late_submissions: bool,
    pub(crate) late_penalty_percentage: i32,
    pub(crate) is_deadline_expired: bool,
    pub(crate) time_remaining: Option<String>,
    pub(crate) submission_count: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AssignmentResponse {
    pub(crate) fn from_db(
        assignment: Assignment,
        submission_count: i64,
        now: PrimitiveDateTime,
    ) -> Self {
        let is_deadline_expired = deadlines::is_deadline_expired(assignment.deadline, now);
        let time_remaining = deadlines::time_remaining(assignment.deadline, now)
            .map(deadlines::format_time_remaining);

        Self {
            id: assignment.id,
            title: assignment.title,
            description: assignment.description,
            created_by: assignment.created_by,
            status: assignment.status,
            deadline: format_primitive(assignment.deadline),
            max_points: assignment.max_points,
            allow_late_submissions: assignment.allow_late_submissions,
            late_penalty_percentage: assignment.late_penalty_percentage,
            is_deadline_expired,
            time_remaining,
            submission_count,
            created_at: format_primitive(assignment.created_at),
            updated_at: format_primitive(assignment.updated_at),
        }
    }
}

/// Summary embedded in submission payloads and group-assignment rows.
#[derive(Debug, Serialize)]
pub(crate) struct AssignmentMinResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) status: AssignmentStatus,
    pub(crate) deadline: String,
    pub(crate) is_deadline_expired: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentGroupResponse {
    pub(crate) id: String,
    pub(crate) assignment: String,
    pub(crate) group: String,
    pub(crate) group_name: String,
    pub(crate) group_code: String,
    pub(crate) assigned_at: String,
    pub(crate) custom_deadline: Option<String>,
    pub(crate) effective_deadline: String,
}

impl AssignmentGroupResponse {
    pub(crate) fn from_row(row: AssignmentGroupRow) -> Self {
        Self {
            id: row.id,
            assignment: row.assignment_id,
            group: row.group_id,
            group_name: row.group_name,
            group_code: row.group_code,
            assigned_at: format_primitive(row.assigned_at),
            custom_deadline: row.custom_deadline.map(format_primitive),
            effective_deadline: format_primitive(row.effective_deadline),
        }
    }
}

fn default_status() -> AssignmentStatus {
    AssignmentStatus::Draft
}

fn default_max_points() -> i32 {
    100
}

fn default_allow_late() -> bool {
    true
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Frontend's datetime-local often sends without timezone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_offset_datetime_flexible;
    use time::format_description::well_known::Rfc3339;

    #[test]
    fn flexible_parse_accepts_common_shapes() {
        for raw in
            ["2025-05-01T12:00:00Z", "2025-05-01T12:00:00+03:00", "2025-05-01T12:00", "2025-05-01T12:00:00"]
        {
            assert!(parse_offset_datetime_flexible(raw).is_some(), "failed on {raw}");
        }
    }

    #[test]
    fn flexible_parse_rejects_garbage() {
        assert!(parse_offset_datetime_flexible("next tuesday").is_none());
        assert!(parse_offset_datetime_flexible("2025-05-01").is_none());
    }

    #[test]
    fn flexible_parse_assumes_utc_without_offset() {
        let parsed = parse_offset_datetime_flexible("2025-05-01T12:00").expect("parse");
        assert_eq!(parsed.format(&Rfc3339).unwrap(), "2025-05-01T12:00:00Z");
    }
}
