use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::SubmissionStatus;
use crate::repositories::submissions::SubmissionView;
use crate::schemas::assignment::AssignmentMinResponse;
use crate::services::deadlines;

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionCreate {
    #[serde(alias = "assignmentId")]
    pub(crate) assignment_id: String,
    #[serde(default)]
    pub(crate) comment: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[serde(default)]
    pub(crate) status: Option<SubmissionStatus>,
    #[serde(default)]
    #[validate(range(min = 0, message = "points must be non-negative"))]
    pub(crate) points: Option<i32>,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assignment: AssignmentMinResponse,
    pub(crate) student: String,
    pub(crate) student_name: String,
    pub(crate) submitted_at: String,
    pub(crate) updated_at: String,
    pub(crate) comment: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) points: Option<i32>,
    pub(crate) is_late: bool,
    pub(crate) feedback: String,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_view(view: SubmissionView, now: PrimitiveDateTime) -> Self {
        Self {
            id: view.id,
            assignment: AssignmentMinResponse {
                id: view.assignment_id,
                title: view.assignment_title,
                status: view.assignment_status,
                deadline: format_primitive(view.assignment_deadline),
                is_deadline_expired: deadlines::is_deadline_expired(
                    view.assignment_deadline,
                    now,
                ),
            },
            student: view.student_id,
            student_name: view.student_name,
            submitted_at: format_primitive(view.submitted_at),
            updated_at: format_primitive(view.updated_at),
            comment: view.comment,
            status: view.status,
            points: view.points,
            is_late: view.is_late,
            feedback: view.feedback,
            graded_by: view.graded_by,
            graded_at: view.graded_at.map(format_primitive),
        }
    }
}
