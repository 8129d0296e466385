use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AssignmentStatus, GroupRole, SubmissionStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StudentProfile {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) student_code: Option<String>,
    pub(crate) major: Option<String>,
    pub(crate) year_of_study: Option<i32>,
    pub(crate) bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeacherProfile {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) department: Option<String>,
    pub(crate) position: Option<String>,
    pub(crate) academic_degree: Option<String>,
    pub(crate) bio: Option<String>,
}

/// Caller identity resolved to its role profile. Endpoints match on this
/// exhaustively instead of probing for profile presence.
#[derive(Debug, Clone)]
pub(crate) enum Identity {
    Student(StudentProfile),
    Teacher(TeacherProfile),
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Group {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GroupMembership {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) student_id: String,
    pub(crate) role: GroupRole,
    pub(crate) joined_at: PrimitiveDateTime,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GroupTeacher {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) teacher_id: String,
    pub(crate) joined_at: PrimitiveDateTime,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) status: AssignmentStatus,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) max_points: i32,
    pub(crate) allow_late_submissions: bool,
    pub(crate) late_penalty_percentage: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssignmentGroup {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) group_id: String,
    pub(crate) assigned_at: PrimitiveDateTime,
    pub(crate) custom_deadline: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) comment: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) points: Option<i32>,
    pub(crate) is_late: bool,
    pub(crate) feedback: String,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
}
