use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::GroupRole;
use crate::repositories::group_memberships::MembershipRow;
use crate::repositories::group_teachers::GroupTeacherRow;
use crate::repositories::groups::GroupView;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GroupCreate {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GroupUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) created_by_name: String,
    pub(crate) is_active: bool,
    pub(crate) member_count: i64,
    pub(crate) teacher_count: i64,
    pub(crate) created_at: String,
}

impl GroupResponse {
    pub(crate) fn from_view(view: GroupView) -> Self {
        Self {
            id: view.id,
            name: view.name,
            code: view.code,
            description: view.description,
            created_by: view.created_by,
            created_by_name: view.created_by_name,
            is_active: view.is_active,
            member_count: view.member_count,
            teacher_count: view.teacher_count,
            created_at: format_primitive(view.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupDetailResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) created_by_name: String,
    pub(crate) is_active: bool,
    pub(crate) member_count: i64,
    pub(crate) teacher_count: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) members: Vec<MembershipResponse>,
    pub(crate) teachers: Vec<GroupTeacherResponse>,
}

impl GroupDetailResponse {
    pub(crate) fn from_parts(
        view: GroupView,
        members: Vec<MembershipRow>,
        teachers: Vec<GroupTeacherRow>,
    ) -> Self {
        Self {
            id: view.id,
            name: view.name,
            code: view.code,
            description: view.description,
            created_by: view.created_by,
            created_by_name: view.created_by_name,
            is_active: view.is_active,
            member_count: view.member_count,
            teacher_count: view.teacher_count,
            created_at: format_primitive(view.created_at),
            updated_at: format_primitive(view.updated_at),
            members: members.into_iter().map(MembershipResponse::from_row).collect(),
            teachers: teachers.into_iter().map(GroupTeacherResponse::from_row).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MembershipResponse {
    pub(crate) id: String,
    pub(crate) group: String,
    pub(crate) student: String,
    pub(crate) student_name: String,
    pub(crate) role: GroupRole,
    pub(crate) joined_at: String,
    pub(crate) is_active: bool,
}

impl MembershipResponse {
    pub(crate) fn from_row(row: MembershipRow) -> Self {
        Self {
            id: row.id,
            group: row.group_id,
            student: row.student_id,
            student_name: row.student_name,
            role: row.role,
            joined_at: format_primitive(row.joined_at),
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupTeacherResponse {
    pub(crate) id: String,
    pub(crate) group: String,
    pub(crate) teacher: String,
    pub(crate) teacher_name: String,
    pub(crate) joined_at: String,
    pub(crate) is_active: bool,
}

impl GroupTeacherResponse {
    pub(crate) fn from_row(row: GroupTeacherRow) -> Self {
        Self {
            id: row.id,
            group: row.group_id,
            teacher: row.teacher_id,
            teacher_name: row.teacher_name,
            joined_at: format_primitive(row.joined_at),
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddStudentRequest {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    #[serde(default = "default_member_role")]
    pub(crate) role: GroupRole,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoveStudentRequest {
    #[serde(alias = "membershipId")]
    pub(crate) membership_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddTeacherRequest {
    #[serde(alias = "teacherId")]
    pub(crate) teacher_id: String,
}

/// `teacher_id` here names the roster record, not the teacher profile.
#[derive(Debug, Deserialize)]
pub(crate) struct RemoveTeacherRequest {
    #[serde(alias = "teacherId")]
    pub(crate) teacher_id: String,
}

fn default_member_role() -> GroupRole {
    GroupRole::Member
}
