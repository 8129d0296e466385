use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{Identity, User};
use crate::db::types::UserRole;

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password: String,
    #[serde(alias = "passwordConfirm")]
    pub(crate) password_confirm: String,
    #[serde(alias = "firstName")]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    pub(crate) last_name: String,
    #[serde(default = "default_role")]
    pub(crate) role: UserRole,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileUpdateRequest {
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    #[serde(alias = "firstName")]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "lastName")]
    pub(crate) last_name: Option<String>,
    // Student profile fields.
    #[serde(default)]
    #[serde(alias = "studentCode")]
    pub(crate) student_code: Option<String>,
    #[serde(default)]
    pub(crate) major: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearOfStudy")]
    pub(crate) year_of_study: Option<i32>,
    // Teacher profile fields.
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default)]
    pub(crate) position: Option<String>,
    #[serde(default)]
    #[serde(alias = "academicDegree")]
    pub(crate) academic_degree: Option<String>,
    // Shared by both profiles.
    #[serde(default)]
    pub(crate) bio: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ProfileResponse {
    Student {
        id: String,
        student_code: Option<String>,
        major: Option<String>,
        year_of_study: Option<i32>,
        bio: Option<String>,
    },
    Teacher {
        id: String,
        department: Option<String>,
        position: Option<String>,
        academic_degree: Option<String>,
        bio: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) profile: ProfileResponse,
}

impl UserResponse {
    pub(crate) fn from_db(user: User, identity: Identity) -> Self {
        let profile = match identity {
            Identity::Student(profile) => ProfileResponse::Student {
                id: profile.id,
                student_code: profile.student_code,
                major: profile.major,
                year_of_study: profile.year_of_study,
                bio: profile.bio,
            },
            Identity::Teacher(profile) => ProfileResponse::Teacher {
                id: profile.id,
                department: profile.department,
                position: profile.position,
                academic_degree: profile.academic_degree,
                bio: profile.bio,
            },
        };

        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
            profile,
        }
    }
}

fn default_role() -> UserRole {
    UserRole::Student
}
