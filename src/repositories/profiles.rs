use sqlx::PgPool;

use crate::db::models::{StudentProfile, TeacherProfile};

const STUDENT_COLUMNS: &str = "id, user_id, student_code, major, year_of_study, bio";
const TEACHER_COLUMNS: &str = "id, user_id, department, position, academic_degree, bio";

pub(crate) async fn find_student_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<StudentProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_teacher_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<TeacherProfile>, sqlx::Error> {
    sqlx::query_as::<_, TeacherProfile>(&format!(
        "SELECT {TEACHER_COLUMNS} FROM teacher_profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_student_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<StudentProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!(
        "SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_teacher_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<TeacherProfile>, sqlx::Error> {
    sqlx::query_as::<_, TeacherProfile>(&format!(
        "SELECT {TEACHER_COLUMNS} FROM teacher_profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct UpdateStudentProfile {
    pub(crate) student_code: Option<String>,
    pub(crate) major: Option<String>,
    pub(crate) year_of_study: Option<i32>,
    pub(crate) bio: Option<String>,
}

pub(crate) async fn update_student(
    pool: &PgPool,
    id: &str,
    params: UpdateStudentProfile,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE student_profiles SET
            student_code = COALESCE($1, student_code),
            major = COALESCE($2, major),
            year_of_study = COALESCE($3, year_of_study),
            bio = COALESCE($4, bio)
         WHERE id = $5",
    )
    .bind(params.student_code)
    .bind(params.major)
    .bind(params.year_of_study)
    .bind(params.bio)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) struct UpdateTeacherProfile {
    pub(crate) department: Option<String>,
    pub(crate) position: Option<String>,
    pub(crate) academic_degree: Option<String>,
    pub(crate) bio: Option<String>,
}

pub(crate) async fn update_teacher(
    pool: &PgPool,
    id: &str,
    params: UpdateTeacherProfile,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE teacher_profiles SET
            department = COALESCE($1, department),
            position = COALESCE($2, position),
            academic_degree = COALESCE($3, academic_degree),
            bio = COALESCE($4, bio)
         WHERE id = $5",
    )
    .bind(params.department)
    .bind(params.position)
    .bind(params.academic_degree)
    .bind(params.bio)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
