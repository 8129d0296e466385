use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::AssignmentGroup;

const COLUMNS: &str = "id, assignment_id, group_id, assigned_at, custom_deadline";

/// Link row joined with group info and the resolved effective deadline.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AssignmentGroupRow {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) group_code: String,
    pub(crate) assigned_at: PrimitiveDateTime,
    pub(crate) custom_deadline: Option<PrimitiveDateTime>,
    pub(crate) effective_deadline: PrimitiveDateTime,
}

pub(crate) struct CreateAssignmentGroup<'a> {
    pub(crate) id: &'a str,
    pub(crate) assignment_id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) assigned_at: PrimitiveDateTime,
    pub(crate) custom_deadline: Option<PrimitiveDateTime>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssignmentGroup<'_>,
) -> Result<AssignmentGroup, sqlx::Error> {
    sqlx::query_as::<_, AssignmentGroup>(&format!(
        "INSERT INTO assignment_groups (id, assignment_id, group_id, assigned_at, custom_deadline)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.assignment_id)
    .bind(params.group_id)
    .bind(params.assigned_at)
    .bind(params.custom_deadline)
    .fetch_one(pool)
    .await
}

pub(crate) async fn exists_pair(
    pool: &PgPool,
    assignment_id: &str,
    group_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM assignment_groups WHERE assignment_id = $1 AND group_id = $2",
    )
    .bind(assignment_id)
    .bind(group_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub(crate) async fn list_for_assignment(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Vec<AssignmentGroupRow>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentGroupRow>(
        "SELECT ag.id,
                ag.assignment_id,
                ag.group_id,
                g.name AS group_name,
                g.code AS group_code,
                ag.assigned_at,
                ag.custom_deadline,
                COALESCE(ag.custom_deadline, a.deadline) AS effective_deadline
         FROM assignment_groups ag
         JOIN assignments a ON a.id = ag.assignment_id
         JOIN groups g ON g.id = ag.group_id
         WHERE ag.assignment_id = $1
         ORDER BY ag.assigned_at, ag.id",
    )
    .bind(assignment_id)
    .fetch_all(pool)
    .await
}

/// Resolves the deadline that applies to a student: the first link, in
/// link-insertion order, whose group holds an active membership for the
/// student. None when the assignment does not target any of the student's
/// active groups.
pub(crate) async fn effective_deadline_for_student(
    pool: &PgPool,
    assignment_id: &str,
    student_id: &str,
) -> Result<Option<PrimitiveDateTime>, sqlx::Error> {
    sqlx::query_scalar::<_, PrimitiveDateTime>(
        "SELECT COALESCE(ag.custom_deadline, a.deadline)
         FROM assignment_groups ag
         JOIN assignments a ON a.id = ag.assignment_id
         JOIN group_memberships gm ON gm.group_id = ag.group_id
         WHERE ag.assignment_id = $1
           AND gm.student_id = $2
           AND gm.is_active
         ORDER BY ag.assigned_at, ag.id
         LIMIT 1",
    )
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn targets_student(
    pool: &PgPool,
    assignment_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1
         FROM assignment_groups ag
         JOIN group_memberships gm ON gm.group_id = ag.group_id
         WHERE ag.assignment_id = $1
           AND gm.student_id = $2
           AND gm.is_active
         LIMIT 1",
    )
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub(crate) async fn is_group_teacher_for_assignment(
    pool: &PgPool,
    assignment_id: &str,
    teacher_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1
         FROM assignment_groups ag
         JOIN group_teachers gt ON gt.group_id = ag.group_id
         WHERE ag.assignment_id = $1
           AND gt.teacher_id = $2
           AND gt.is_active
         LIMIT 1",
    )
    .bind(assignment_id)
    .bind(teacher_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Grading authority check: the teacher must actively teach a group that is
/// both assigned the assignment and holds an active membership for the
/// student.
pub(crate) async fn may_grade_student(
    pool: &PgPool,
    assignment_id: &str,
    teacher_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1
         FROM assignment_groups ag
         JOIN group_teachers gt
           ON gt.group_id = ag.group_id AND gt.teacher_id = $2 AND gt.is_active
         JOIN group_memberships gm
           ON gm.group_id = ag.group_id AND gm.student_id = $3 AND gm.is_active
         WHERE ag.assignment_id = $1
         LIMIT 1",
    )
    .bind(assignment_id)
    .bind(teacher_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}
