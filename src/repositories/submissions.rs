use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

const COLUMNS: &str = "\
    id, assignment_id, student_id, submitted_at, updated_at, comment, status, \
    points, is_late, feedback, graded_by, graded_at";

/// Submission joined with assignment summary fields and the student's
/// display name, as the API presents it.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubmissionView {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) assignment_status: crate::db::types::AssignmentStatus,
    pub(crate) assignment_deadline: PrimitiveDateTime,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
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

const VIEW_SELECT: &str = "\
    SELECT s.id,
           s.assignment_id,
           a.title AS assignment_title,
           a.status AS assignment_status,
           a.deadline AS assignment_deadline,
           s.student_id,
           CASE WHEN btrim(u.first_name || ' ' || u.last_name) = ''
                THEN u.username
                ELSE btrim(u.first_name || ' ' || u.last_name)
           END AS student_name,
           s.submitted_at,
           s.updated_at,
           s.comment,
           s.status,
           s.points,
           s.is_late,
           s.feedback,
           s.graded_by,
           s.graded_at
    FROM submissions s
    JOIN assignments a ON a.id = s.assignment_id
    JOIN student_profiles sp ON sp.id = s.student_id
    JOIN users u ON u.id = sp.user_id";

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) assignment_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) comment: &'a str,
    pub(crate) points: Option<i32>,
    pub(crate) is_late: bool,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, assignment_id, student_id, submitted_at, updated_at, comment,
            status, points, is_late
         ) VALUES ($1,$2,$3,$4,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.assignment_id)
    .bind(params.student_id)
    .bind(params.submitted_at)
    .bind(params.comment)
    .bind(SubmissionStatus::Submitted)
    .bind(params.points)
    .bind(params.is_late)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_view_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<SubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionView>(&format!("{VIEW_SELECT} WHERE s.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_for_assignment_student(
    pool: &PgPool,
    assignment_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM submissions WHERE assignment_id = $1 AND student_id = $2",
    )
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub(crate) async fn find_view_for_assignment_student(
    pool: &PgPool,
    assignment_id: &str,
    student_id: &str,
) -> Result<Option<SubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionView>(&format!(
        "{VIEW_SELECT} WHERE s.assignment_id = $1 AND s.student_id = $2"
    ))
    .bind(assignment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_views_by_assignment(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Vec<SubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionView>(&format!(
        "{VIEW_SELECT} WHERE s.assignment_id = $1 ORDER BY s.submitted_at DESC"
    ))
    .bind(assignment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_views_for_student(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<SubmissionView>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(VIEW_SELECT);
    builder.push(" WHERE s.student_id = ");
    builder.push_bind(student_id.to_string());
    push_page(&mut builder, skip, limit);
    builder.build_query_as::<SubmissionView>().fetch_all(pool).await
}

pub(crate) async fn count_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
}

/// Submissions to assignments the teacher created or that target groups the
/// teacher actively teaches.
pub(crate) async fn list_views_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<SubmissionView>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(VIEW_SELECT);
    builder.push(" WHERE ");
    push_teacher_scope(&mut builder, teacher_id);
    push_page(&mut builder, skip, limit);
    builder.build_query_as::<SubmissionView>().fetch_all(pool).await
}

pub(crate) async fn count_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM submissions s JOIN assignments a ON a.id = s.assignment_id WHERE ",
    );
    push_teacher_scope(&mut builder, teacher_id);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) struct GradeUpdate {
    pub(crate) status: Option<SubmissionStatus>,
    pub(crate) points: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_by: String,
    pub(crate) graded_at: PrimitiveDateTime,
}

pub(crate) async fn grade(
    pool: &PgPool,
    id: &str,
    params: GradeUpdate,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions SET
            status = COALESCE($1, status),
            points = COALESCE($2, points),
            feedback = COALESCE($3, feedback),
            graded_by = $4,
            graded_at = $5,
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}",
    ))
    .bind(params.status)
    .bind(params.points)
    .bind(params.feedback)
    .bind(params.graded_by)
    .bind(params.graded_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

fn push_teacher_scope(builder: &mut QueryBuilder<'_, Postgres>, teacher_id: &str) {
    builder.push("(a.created_by = ");
    builder.push_bind(teacher_id.to_string());
    builder.push(
        " OR s.assignment_id IN (SELECT ag.assignment_id
            FROM assignment_groups ag
            JOIN group_teachers gt ON gt.group_id = ag.group_id
            WHERE gt.is_active AND gt.teacher_id = ",
    );
    builder.push_bind(teacher_id.to_string());
    builder.push("))");
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, skip: i64, limit: i64) {
    builder.push(" ORDER BY s.submitted_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));
}
