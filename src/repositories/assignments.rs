use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Assignment;
use crate::db::types::AssignmentStatus;

pub(crate) const COLUMNS: &str = "\
    id, title, description, created_by, status, deadline, max_points, \
    allow_late_submissions, late_penalty_percentage, created_at, updated_at";

/// Whitelisted `ordering` fields; a leading '-' selects descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignmentOrdering {
    CreatedAt { descending: bool },
    Deadline { descending: bool },
    Title { descending: bool },
}

impl AssignmentOrdering {
    pub(crate) fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        match field {
            "created_at" => Some(Self::CreatedAt { descending }),
            "deadline" => Some(Self::Deadline { descending }),
            "title" => Some(Self::Title { descending }),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::CreatedAt { descending: false } => "a.created_at ASC",
            Self::CreatedAt { descending: true } => "a.created_at DESC",
            Self::Deadline { descending: false } => "a.deadline ASC",
            Self::Deadline { descending: true } => "a.deadline DESC",
            Self::Title { descending: false } => "a.title ASC",
            Self::Title { descending: true } => "a.title DESC",
        }
    }
}

impl Default for AssignmentOrdering {
    fn default() -> Self {
        Self::CreatedAt { descending: true }
    }
}

pub(crate) struct CreateAssignment<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) created_by: &'a str,
    pub(crate) status: AssignmentStatus,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) max_points: i32,
    pub(crate) allow_late_submissions: bool,
    pub(crate) late_penalty_percentage: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssignment<'_>,
) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO assignments (
            id, title, description, created_by, status, deadline, max_points,
            allow_late_submissions, late_penalty_percentage, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.created_by)
    .bind(params.status)
    .bind(params.deadline)
    .bind(params.max_points)
    .bind(params.allow_late_submissions)
    .bind(params.late_penalty_percentage)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Assignment, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) struct UpdateAssignment {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) status: Option<AssignmentStatus>,
    pub(crate) deadline: Option<PrimitiveDateTime>,
    pub(crate) max_points: Option<i32>,
    pub(crate) allow_late_submissions: Option<bool>,
    pub(crate) late_penalty_percentage: Option<i32>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateAssignment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assignments SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            status = COALESCE($3, status),
            deadline = COALESCE($4, deadline),
            max_points = COALESCE($5, max_points),
            allow_late_submissions = COALESCE($6, allow_late_submissions),
            late_penalty_percentage = COALESCE($7, late_penalty_percentage),
            updated_at = $8
         WHERE id = $9",
    )
    .bind(params.title)
    .bind(params.description)
    .bind(params.status)
    .bind(params.deadline)
    .bind(params.max_points)
    .bind(params.allow_late_submissions)
    .bind(params.late_penalty_percentage)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM assignments WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn submission_count(pool: &PgPool, id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE assignment_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Assignments the teacher created plus assignments targeting groups the
/// teacher actively teaches.
pub(crate) async fn list_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
    search: Option<&str>,
    ordering: AssignmentOrdering,
    skip: i64,
    limit: i64,
) -> Result<Vec<Assignment>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM assignments a WHERE (a.created_by = "
    ));
    push_teacher_scope(&mut builder, teacher_id);
    push_search(&mut builder, search);
    push_page(&mut builder, ordering, skip, limit);
    builder.build_query_as::<Assignment>().fetch_all(pool).await
}

pub(crate) async fn count_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM assignments a WHERE (a.created_by = ");
    push_teacher_scope(&mut builder, teacher_id);
    push_search(&mut builder, search);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Published assignments targeting groups where the student holds an active
/// membership.
pub(crate) async fn list_published_for_student(
    pool: &PgPool,
    student_id: &str,
    search: Option<&str>,
    ordering: AssignmentOrdering,
    skip: i64,
    limit: i64,
) -> Result<Vec<Assignment>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM assignments a WHERE a.status = "
    ));
    push_student_scope(&mut builder, student_id);
    push_search(&mut builder, search);
    push_page(&mut builder, ordering, skip, limit);
    builder.build_query_as::<Assignment>().fetch_all(pool).await
}

pub(crate) async fn count_published_for_student(
    pool: &PgPool,
    student_id: &str,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM assignments a WHERE a.status = ");
    push_student_scope(&mut builder, student_id);
    push_search(&mut builder, search);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_teacher_scope(builder: &mut QueryBuilder<'_, Postgres>, teacher_id: &str) {
    builder.push_bind(teacher_id.to_string());
    builder.push(
        " OR a.id IN (SELECT ag.assignment_id
            FROM assignment_groups ag
            JOIN group_teachers gt ON gt.group_id = ag.group_id
            WHERE gt.is_active AND gt.teacher_id = ",
    );
    builder.push_bind(teacher_id.to_string());
    builder.push("))");
}

fn push_student_scope(builder: &mut QueryBuilder<'_, Postgres>, student_id: &str) {
    builder.push_bind(AssignmentStatus::Published);
    builder.push(
        " AND a.id IN (SELECT ag.assignment_id
            FROM assignment_groups ag
            JOIN group_memberships gm ON gm.group_id = ag.group_id
            WHERE gm.is_active AND gm.student_id = ",
    );
    builder.push_bind(student_id.to_string());
    builder.push(")");
}

fn push_search(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(term) = search {
        let pattern = format!("%{term}%");
        builder.push(" AND (a.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR a.description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

fn push_page(
    builder: &mut QueryBuilder<'_, Postgres>,
    ordering: AssignmentOrdering,
    skip: i64,
    limit: i64,
) {
    builder.push(" ORDER BY ");
    builder.push(ordering.sql());
    builder.push(" OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));
}
