use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::GroupMembership;
use crate::db::types::GroupRole;

const COLUMNS: &str = "id, group_id, student_id, role, joined_at, is_active";

/// Membership row joined with the student's display name for roster views.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MembershipRow {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) role: GroupRole,
    pub(crate) joined_at: PrimitiveDateTime,
    pub(crate) is_active: bool,
}

pub(crate) struct CreateMembership<'a> {
    pub(crate) id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) role: GroupRole,
    pub(crate) joined_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateMembership<'_>,
) -> Result<GroupMembership, sqlx::Error> {
    sqlx::query_as::<_, GroupMembership>(&format!(
        "INSERT INTO group_memberships (id, group_id, student_id, role, joined_at, is_active)
         VALUES ($1,$2,$3,$4,$5,TRUE)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.group_id)
    .bind(params.student_id)
    .bind(params.role)
    .bind(params.joined_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_for_group_student(
    pool: &PgPool,
    group_id: &str,
    student_id: &str,
) -> Result<Option<GroupMembership>, sqlx::Error> {
    sqlx::query_as::<_, GroupMembership>(&format!(
        "SELECT {COLUMNS} FROM group_memberships WHERE group_id = $1 AND student_id = $2"
    ))
    .bind(group_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_in_group(
    pool: &PgPool,
    id: &str,
    group_id: &str,
) -> Result<Option<GroupMembership>, sqlx::Error> {
    sqlx::query_as::<_, GroupMembership>(&format!(
        "SELECT {COLUMNS} FROM group_memberships WHERE id = $1 AND group_id = $2"
    ))
    .bind(id)
    .bind(group_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn set_active(
    pool: &PgPool,
    id: &str,
    is_active: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE group_memberships SET is_active = $1 WHERE id = $2")
        .bind(is_active)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn list_active_for_group(
    pool: &PgPool,
    group_id: &str,
) -> Result<Vec<MembershipRow>, sqlx::Error> {
    sqlx::query_as::<_, MembershipRow>(
        "SELECT gm.id,
                gm.group_id,
                gm.student_id,
                CASE WHEN btrim(u.first_name || ' ' || u.last_name) = ''
                     THEN u.username
                     ELSE btrim(u.first_name || ' ' || u.last_name)
                END AS student_name,
                gm.role,
                gm.joined_at,
                gm.is_active
         FROM group_memberships gm
         JOIN student_profiles sp ON sp.id = gm.student_id
         JOIN users u ON u.id = sp.user_id
         WHERE gm.group_id = $1 AND gm.is_active
         ORDER BY gm.joined_at",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn has_active_membership(
    pool: &PgPool,
    group_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM group_memberships
         WHERE group_id = $1 AND student_id = $2 AND is_active",
    )
    .bind(group_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}
