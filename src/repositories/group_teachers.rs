use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::GroupTeacher;

const COLUMNS: &str = "id, group_id, teacher_id, joined_at, is_active";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GroupTeacherRow {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) teacher_id: String,
    pub(crate) teacher_name: String,
    pub(crate) joined_at: PrimitiveDateTime,
    pub(crate) is_active: bool,
}

pub(crate) struct CreateGroupTeacher<'a> {
    pub(crate) id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) teacher_id: &'a str,
    pub(crate) joined_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateGroupTeacher<'_>,
) -> Result<GroupTeacher, sqlx::Error> {
    sqlx::query_as::<_, GroupTeacher>(&format!(
        "INSERT INTO group_teachers (id, group_id, teacher_id, joined_at, is_active)
         VALUES ($1,$2,$3,$4,TRUE)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.group_id)
    .bind(params.teacher_id)
    .bind(params.joined_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_for_group_teacher(
    pool: &PgPool,
    group_id: &str,
    teacher_id: &str,
) -> Result<Option<GroupTeacher>, sqlx::Error> {
    sqlx::query_as::<_, GroupTeacher>(&format!(
        "SELECT {COLUMNS} FROM group_teachers WHERE group_id = $1 AND teacher_id = $2"
    ))
    .bind(group_id)
    .bind(teacher_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_in_group(
    pool: &PgPool,
    id: &str,
    group_id: &str,
) -> Result<Option<GroupTeacher>, sqlx::Error> {
    sqlx::query_as::<_, GroupTeacher>(&format!(
        "SELECT {COLUMNS} FROM group_teachers WHERE id = $1 AND group_id = $2"
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
    sqlx::query("UPDATE group_teachers SET is_active = $1 WHERE id = $2")
        .bind(is_active)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn list_active_for_group(
    pool: &PgPool,
    group_id: &str,
) -> Result<Vec<GroupTeacherRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupTeacherRow>(
        "SELECT gt.id,
                gt.group_id,
                gt.teacher_id,
                CASE WHEN btrim(u.first_name || ' ' || u.last_name) = ''
                     THEN u.username
                     ELSE btrim(u.first_name || ' ' || u.last_name)
                END AS teacher_name,
                gt.joined_at,
                gt.is_active
         FROM group_teachers gt
         JOIN teacher_profiles tp ON tp.id = gt.teacher_id
         JOIN users u ON u.id = tp.user_id
         WHERE gt.group_id = $1 AND gt.is_active
         ORDER BY gt.joined_at",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}
