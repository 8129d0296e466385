use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Group;

const GROUP_COLUMNS: &str =
    "id, name, code, description, created_by, is_active, created_at, updated_at";

/// Group row enriched with the creator's display name and active roster sizes.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GroupView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) created_by_name: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) member_count: i64,
    pub(crate) teacher_count: i64,
}

const GROUP_VIEW_SELECT: &str = "\
    SELECT g.id,
           g.name,
           g.code,
           g.description,
           g.created_by,
           CASE WHEN btrim(u.first_name || ' ' || u.last_name) = ''
                THEN u.username
                ELSE btrim(u.first_name || ' ' || u.last_name)
           END AS created_by_name,
           g.is_active,
           g.created_at,
           g.updated_at,
           (SELECT COUNT(*) FROM group_memberships gm
             WHERE gm.group_id = g.id AND gm.is_active) AS member_count,
           (SELECT COUNT(*) FROM group_teachers gt
             WHERE gt.group_id = g.id AND gt.is_active) AS teacher_count
    FROM groups g
    JOIN teacher_profiles tp ON tp.id = g.created_by
    JOIN users u ON u.id = tp.user_id";

pub(crate) struct CreateGroup<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) code: &'a str,
    pub(crate) description: &'a str,
    pub(crate) created_by: &'a str,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateGroup<'_>) -> Result<Group, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!(
        "INSERT INTO groups (
            id, name, code, description, created_by, is_active, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {GROUP_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.code)
    .bind(params.description)
    .bind(params.created_by)
    .bind(params.is_active)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_view_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<GroupView>, sqlx::Error> {
    sqlx::query_as::<_, GroupView>(&format!("{GROUP_VIEW_SELECT} WHERE g.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_code(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM groups WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub(crate) struct UpdateGroup {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) is_active: Option<bool>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateGroup,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE groups SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            is_active = COALESCE($3, is_active),
            updated_at = $4
         WHERE id = $5",
    )
    .bind(params.name)
    .bind(params.description)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM groups WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_all(
    pool: &PgPool,
    search: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<GroupView>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(GROUP_VIEW_SELECT);
    push_search(&mut builder, " WHERE ", search);
    push_page(&mut builder, skip, limit);
    builder.build_query_as::<GroupView>().fetch_all(pool).await
}

pub(crate) async fn count_all(pool: &PgPool, search: Option<&str>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM groups g");
    push_search(&mut builder, " WHERE ", search);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
    search: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<GroupView>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(GROUP_VIEW_SELECT);
    builder.push(
        " WHERE EXISTS (SELECT 1 FROM group_memberships gm
            WHERE gm.group_id = g.id AND gm.is_active AND gm.student_id = ",
    );
    builder.push_bind(student_id);
    builder.push(")");
    push_search(&mut builder, " AND ", search);
    push_page(&mut builder, skip, limit);
    builder.build_query_as::<GroupView>().fetch_all(pool).await
}

pub(crate) async fn count_for_student(
    pool: &PgPool,
    student_id: &str,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM groups g
         WHERE EXISTS (SELECT 1 FROM group_memberships gm
            WHERE gm.group_id = g.id AND gm.is_active AND gm.student_id = ",
    );
    builder.push_bind(student_id);
    builder.push(")");
    push_search(&mut builder, " AND ", search);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_search(builder: &mut QueryBuilder<'_, Postgres>, prefix: &str, search: Option<&str>) {
    if let Some(term) = search {
        let pattern = format!("%{term}%");
        builder.push(prefix);
        builder.push("(g.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR g.code ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR g.description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, skip: i64, limit: i64) {
    builder.push(" ORDER BY g.created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));
}
