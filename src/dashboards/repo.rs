use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Dashboard record: a named URL with a single owning user. Which users may
/// *access* it is tracked on the user side (`users.dashboards`); the two
/// relations are updated by different endpoints (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dashboard {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Dashboard {
    pub async fn create(
        db: &PgPool,
        name: &str,
        url: &str,
        user_id: Uuid,
    ) -> anyhow::Result<Dashboard> {
        let dashboard = sqlx::query_as::<_, Dashboard>(
            r#"
            INSERT INTO dashboards (name, url, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, url, user_id, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(url.trim())
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(dashboard)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Dashboard>> {
        let dashboard = sqlx::query_as::<_, Dashboard>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at
            FROM dashboards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(dashboard)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Dashboard>> {
        let dashboards = sqlx::query_as::<_, Dashboard>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at
            FROM dashboards
            ORDER BY created_at
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(dashboards)
    }

    /// Resolve a user's dashboard list to full records, keeping the list
    /// order. Dangling ids simply resolve to nothing.
    pub async fn list_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Dashboard>> {
        let dashboards = sqlx::query_as::<_, Dashboard>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at
            FROM dashboards
            WHERE id = ANY($1)
            ORDER BY array_position($1, id)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(dashboards)
    }

    /// Dashboards whose owner column matches any of the given ids.
    pub async fn list_by_owner_ids(db: &PgPool, owner_ids: &[Uuid]) -> anyhow::Result<Vec<Dashboard>> {
        let dashboards = sqlx::query_as::<_, Dashboard>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at
            FROM dashboards
            WHERE user_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(owner_ids)
        .fetch_all(db)
        .await?;
        Ok(dashboards)
    }

    /// Bulk-set the owner on the given dashboards.
    pub async fn claim_for_user(db: &PgPool, ids: &[Uuid], user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE dashboards SET user_id = $2, updated_at = now() WHERE id = ANY($1)")
            .bind(ids)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: &str,
        url: &str,
    ) -> anyhow::Result<Option<Dashboard>> {
        let dashboard = sqlx::query_as::<_, Dashboard>(
            r#"
            UPDATE dashboards
            SET name = $2, url = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, name, url, user_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(url.trim())
        .fetch_optional(db)
        .await?;
        Ok(dashboard)
    }

    /// Unconditional delete. User dashboard lists are not scrubbed; stale
    /// references resolve to nothing on read (see DESIGN.md).
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM dashboards WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
