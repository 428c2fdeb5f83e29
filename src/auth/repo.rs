use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub roles: Vec<String>,
    pub dashboards: Vec<Uuid>, // ordered, duplicates representable
    pub created_at: OffsetDateTime,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, roles, dashboards, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, roles, dashboards, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password, roles and initial dashboards.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        roles: &[String],
        dashboards: &[Uuid],
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, roles, dashboards)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, roles, dashboards, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(roles)
        .bind(dashboards)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Replace the stored password hash.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Persist the user's dashboard list.
    pub async fn set_dashboards(db: &PgPool, id: Uuid, dashboards: &[Uuid]) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET dashboards = $2 WHERE id = $1")
            .bind(id)
            .bind(dashboards)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, roles, dashboards, created_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// All users whose dashboard list does not yet contain the given id.
    /// Membership is checked on the canonical UUID value.
    pub async fn list_unassigned(db: &PgPool, dashboard_id: Uuid) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, roles, dashboards, created_at
            FROM users
            WHERE NOT ($1 = ANY(dashboards))
            ORDER BY created_at
            "#,
        )
        .bind(dashboard_id)
        .fetch_all(db)
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_json_never_contains_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            password_hash: "$argon2id$secret".into(),
            roles: vec!["mod".into()],
            dashboards: vec![Uuid::new_v4()],
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("a@b.co"));
        assert!(json.contains("dashboards"));
    }
}
