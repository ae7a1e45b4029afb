use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub settings: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub struct ThemeService {
    pool: PgPool,
}

impl ThemeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// New themes start inactive.
    pub async fn create(&self, tenant_id: Uuid, name: &str, settings: &Value) -> Result<Theme, sqlx::Error> {
        sqlx::query_as::<_, Theme>(
            r#"
            INSERT INTO themes (id, tenant_id, name, settings)
            VALUES (gen_random_uuid(), $1, $2, $3)
            RETURNING id, tenant_id, name, settings, is_active, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(settings)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Theme>, sqlx::Error> {
        sqlx::query_as::<_, Theme>(
            r#"
            SELECT id, tenant_id, name, settings, is_active, created_at
            FROM themes WHERE tenant_id = $1
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn active(&self, tenant_id: Uuid) -> Result<Option<Theme>, sqlx::Error> {
        sqlx::query_as::<_, Theme>(
            r#"
            SELECT id, tenant_id, name, settings, is_active, created_at
            FROM themes WHERE tenant_id = $1 AND is_active
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Make `theme_id` the tenant's only active theme.
    ///
    /// All of the tenant's theme rows are locked first, so concurrent
    /// activations for one tenant run one after the other.
    pub async fn activate(&self, tenant_id: Uuid, theme_id: Uuid) -> Result<Theme, StoreError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM themes WHERE tenant_id = $1 FOR UPDATE",
        )
        .bind(tenant_id)
        .fetch_all(&mut *tx)
        .await?;
        if !locked.iter().any(|(id,)| *id == theme_id) {
            tx.rollback().await?;
            return Err(StoreError::ThemeNotFound(theme_id));
        }

        sqlx::query("UPDATE themes SET is_active = FALSE WHERE tenant_id = $1 AND is_active AND id <> $2")
            .bind(tenant_id)
            .bind(theme_id)
            .execute(&mut *tx)
            .await?;
        let theme = sqlx::query_as::<_, Theme>(
            r#"
            UPDATE themes SET is_active = TRUE
            WHERE id = $1
            RETURNING id, tenant_id, name, settings, is_active, created_at
            "#,
        )
        .bind(theme_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(%tenant_id, %theme_id, name = %theme.name, "theme activated");
        Ok(theme)
    }
}
