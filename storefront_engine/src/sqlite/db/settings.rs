use sqlx::SqliteConnection;

use crate::db_types::SiteSetting;

pub async fn fetch_setting(key: &str, conn: &mut SqliteConnection) -> Result<Option<SiteSetting>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM site_settings WHERE key = $1").bind(key).fetch_optional(conn).await
}

pub async fn upsert_setting(key: &str, value: &str, conn: &mut SqliteConnection) -> Result<SiteSetting, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO site_settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(key)
    .bind(value)
    .fetch_one(conn)
    .await
}
