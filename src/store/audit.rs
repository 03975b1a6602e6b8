use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::ApiError;

/// Append one trail entry. Runs on the caller's connection so workflow
/// transitions and their audit entries commit together.
pub async fn record(
    conn: &mut SqliteConnection,
    actor: i64,
    action: &str,
    entity: &str,
    entity_id: i64,
    before_status: Option<&str>,
    after_status: Option<&str>,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (actor, action, entity, entity_id, before_status, after_status, at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(actor)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(before_status)
    .bind(after_status)
    .bind(Utc::now().naive_utc())
    .execute(&mut *conn)
    .await?;

    tracing::info!(actor, action, entity, entity_id, "audit entry recorded");
    Ok(())
}
