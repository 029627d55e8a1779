//! Outbox storage operations
//!
//! `dequeue_pending_events` takes row-level exclusive locks that hold for
//! the enclosing transaction; `SKIP LOCKED` keeps a second dispatcher from
//! selecting the same rows, so scale-out stays a deployment decision.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::model::OrderEvent;

/// Dequeue up to `limit` pending outbox rows in `(created_at, id)` order,
/// locked for the enclosing transaction
pub async fn dequeue_pending_events(
    conn: &mut PgConnection,
    limit: i64,
) -> Result<Vec<OrderEvent>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, aggregate_type, aggregate_id, event_type, event_payload,
               created_at, processed_at, status
        FROM order_outbox
        WHERE status = 'pending'
        ORDER BY created_at, id
        LIMIT $1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

/// Mark one outbox row processed. The `status = 'pending'` guard makes the
/// update conditional; a row that was already marked yields `RowNotFound`.
pub async fn mark_event_processed(
    conn: &mut PgConnection,
    event_id: Uuid,
    now: i64,
) -> Result<OrderEvent, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE order_outbox
        SET status = 'succeeded', processed_at = $1
        WHERE id = $2 AND status = 'pending'
        RETURNING id, aggregate_type, aggregate_id, event_type, event_payload,
                  created_at, processed_at, status
        "#,
    )
    .bind(now)
    .bind(event_id)
    .fetch_one(&mut *conn)
    .await
}
