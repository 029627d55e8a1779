//! Order storage operations
//!
//! The create path is a single statement: one CTE inserts the order row and
//! a second inserts the matching outbox row, with the event payload built by
//! `jsonb_build_object` from the columns just written. Committing one is
//! committing both.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::model::{Order, OrderEvent, OrderStatus, OutboxStatus};

#[derive(sqlx::FromRow)]
struct CreatedPairRow {
    id: i64,
    amount: f64,
    currency: String,
    customer: String,
    description: String,
    created_at: i64,
    updated_at: Option<i64>,
    #[sqlx(try_from = "String")]
    status: OrderStatus,
    event_id: Uuid,
    aggregate_type: String,
    aggregate_id: i64,
    event_type: String,
    event_payload: serde_json::Value,
    event_created_at: i64,
    processed_at: Option<i64>,
    #[sqlx(try_from = "String")]
    event_status: OutboxStatus,
}

impl CreatedPairRow {
    fn into_pair(self) -> (Order, OrderEvent) {
        (
            Order {
                id: self.id,
                amount: self.amount,
                currency: self.currency,
                customer: self.customer,
                description: self.description,
                created_at: self.created_at,
                updated_at: self.updated_at,
                status: self.status,
            },
            OrderEvent {
                id: self.event_id,
                aggregate_type: self.aggregate_type,
                aggregate_id: self.aggregate_id,
                event_type: self.event_type,
                event_payload: self.event_payload,
                created_at: self.event_created_at,
                processed_at: self.processed_at,
                status: self.event_status,
            },
        )
    }
}

/// Insert an order and its `ORDER_CREATED` outbox row in one round-trip,
/// returning both with their server-assigned columns populated
pub async fn create_order_and_event(
    conn: &mut PgConnection,
    amount: f64,
    currency: &str,
    customer: &str,
    description: &str,
    now: i64,
) -> Result<(Order, OrderEvent), sqlx::Error> {
    let row: CreatedPairRow = sqlx::query_as(
        r#"
        WITH new_order AS (
            INSERT INTO orders (amount, currency, customer, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, amount, currency, customer, description,
                      created_at, updated_at, status
        ), new_event AS (
            INSERT INTO order_outbox
                (aggregate_type, aggregate_id, event_type, event_payload, created_at)
            SELECT 'Order', id, 'ORDER_CREATED',
                   jsonb_build_object(
                       'amount', amount,
                       'currency', currency,
                       'customer', customer,
                       'description', description
                   ),
                   created_at
            FROM new_order
            RETURNING id, aggregate_type, aggregate_id, event_type, event_payload,
                      created_at, processed_at, status
        )
        SELECT o.id, o.amount, o.currency, o.customer, o.description,
               o.created_at, o.updated_at, o.status,
               e.id AS event_id, e.aggregate_type, e.aggregate_id, e.event_type,
               e.event_payload, e.created_at AS event_created_at,
               e.processed_at, e.status AS event_status
        FROM new_order o, new_event e
        "#,
    )
    .bind(amount)
    .bind(currency)
    .bind(customer)
    .bind(description)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into_pair())
}

/// Point lookup by id
pub async fn get_order(conn: &mut PgConnection, id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, amount, currency, customer, description,
               created_at, updated_at, status
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

/// Full order list; callers must not rely on the ordering
pub async fn list_orders(conn: &mut PgConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, amount, currency, customer, description,
               created_at, updated_at, status
        FROM orders
        "#,
    )
    .fetch_all(&mut *conn)
    .await
}
