//! Order endpoints: create (the atomic write path), point lookup, list

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::model::{CreateOrderRequest, Order, check_created_pair, now_secs};
use crate::state::AppState;

/// POST /orders
///
/// Inserts the order row and its `ORDER_CREATED` outbox row in one
/// transaction, then answers 202: the write is durable but downstream
/// visibility is asynchronous. The fresh-row checks run before commit;
/// a violation rolls the transaction back.
pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let Json(req) = body.map_err(|e| AppError::validation(format!("invalid request body: {e}")))?;
    req.validate()?;

    let mut tx = state.pool.begin().await?;

    let (order, event) = db::orders::create_order_and_event(
        &mut *tx,
        req.amount,
        &req.currency,
        &req.customer,
        &req.description,
        now_secs(),
    )
    .await?;

    // Rolls back on the implicit drop when this errors
    check_created_pair(&order, &event)?;

    tx.commit().await?;

    Ok((StatusCode::ACCEPTED, Json(order)))
}

/// GET /orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<Order>> {
    let id: i64 = order_id
        .parse()
        .map_err(|_| AppError::InvalidOrderId(order_id.clone()))?;

    let mut tx = state.pool.begin().await?;
    let order = db::orders::get_order(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    tx.commit().await?;

    Ok(Json(order))
}

/// GET /orders — full list, no pagination in v1
pub async fn list_orders(State(state): State<AppState>) -> AppResult<Json<Vec<Order>>> {
    let mut tx = state.pool.begin().await?;
    let orders = db::orders::list_orders(&mut *tx).await?;
    tx.commit().await?;

    tracing::debug!(count = orders.len(), "Listed orders");
    Ok(Json(orders))
}
