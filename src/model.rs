//! Domain model: orders and their outbox events
//!
//! An accepted order always has exactly one `ORDER_CREATED` outbox row,
//! written in the same transaction. The outbox row carries the business
//! fields as a JSON payload built by the database INSERT, which makes the
//! stored payload the authoritative encoding.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Aggregate type written into every order outbox row
pub const AGGREGATE_TYPE_ORDER: &str = "Order";
/// Event type for order creation
pub const EVENT_TYPE_ORDER_CREATED: &str = "ORDER_CREATED";

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Outbox row status; `Failed` is reserved for a future dead-letter policy
/// and is never written in v1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Succeeded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(Self::Pending),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl TryFrom<String> for OutboxStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(Self::Pending),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order aggregate as stored and as served over HTTP
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub amount: f64,
    pub currency: String,
    pub customer: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
}

/// Outbox row, 1:1 with the originating order insert in v1
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: i64,
    pub event_type: String,
    pub event_payload: serde_json::Value,
    pub created_at: i64,
    pub processed_at: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: OutboxStatus,
}

/// Body of `POST /orders`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: f64,
    pub currency: String,
    pub customer: String,
    pub description: String,
}

impl CreateOrderRequest {
    /// Validate the business fields; only `usd` is accepted in v1
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount <= 0.0 {
            return Err(AppError::validation(format!(
                "order amount must be positive: got {}",
                self.amount
            )));
        }
        if self.currency != "usd" {
            return Err(AppError::validation(format!(
                "order currency must be usd: got {}",
                self.currency
            )));
        }
        if self.customer.is_empty() {
            return Err(AppError::validation("order customer must not be empty"));
        }
        if self.description.is_empty() {
            return Err(AppError::validation("order description must not be empty"));
        }
        Ok(())
    }
}

/// Consistency checks on a freshly inserted order/event pair.
///
/// These observe the values the database just returned; any violation means
/// a bug, the enclosing transaction must roll back. The stored payload is
/// authoritative, so there is deliberately no byte comparison against a
/// re-encoded copy of the request.
pub fn check_created_pair(order: &Order, event: &OrderEvent) -> Result<(), AppError> {
    if order.updated_at.is_some() {
        return Err(AppError::invariant("new order has non-null updated_at"));
    }
    if order.status != OrderStatus::Pending {
        return Err(AppError::invariant(format!(
            "new order has status {}, expected pending",
            order.status
        )));
    }
    if event.aggregate_type != AGGREGATE_TYPE_ORDER {
        return Err(AppError::invariant(format!(
            "new event has aggregate_type {}, expected {AGGREGATE_TYPE_ORDER}",
            event.aggregate_type
        )));
    }
    if event.aggregate_id != order.id {
        return Err(AppError::invariant(format!(
            "event aggregate_id {} does not reference order {}",
            event.aggregate_id, order.id
        )));
    }
    if event.event_type != EVENT_TYPE_ORDER_CREATED {
        return Err(AppError::invariant(format!(
            "new event has event_type {}, expected {EVENT_TYPE_ORDER_CREATED}",
            event.event_type
        )));
    }
    if !event.event_payload.is_object() {
        return Err(AppError::invariant("event payload is not a JSON object"));
    }
    if event.processed_at.is_some() {
        return Err(AppError::invariant("new event has non-null processed_at"));
    }
    if event.status != OutboxStatus::Pending {
        return Err(AppError::invariant(format!(
            "new event has status {}, expected pending",
            event.status
        )));
    }
    Ok(())
}

/// Seconds since epoch
pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> Order {
        Order {
            id: 1,
            amount: 10.0,
            currency: "usd".into(),
            customer: "c1".into(),
            description: "d1".into(),
            created_at: 1_700_000_000,
            updated_at: None,
            status: OrderStatus::Pending,
        }
    }

    fn event() -> OrderEvent {
        OrderEvent {
            id: Uuid::new_v4(),
            aggregate_type: AGGREGATE_TYPE_ORDER.into(),
            aggregate_id: 1,
            event_type: EVENT_TYPE_ORDER_CREATED.into(),
            event_payload: json!({
                "amount": 10.0,
                "currency": "usd",
                "customer": "c1",
                "description": "d1",
            }),
            created_at: 1_700_000_000,
            processed_at: None,
            status: OutboxStatus::Pending,
        }
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            amount: 10.0,
            currency: "usd".into(),
            customer: "c1".into(),
            description: "d1".into(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "succeeded", "failed"] {
            let status = OrderStatus::try_from(s.to_string()).unwrap();
            assert_eq!(status.as_str(), s);
            let status = OutboxStatus::try_from(s.to_string()).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!(OrderStatus::try_from("done".to_string()).is_err());
        assert!(OutboxStatus::try_from("".to_string()).is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&OutboxStatus::Succeeded).unwrap(),
            "\"succeeded\""
        );
    }

    #[test]
    fn test_order_json_shape() {
        let json = serde_json::to_value(order()).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["amount"], 10.0);
        assert_eq!(json["currency"], "usd");
        assert_eq!(json["customer"], "c1");
        assert_eq!(json["description"], "d1");
        assert_eq!(json["created_at"], 1_700_000_000_i64);
        assert!(json["updated_at"].is_null());
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_validate_accepts_good_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let mut req = request();
        req.amount = 0.0;
        assert!(req.validate().is_err());
        req.amount = -1.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_usd_currency() {
        let mut req = request();
        req.currency = "eur".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut req = request();
        req.customer = String::new();
        assert!(req.validate().is_err());

        let mut req = request();
        req.description = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_check_created_pair_accepts_fresh_rows() {
        assert!(check_created_pair(&order(), &event()).is_ok());
    }

    #[test]
    fn test_check_created_pair_rejects_violations() {
        let mut o = order();
        o.updated_at = Some(1);
        assert!(check_created_pair(&o, &event()).is_err());

        let mut o = order();
        o.status = OrderStatus::Succeeded;
        assert!(check_created_pair(&o, &event()).is_err());

        let mut e = event();
        e.aggregate_id = 2;
        assert!(check_created_pair(&order(), &e).is_err());

        let mut e = event();
        e.aggregate_type = "orders".into();
        assert!(check_created_pair(&order(), &e).is_err());

        let mut e = event();
        e.event_type = "ORDER_UPDATED".into();
        assert!(check_created_pair(&order(), &e).is_err());

        let mut e = event();
        e.processed_at = Some(1);
        assert!(check_created_pair(&order(), &e).is_err());

        let mut e = event();
        e.status = OutboxStatus::Succeeded;
        assert!(check_created_pair(&order(), &e).is_err());

        let mut e = event();
        e.event_payload = json!([1, 2, 3]);
        assert!(check_created_pair(&order(), &e).is_err());
    }
}
