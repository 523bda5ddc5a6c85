//! The fulfillment Order record derived from an approved request.
//!
//! An order is a point-in-time snapshot: facility, product lines, priority
//! and patient are copied from the source request at creation and never
//! read through afterward. Exactly one order may exist per request.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::actor::Role;
use crate::clock;
use crate::request::{Priority, ProductLine};
use crate::status::OrderStatus;

/// Facility data frozen at order-creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitySnapshot {
    pub facility_id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

/// Carrier and handler assignments, unset until logistics fills them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsMeta {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub assigned_handler: Option<String>,
}

/// One pipeline advance, with the acting role recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor_id: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// A fulfillment order. Terminal at `Delivered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Id of the approved request this order was derived from. Unique
    /// across all orders.
    pub source_ivr_id: String,
    pub status: OrderStatus,
    pub priority: Priority,
    pub patient_ref: String,
    pub facility_snapshot: FacilitySnapshot,
    pub product_lines: Vec<ProductLine>,
    pub logistics_meta: LogisticsMeta,
    pub status_history: Vec<FulfillmentChange>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Order {
    /// A fresh order in `Pending` snapshotted from request-side data.
    pub fn new(
        id: impl Into<String>,
        source_ivr_id: impl Into<String>,
        priority: Priority,
        patient_ref: impl Into<String>,
        facility_snapshot: FacilitySnapshot,
        product_lines: Vec<ProductLine>,
    ) -> Self {
        let now = clock::now_utc();
        Order {
            id: id.into(),
            source_ivr_id: source_ivr_id.into(),
            status: OrderStatus::Pending,
            priority,
            patient_ref: patient_ref.into(),
            facility_snapshot,
            product_lines,
            logistics_meta: LogisticsMeta::default(),
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Next audit timestamp for this order, non-decreasing.
    pub fn next_timestamp(&self) -> OffsetDateTime {
        clock::monotonic_after(Some(self.updated_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_starts_pending_with_unset_logistics() {
        let order = Order::new(
            "ord-1",
            "ivr-1",
            Priority::High,
            "patient-2",
            FacilitySnapshot {
                facility_id: "fac-1".to_string(),
                name: "Eastside".to_string(),
                captured_at: clock::now_utc(),
            },
            vec![],
        );
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.logistics_meta, LogisticsMeta::default());
        assert!(order.status_history.is_empty());
    }

    #[test]
    fn order_round_trips_through_json() {
        let order = Order::new(
            "ord-2",
            "ivr-9",
            Priority::Low,
            "patient-4",
            FacilitySnapshot {
                facility_id: "fac-2".to_string(),
                name: "Westside".to_string(),
                captured_at: clock::now_utc(),
            },
            vec![ProductLine {
                sku: "SKU-7".to_string(),
                description: "compression wrap".to_string(),
                quantity: 2,
            }],
        );
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
