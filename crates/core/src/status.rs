//! The two status enums and their transition graphs.
//!
//! Both graphs are closed: every permitted edge is written out in a single
//! exhaustive match, so an edge that is not listed here does not exist
//! anywhere in the system. The review graph branches and loops
//! (documents round-trip, escalation, cancellation); the fulfillment
//! pipeline is strictly linear with no skips and no reversal.

use serde::{Deserialize, Serialize};
use std::fmt;

// ──────────────────────────────────────────────
// IVR review states
// ──────────────────────────────────────────────

/// Review status of an [`IvrRequest`](crate::IvrRequest).
///
/// `Approved`, `Rejected`, and `Cancelled` are terminal: no edge leaves
/// them, ever. `Cancelled` is a tombstone, not a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IvrStatus {
    Draft,
    Submitted,
    InReview,
    DocumentsRequested,
    PendingApproval,
    Approved,
    Rejected,
    Escalated,
    Cancelled,
}

impl IvrStatus {
    /// Terminal statuses admit no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IvrStatus::Approved | IvrStatus::Rejected | IvrStatus::Cancelled
        )
    }

    /// The complete review transition graph. Any pair not matched here is
    /// not an edge.
    ///
    /// Escalation and cancellation are reachable from every non-terminal
    /// state; the escalation self-loop is excluded (re-escalating an
    /// already-escalated request appends an escalation record instead,
    /// it does not re-enter the state).
    pub fn can_transition_to(&self, target: IvrStatus) -> bool {
        use IvrStatus::*;
        match (self, target) {
            (Draft, Submitted) => true,
            (Submitted, InReview) => true,
            (InReview, DocumentsRequested) => true,
            (DocumentsRequested, InReview) => true,
            (InReview, PendingApproval) => true,
            (PendingApproval, Approved) => true,
            (PendingApproval, Rejected) => true,
            (InReview, Rejected) => true,
            (from, Escalated) => !from.is_terminal() && *from != Escalated,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for IvrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IvrStatus::Draft => "DRAFT",
            IvrStatus::Submitted => "SUBMITTED",
            IvrStatus::InReview => "IN_REVIEW",
            IvrStatus::DocumentsRequested => "DOCUMENTS_REQUESTED",
            IvrStatus::PendingApproval => "PENDING_APPROVAL",
            IvrStatus::Approved => "APPROVED",
            IvrStatus::Rejected => "REJECTED",
            IvrStatus::Escalated => "ESCALATED",
            IvrStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

// ──────────────────────────────────────────────
// Order fulfillment states
// ──────────────────────────────────────────────

/// Fulfillment status of an [`Order`](crate::Order).
///
/// The pipeline is a fixed linear sequence; the only legal move from any
/// status is to its immediate [`successor`](OrderStatus::successor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Packed,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// The single next status in the pipeline; `None` at `Delivered`.
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Packed),
            OrderStatus::Packed => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Packed => "PACKED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
        };
        write!(f, "{}", s)
    }
}
