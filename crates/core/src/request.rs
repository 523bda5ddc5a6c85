//! The IVRRequest record and its nested append-only audit sequences.
//!
//! A request owns its entire audit trail: status history, review notes,
//! communication thread, approvals, and escalations are ordered sequences
//! nested inside the record. Entries are immutable once appended and the
//! sequences never branch; visibility filtering (internal notes) happens
//! on the read side only.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::clock;
use crate::status::IvrStatus;

/// Urgency of a request; raised by escalation, copied onto the derived order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// One step more urgent, saturating at `Urgent`.
    pub fn raised(&self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High | Priority::Urgent => Priority::Urgent,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        };
        write!(f, "{}", s)
    }
}

/// Reference to the facility a request originates from. Copied into the
/// order's [`FacilitySnapshot`](crate::FacilitySnapshot) at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityRef {
    pub id: String,
    pub name: String,
}

/// A requested product line (what fulfillment will ship).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    pub sku: String,
    pub description: String,
    pub quantity: u32,
}

/// Opaque reference to an uploaded document. The core never fetches the
/// bytes behind `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// One status transition in the request's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: IvrStatus,
    pub to: IvrStatus,
    pub actor_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// An audit comment on a request. `is_internal` notes are visible only to
/// reviewer-role callers; the filter is applied at read time, the log
/// itself holds every note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewNote {
    pub note: String,
    pub author_ref: String,
    /// Status of the request at the moment the note was written.
    pub status: IvrStatus,
    pub is_internal: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// A message in the participant-visible communication thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationEntry {
    pub author_ref: String,
    pub message: String,
    pub attachments: Vec<Attachment>,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// Outcome recorded when a reviewer decides a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// One approval-chain entry; `level` counts decisions on this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub level: u32,
    pub decision: ApprovalDecision,
    pub actor_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// A priority-raising event. Does not touch `status` or reset history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub actor_id: String,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// An Insurance Verification Request.
///
/// Created in `Draft` by a doctor; mutated only through the engine's
/// operations; never deleted (`Cancelled` is a tombstone). All audit
/// sequences are append-only with non-decreasing timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvrRequest {
    pub id: String,
    pub patient_ref: String,
    /// Actor id of the owning doctor.
    pub provider_ref: String,
    pub service_type: String,
    pub priority: Priority,
    pub status: IvrStatus,
    pub facility: FacilityRef,
    pub product_lines: Vec<ProductLine>,
    pub status_history: Vec<StatusChange>,
    pub review_notes: Vec<ReviewNote>,
    pub communication: Vec<CommunicationEntry>,
    pub approvals: Vec<ApprovalRecord>,
    pub escalations: Vec<EscalationRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl IvrRequest {
    /// A fresh request in `Draft` with empty audit sequences.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        patient_ref: impl Into<String>,
        provider_ref: impl Into<String>,
        service_type: impl Into<String>,
        priority: Priority,
        facility: FacilityRef,
        product_lines: Vec<ProductLine>,
    ) -> Self {
        let now = clock::now_utc();
        IvrRequest {
            id: id.into(),
            patient_ref: patient_ref.into(),
            provider_ref: provider_ref.into(),
            service_type: service_type.into(),
            priority,
            status: IvrStatus::Draft,
            facility,
            product_lines,
            status_history: Vec::new(),
            review_notes: Vec::new(),
            communication: Vec::new(),
            approvals: Vec::new(),
            escalations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Next audit timestamp for this request: now, clamped so the trail
    /// stays non-decreasing.
    pub fn next_timestamp(&self) -> OffsetDateTime {
        clock::monotonic_after(Some(self.updated_at))
    }
}
