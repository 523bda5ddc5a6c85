//! Actors, roles, and the capability check consumed by the engine.
//!
//! Identity itself lives outside the core: callers obtain an [`Actor`]
//! (id + role) from whatever identity service they use and pass it into
//! every mutating operation. The core only answers the capability
//! question: may this role perform this operation?

use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant role in the workflow.
///
/// `IvrSpecialist` and `Supervisor` are the reviewer roles; they alone
/// may move a request toward a coverage decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Prescribing doctor at the receiving facility. Creates and submits
    /// requests, confirms delivery.
    Doctor,
    /// IVR specialist reviewing coverage.
    IvrSpecialist,
    /// Reviewer with escalation authority.
    Supervisor,
    /// Order-fulfillment handler.
    Logistics,
}

impl Role {
    /// Reviewer roles may see internal notes and drive review transitions.
    pub fn is_reviewer(&self) -> bool {
        matches!(self, Role::IvrSpecialist | Role::Supervisor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Doctor => "DOCTOR",
            Role::IvrSpecialist => "IVR_SPECIALIST",
            Role::Supervisor => "SUPERVISOR",
            Role::Logistics => "LOGISTICS",
        };
        write!(f, "{}", s)
    }
}

/// An authenticated caller: opaque id plus role supplied by the host's
/// identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor {
            id: id.into(),
            role,
        }
    }
}

/// The closed set of workflow operations a role may or may not hold.
///
/// Ownership checks (e.g. only the *owning* doctor may submit) are layered
/// on top of this by the engine; the capability answers the role half only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Move an owned request out of DRAFT.
    SubmitRequest,
    /// Claim for review, request documents, resume review, move to
    /// pending approval.
    ReviewRequest,
    /// Enter APPROVED or REJECTED.
    DecideRequest,
    /// Raise an escalation on a non-terminal request.
    EscalateRequest,
    /// Tombstone a request as CANCELLED.
    CancelRequest,
    /// Author a reviewer-only note.
    AddInternalNote,
    /// Derive an order from an approved request.
    CreateOrder,
    /// Advance fulfillment through PROCESSING, PACKED, SHIPPED.
    AdvanceFulfillment,
    /// Mark an order DELIVERED (receiving-facility side).
    ConfirmDelivery,
}

/// Role-capability check. Exhaustive on purpose: adding a role or a
/// capability forces every pairing to be decided here rather than in
/// scattered call-site checks.
pub fn can_perform(actor: &Actor, capability: Capability) -> bool {
    use Capability::*;
    match capability {
        SubmitRequest => matches!(actor.role, Role::Doctor),
        ReviewRequest => actor.role.is_reviewer(),
        DecideRequest => actor.role.is_reviewer(),
        EscalateRequest => actor.role.is_reviewer(),
        CancelRequest => matches!(actor.role, Role::Doctor) || actor.role.is_reviewer(),
        AddInternalNote => actor.role.is_reviewer(),
        CreateOrder => actor.role.is_reviewer() || matches!(actor.role, Role::Logistics),
        AdvanceFulfillment => matches!(actor.role, Role::Logistics),
        ConfirmDelivery => matches!(actor.role, Role::Doctor),
    }
}
