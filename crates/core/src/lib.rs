//! ivrflow-core: domain model for the IVR workflow engine.
//!
//! An Insurance Verification Request (IVR) moves through a role-gated
//! review state machine (doctor submits, specialist reviews and decides);
//! an approved request may derive exactly one fulfillment [`Order`] that
//! moves through a strictly linear shipping pipeline. Every mutation is
//! recorded in append-only audit sequences nested inside the owning record.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root:
//!
//! - [`IvrRequest`] / [`IvrStatus`] -- the review-side entity and its
//!   transition graph
//! - [`Order`] / [`OrderStatus`] -- the fulfillment-side entity and its
//!   linear pipeline
//! - [`Actor`], [`Role`], [`Capability`], [`can_perform()`] -- the
//!   authorization surface consumed by the engine
//! - Audit entry types: [`StatusChange`], [`ReviewNote`],
//!   [`CommunicationEntry`], [`ApprovalRecord`], [`EscalationRecord`]

pub mod actor;
pub mod clock;
pub mod order;
pub mod request;
pub mod status;

pub use actor::{can_perform, Actor, Capability, Role};
pub use order::{FacilitySnapshot, FulfillmentChange, LogisticsMeta, Order};
pub use request::{
    ApprovalDecision, ApprovalRecord, Attachment, CommunicationEntry, EscalationRecord,
    FacilityRef, IvrRequest, Priority, ProductLine, ReviewNote, StatusChange,
};
pub use status::{IvrStatus, OrderStatus};
