//! ivrflow-engine: the IVR workflow engine.
//!
//! Hosts the two state machines of the system behind a single facade,
//! [`WorkflowService`]:
//!
//! - the review machine: a request moves DRAFT → SUBMITTED → IN_REVIEW
//!   (with a documents round-trip) → PENDING_APPROVAL → APPROVED/REJECTED,
//!   with escalation and cancellation reachable from every non-terminal
//!   state, every move role-gated and recorded in the audit trail;
//! - the fulfillment machine: an approved request derives exactly one
//!   order that advances PENDING → PROCESSING → PACKED → SHIPPED →
//!   DELIVERED, one step at a time.
//!
//! Both are backed by an injected [`WorkflowStore`](ivrflow_storage::WorkflowStore)
//! and publish through an injected [`ChangeBroker`]: after every committed
//! mutation, every registered subscriber is notified synchronously, before
//! the mutating call returns. Subscribers carry no payload; they re-read
//! through [`WorkflowService::get_snapshot`].
//!
//! # Public API
//!
//! - [`WorkflowService`] -- construct with a store and a broker
//! - [`NewRequest`] -- input for request creation
//! - [`EntitySnapshot`] -- pull-side read for notified subscribers
//! - [`ChangeBroker`] / [`SubscriberToken`] -- subscription surface
//! - [`WorkflowError`] -- the full error taxonomy

mod broker;
mod error;
mod fulfillment;
mod review;
mod service;

pub use broker::{ChangeBroker, SubscriberToken};
pub use error::WorkflowError;
pub use service::{EntitySnapshot, NewRequest, WorkflowService};
