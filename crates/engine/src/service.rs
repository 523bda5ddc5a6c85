//! The service facade: construction, subscription, and the read surface.
//!
//! Mutating operations live in the `review` and `fulfillment` modules;
//! this module owns the struct, the
//! injected dependencies, and everything pull-based a notified subscriber
//! needs.

use std::sync::Arc;

use ivrflow_core::{
    can_perform, Actor, Capability, FacilityRef, IvrRequest, IvrStatus, Order, OrderStatus,
    Priority, ProductLine, ReviewNote,
};
use ivrflow_storage::{StorageError, WorkflowStore};
use uuid::Uuid;

use crate::broker::{ChangeBroker, SubscriberToken};
use crate::error::WorkflowError;

/// Input for [`WorkflowService::create_request`].
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub patient_ref: String,
    pub service_type: String,
    pub priority: Priority,
    pub facility: FacilityRef,
    pub product_lines: Vec<ProductLine>,
}

/// Current materialized state of one entity, by id. The pull side of the
/// broker contract: subscribers are told only that something changed and
/// re-fetch through this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySnapshot {
    Request(IvrRequest),
    Order(Order),
}

/// Facade over the review and fulfillment state machines.
///
/// Constructed from an injected store and broker — there is no global
/// store and no hidden subscriber list, so two services over two stores
/// are fully independent (and independently testable).
pub struct WorkflowService<S: WorkflowStore> {
    pub(crate) store: Arc<S>,
    pub(crate) broker: ChangeBroker,
}

impl<S: WorkflowStore> WorkflowService<S> {
    pub fn new(store: Arc<S>, broker: ChangeBroker) -> Self {
        WorkflowService { store, broker }
    }

    // ── Subscription ─────────────────────────────────────────────────────

    /// Register a handler invoked synchronously after every committed
    /// mutation.
    pub fn subscribe(&self, handler: impl Fn() + Send + Sync + 'static) -> SubscriberToken {
        self.broker.subscribe(handler)
    }

    /// Deregister a previously-subscribed handler.
    pub fn unsubscribe(&self, token: &SubscriberToken) -> bool {
        self.broker.unsubscribe(token)
    }

    // ── Request creation ─────────────────────────────────────────────────

    /// Create a request in `Draft`, owned by the calling doctor.
    pub fn create_request(
        &self,
        actor: &Actor,
        input: NewRequest,
    ) -> Result<IvrRequest, WorkflowError> {
        const OP: &str = "create_request";
        if !can_perform(actor, Capability::SubmitRequest) {
            return Err(WorkflowError::Unauthorized {
                entity_id: "(new request)".to_string(),
                actor_id: actor.id.clone(),
                role: actor.role,
                operation: OP.to_string(),
            });
        }
        let request = IvrRequest::new(
            Uuid::new_v4().to_string(),
            input.patient_ref,
            actor.id.clone(),
            input.service_type,
            input.priority,
            input.facility,
            input.product_lines,
        );
        self.store
            .insert_request(request.clone())
            .map_err(|e| WorkflowError::from_storage(e, OP))?;
        tracing::info!(request_id = %request.id, provider = %actor.id, "request created");
        self.broker.notify();
        Ok(request)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Current state of a request.
    pub fn get_request(&self, id: &str) -> Result<IvrRequest, WorkflowError> {
        self.store
            .get_request(id)
            .map(|v| v.record)
            .map_err(|e| WorkflowError::from_storage(e, "get_request"))
    }

    /// Current state of an order.
    pub fn get_order(&self, id: &str) -> Result<Order, WorkflowError> {
        self.store
            .get_order(id)
            .map(|v| v.record)
            .map_err(|e| WorkflowError::from_storage(e, "get_order"))
    }

    /// Current state of whichever entity carries this id. Request ids are
    /// checked first; the two id spaces never collide in practice (both
    /// are engine-minted UUIDs).
    pub fn get_snapshot(&self, entity_id: &str) -> Result<EntitySnapshot, WorkflowError> {
        const OP: &str = "get_snapshot";
        match self.store.get_request(entity_id) {
            Ok(v) => return Ok(EntitySnapshot::Request(v.record)),
            Err(StorageError::NotFound { .. }) => {}
            Err(e) => return Err(WorkflowError::from_storage(e, OP)),
        }
        self.store
            .get_order(entity_id)
            .map(|v| EntitySnapshot::Order(v.record))
            .map_err(|e| WorkflowError::from_storage(e, OP))
    }

    /// Requests, optionally narrowed to one status (specialist queue view).
    pub fn list_requests(
        &self,
        status: Option<IvrStatus>,
    ) -> Result<Vec<IvrRequest>, WorkflowError> {
        self.store
            .list_requests(status)
            .map_err(|e| WorkflowError::from_storage(e, "list_requests"))
    }

    /// Orders, optionally narrowed to one status (logistics queue view).
    pub fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, WorkflowError> {
        self.store
            .list_orders(status)
            .map_err(|e| WorkflowError::from_storage(e, "list_orders"))
    }

    /// Review notes visible to this caller: internal notes are filtered
    /// out for non-reviewer roles. The stored log is never branched or
    /// rewritten; this is read-side filtering only.
    pub fn visible_review_notes(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<Vec<ReviewNote>, WorkflowError> {
        let request = self.get_request(request_id)?;
        let reviewer = actor.role.is_reviewer();
        Ok(request
            .review_notes
            .into_iter()
            .filter(|n| reviewer || !n.is_internal)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivrflow_core::Role;
    use ivrflow_storage::MemoryStore;

    fn service() -> WorkflowService<MemoryStore> {
        WorkflowService::new(Arc::new(MemoryStore::new()), ChangeBroker::new())
    }

    fn new_request() -> NewRequest {
        NewRequest {
            patient_ref: "patient-1".to_string(),
            service_type: "wound-care".to_string(),
            priority: Priority::Medium,
            facility: FacilityRef {
                id: "fac-1".to_string(),
                name: "Northside".to_string(),
            },
            product_lines: vec![],
        }
    }

    #[test]
    fn doctor_creates_draft_request() {
        let svc = service();
        let doctor = Actor::new("doc-1", Role::Doctor);
        let req = svc.create_request(&doctor, new_request()).unwrap();
        assert_eq!(req.status, IvrStatus::Draft);
        assert_eq!(req.provider_ref, "doc-1");
        assert_eq!(svc.get_request(&req.id).unwrap(), req);
    }

    #[test]
    fn non_doctor_cannot_create_request() {
        let svc = service();
        let spec = Actor::new("spec-1", Role::IvrSpecialist);
        let err = svc.create_request(&spec, new_request()).unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));
    }

    #[test]
    fn snapshot_resolves_request_by_id() {
        let svc = service();
        let doctor = Actor::new("doc-1", Role::Doctor);
        let req = svc.create_request(&doctor, new_request()).unwrap();
        match svc.get_snapshot(&req.id).unwrap() {
            EntitySnapshot::Request(r) => assert_eq!(r.id, req.id),
            other => panic!("expected Request snapshot, got {:?}", other),
        }
    }

    #[test]
    fn snapshot_unknown_id_not_found() {
        let svc = service();
        let err = svc.get_snapshot("missing").unwrap_err();
        assert_eq!(
            err,
            WorkflowError::NotFound {
                entity_id: "missing".to_string()
            }
        );
    }

    #[test]
    fn internal_notes_hidden_from_doctor() {
        let svc = service();
        let doctor = Actor::new("doc-1", Role::Doctor);
        let spec = Actor::new("spec-1", Role::IvrSpecialist);
        let req = svc.create_request(&doctor, new_request()).unwrap();
        svc.add_review_note(&req.id, "visible to all", &doctor, false)
            .unwrap();
        svc.add_review_note(&req.id, "eligibility doubtful", &spec, true)
            .unwrap();

        let doctor_view = svc.visible_review_notes(&req.id, &doctor).unwrap();
        assert_eq!(doctor_view.len(), 1);
        assert_eq!(doctor_view[0].note, "visible to all");

        let reviewer_view = svc.visible_review_notes(&req.id, &spec).unwrap();
        assert_eq!(reviewer_view.len(), 2);
    }
}
