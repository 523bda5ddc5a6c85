//! Order fulfillment state machine.
//!
//! An order is derived from exactly one approved request and then walks
//! the fixed pipeline PENDING → PROCESSING → PACKED → SHIPPED →
//! DELIVERED, one step per call. Creation is idempotent: repeated calls
//! for the same request return the existing order, including when two
//! creators race (the storage-level uniqueness of `source_ivr_id` picks
//! the winner and the loser reads it back).

use ivrflow_core::{
    can_perform, clock, Actor, Capability, FacilitySnapshot, FulfillmentChange, IvrStatus, Order,
    OrderStatus,
};
use ivrflow_storage::{StorageError, Versioned, WorkflowStore};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::service::WorkflowService;

impl<S: WorkflowStore> WorkflowService<S> {
    /// Derive the order for an approved request, snapshotting facility,
    /// product lines, priority, and patient at creation time.
    ///
    /// Idempotent: if an order already exists for the request it is
    /// returned as-is. Approval itself never calls this — order creation
    /// stays an explicit, separate step.
    pub fn create_order_from_ivr(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<Order, WorkflowError> {
        const OP: &str = "create_order_from_ivr";
        if !can_perform(actor, Capability::CreateOrder) {
            return Err(WorkflowError::Unauthorized {
                entity_id: request_id.to_string(),
                actor_id: actor.id.clone(),
                role: actor.role,
                operation: OP.to_string(),
            });
        }
        let request = self
            .store
            .get_request(request_id)
            .map_err(|e| WorkflowError::from_storage(e, OP))?
            .record;
        if request.status != IvrStatus::Approved {
            return Err(WorkflowError::PreconditionFailed {
                entity_id: request.id,
                operation: OP.to_string(),
                reason: format!("request is {}, not APPROVED", request.status),
            });
        }
        if let Some(existing) = self
            .store
            .find_order_for_request(request_id)
            .map_err(|e| WorkflowError::from_storage(e, OP))?
        {
            return Ok(existing);
        }

        let order = Order::new(
            Uuid::new_v4().to_string(),
            request.id.clone(),
            request.priority,
            request.patient_ref.clone(),
            FacilitySnapshot {
                facility_id: request.facility.id.clone(),
                name: request.facility.name.clone(),
                captured_at: clock::now_utc(),
            },
            request.product_lines.clone(),
        );
        match self.store.insert_order(order.clone()) {
            Ok(()) => {
                tracing::info!(order_id = %order.id, request_id = %request.id, "order created");
                self.broker.notify();
                Ok(order)
            }
            // Lost the creation race: the winner's order is the order.
            Err(StorageError::AlreadyExists { .. }) => self
                .store
                .find_order_for_request(request_id)
                .map_err(|e| WorkflowError::from_storage(e, OP))?
                .ok_or(WorkflowError::Conflict {
                    entity_id: request_id.to_string(),
                    operation: OP.to_string(),
                }),
            Err(e) => Err(WorkflowError::from_storage(e, OP)),
        }
    }

    /// Advance an order to the single next pipeline status.
    ///
    /// A repeat, a skip, or any backward move is an invalid transition.
    /// `Delivered` is the receiving facility's confirmation and needs a
    /// doctor-role actor; every earlier step is logistics work.
    pub fn advance_order_status(
        &self,
        order_id: &str,
        target: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, WorkflowError> {
        const OP: &str = "advance_order_status";
        let Versioned {
            version,
            record: mut order,
        } = self
            .store
            .get_order(order_id)
            .map_err(|e| WorkflowError::from_storage(e, OP))?;

        if order.status.successor() != Some(target) {
            return Err(WorkflowError::InvalidTransition {
                entity_id: order.id,
                from: order.status.to_string(),
                to: target.to_string(),
            });
        }
        let capability = match target {
            OrderStatus::Delivered => Capability::ConfirmDelivery,
            _ => Capability::AdvanceFulfillment,
        };
        if !can_perform(actor, capability) {
            return Err(WorkflowError::Unauthorized {
                entity_id: order.id,
                actor_id: actor.id.clone(),
                role: actor.role,
                operation: format!("advance to {}", target),
            });
        }

        let from = order.status;
        let at = order.next_timestamp();
        order.status_history.push(FulfillmentChange {
            from,
            to: target,
            actor_id: actor.id.clone(),
            role: actor.role,
            at,
        });
        order.status = target;
        order.updated_at = at;

        self.store
            .update_order(version, order.clone())
            .map_err(|e| WorkflowError::from_storage(e, OP))?;
        tracing::info!(
            order_id = %order.id,
            from = %from,
            to = %target,
            actor = %actor.id,
            "fulfillment advance committed"
        );
        self.broker.notify();
        Ok(order)
    }

    /// Fill in carrier/tracking/handler assignments. Logistics-only;
    /// provided fields overwrite, omitted fields are left as they are.
    pub fn assign_logistics(
        &self,
        order_id: &str,
        actor: &Actor,
        carrier: Option<&str>,
        tracking_number: Option<&str>,
        assigned_handler: Option<&str>,
    ) -> Result<Order, WorkflowError> {
        const OP: &str = "assign_logistics";
        if !can_perform(actor, Capability::AdvanceFulfillment) {
            return Err(WorkflowError::Unauthorized {
                entity_id: order_id.to_string(),
                actor_id: actor.id.clone(),
                role: actor.role,
                operation: OP.to_string(),
            });
        }
        let Versioned {
            version,
            record: mut order,
        } = self
            .store
            .get_order(order_id)
            .map_err(|e| WorkflowError::from_storage(e, OP))?;

        if order.status == OrderStatus::Delivered {
            return Err(WorkflowError::PreconditionFailed {
                entity_id: order.id,
                operation: OP.to_string(),
                reason: "order already delivered".to_string(),
            });
        }

        if let Some(c) = carrier {
            order.logistics_meta.carrier = Some(c.to_string());
        }
        if let Some(t) = tracking_number {
            order.logistics_meta.tracking_number = Some(t.to_string());
        }
        if let Some(h) = assigned_handler {
            order.logistics_meta.assigned_handler = Some(h.to_string());
        }
        order.updated_at = order.next_timestamp();

        self.store
            .update_order(version, order.clone())
            .map_err(|e| WorkflowError::from_storage(e, OP))?;
        tracing::info!(order_id = %order.id, actor = %actor.id, "logistics assignment updated");
        self.broker.notify();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ivrflow_core::{FacilityRef, Priority, ProductLine, Role};
    use ivrflow_storage::MemoryStore;

    use super::*;
    use crate::broker::ChangeBroker;
    use crate::service::NewRequest;

    fn doctor() -> Actor {
        Actor::new("doc-1", Role::Doctor)
    }

    fn specialist() -> Actor {
        Actor::new("spec-1", Role::IvrSpecialist)
    }

    fn logistics() -> Actor {
        Actor::new("log-1", Role::Logistics)
    }

    fn service() -> WorkflowService<MemoryStore> {
        WorkflowService::new(Arc::new(MemoryStore::new()), ChangeBroker::new())
    }

    /// Create a request and drive it all the way to APPROVED.
    fn approved_request(svc: &WorkflowService<MemoryStore>) -> String {
        let req = svc
            .create_request(
                &doctor(),
                NewRequest {
                    patient_ref: "patient-1".to_string(),
                    service_type: "wound-care".to_string(),
                    priority: Priority::High,
                    facility: FacilityRef {
                        id: "fac-1".to_string(),
                        name: "Northside".to_string(),
                    },
                    product_lines: vec![ProductLine {
                        sku: "SKU-1".to_string(),
                        description: "foam dressing".to_string(),
                        quantity: 3,
                    }],
                },
            )
            .unwrap();
        svc.transition(&req.id, IvrStatus::Submitted, &doctor(), None)
            .unwrap();
        svc.transition(&req.id, IvrStatus::InReview, &specialist(), None)
            .unwrap();
        svc.transition(&req.id, IvrStatus::PendingApproval, &specialist(), None)
            .unwrap();
        svc.transition(&req.id, IvrStatus::Approved, &specialist(), None)
            .unwrap();
        req.id
    }

    #[test]
    fn order_snapshots_request_data() {
        let svc = service();
        let request_id = approved_request(&svc);
        let order = svc.create_order_from_ivr(&request_id, &specialist()).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.source_ivr_id, request_id);
        assert_eq!(order.priority, Priority::High);
        assert_eq!(order.patient_ref, "patient-1");
        assert_eq!(order.facility_snapshot.facility_id, "fac-1");
        assert_eq!(order.product_lines.len(), 1);
        assert_eq!(order.logistics_meta.carrier, None);
    }

    #[test]
    fn creation_is_idempotent() {
        let svc = service();
        let request_id = approved_request(&svc);
        let first = svc.create_order_from_ivr(&request_id, &specialist()).unwrap();
        let second = svc.create_order_from_ivr(&request_id, &logistics()).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(svc.list_orders(None).unwrap().len(), 1);
    }

    #[test]
    fn creation_requires_approved_status() {
        let svc = service();
        let req = svc
            .create_request(
                &doctor(),
                NewRequest {
                    patient_ref: "patient-2".to_string(),
                    service_type: "dme".to_string(),
                    priority: Priority::Low,
                    facility: FacilityRef {
                        id: "fac-2".to_string(),
                        name: "Westside".to_string(),
                    },
                    product_lines: vec![],
                },
            )
            .unwrap();
        let err = svc.create_order_from_ivr(&req.id, &specialist()).unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionFailed { ref reason, .. }
            if reason.contains("DRAFT")));
    }

    #[test]
    fn creation_requires_capability() {
        let svc = service();
        let request_id = approved_request(&svc);
        let err = svc.create_order_from_ivr(&request_id, &doctor()).unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));
    }

    #[test]
    fn pipeline_advances_one_step_at_a_time() {
        let svc = service();
        let request_id = approved_request(&svc);
        let order = svc.create_order_from_ivr(&request_id, &specialist()).unwrap();

        // Skipping ahead fails before any audit entry is written.
        let err = svc
            .advance_order_status(&order.id, OrderStatus::Shipped, &logistics())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { ref from, ref to, .. }
            if from == "PENDING" && to == "SHIPPED"));
        assert!(svc.get_order(&order.id).unwrap().status_history.is_empty());

        for target in [
            OrderStatus::Processing,
            OrderStatus::Packed,
            OrderStatus::Shipped,
        ] {
            let updated = svc
                .advance_order_status(&order.id, target, &logistics())
                .unwrap();
            assert_eq!(updated.status, target);
        }
        let order = svc.get_order(&order.id).unwrap();
        assert_eq!(order.status_history.len(), 3);
        assert!(order
            .status_history
            .iter()
            .all(|c| c.role == Role::Logistics));
    }

    #[test]
    fn repeat_of_current_status_rejected() {
        let svc = service();
        let request_id = approved_request(&svc);
        let order = svc.create_order_from_ivr(&request_id, &specialist()).unwrap();
        svc.advance_order_status(&order.id, OrderStatus::Processing, &logistics())
            .unwrap();
        let err = svc
            .advance_order_status(&order.id, OrderStatus::Processing, &logistics())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn delivery_is_doctor_confirmed() {
        let svc = service();
        let request_id = approved_request(&svc);
        let order = svc.create_order_from_ivr(&request_id, &specialist()).unwrap();
        for target in [
            OrderStatus::Processing,
            OrderStatus::Packed,
            OrderStatus::Shipped,
        ] {
            svc.advance_order_status(&order.id, target, &logistics())
                .unwrap();
        }

        // Logistics cannot self-confirm delivery.
        let err = svc
            .advance_order_status(&order.id, OrderStatus::Delivered, &logistics())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));

        let delivered = svc
            .advance_order_status(&order.id, OrderStatus::Delivered, &doctor())
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.status_history.last().unwrap().role, Role::Doctor);

        // Terminal: nothing advances past DELIVERED.
        assert_eq!(delivered.status.successor(), None);
    }

    #[test]
    fn logistics_assignment_fills_meta() {
        let svc = service();
        let request_id = approved_request(&svc);
        let order = svc.create_order_from_ivr(&request_id, &specialist()).unwrap();

        let err = svc
            .assign_logistics(&order.id, &doctor(), Some("UPS"), None, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));

        let updated = svc
            .assign_logistics(&order.id, &logistics(), Some("UPS"), None, Some("log-1"))
            .unwrap();
        assert_eq!(updated.logistics_meta.carrier.as_deref(), Some("UPS"));
        assert_eq!(updated.logistics_meta.tracking_number, None);

        // Second call fills tracking without clobbering carrier.
        let updated = svc
            .assign_logistics(&order.id, &logistics(), None, Some("1Z999"), None)
            .unwrap();
        assert_eq!(updated.logistics_meta.carrier.as_deref(), Some("UPS"));
        assert_eq!(updated.logistics_meta.tracking_number.as_deref(), Some("1Z999"));
    }

    #[test]
    fn delivered_order_rejects_logistics_assignment() {
        let svc = service();
        let request_id = approved_request(&svc);
        let order = svc.create_order_from_ivr(&request_id, &specialist()).unwrap();
        for target in [
            OrderStatus::Processing,
            OrderStatus::Packed,
            OrderStatus::Shipped,
        ] {
            svc.advance_order_status(&order.id, target, &logistics())
                .unwrap();
        }
        svc.advance_order_status(&order.id, OrderStatus::Delivered, &doctor())
            .unwrap();

        let err = svc
            .assign_logistics(&order.id, &logistics(), Some("UPS"), None, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionFailed { ref reason, .. }
            if reason.contains("delivered")));
        assert_eq!(svc.get_order(&order.id).unwrap().logistics_meta.carrier, None);
    }

    #[test]
    fn unknown_order_not_found() {
        let svc = service();
        let err = svc
            .advance_order_status("missing", OrderStatus::Processing, &logistics())
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::NotFound {
                entity_id: "missing".to_string()
            }
        );
    }
}
