//! IVR review state machine: transitions, notes, communication.
//!
//! Execution order for a transition mirrors the rest of the engine:
//! 1. load (version captured for the optimistic write)
//! 2. edge check against the transition graph
//! 3. role/ownership authorization
//! 4. apply status + every audit append to a working copy
//! 5. version-checked write — the whole record commits or none of it does
//! 6. broker fan-out, after commit, before returning

use ivrflow_core::{
    can_perform, Actor, ApprovalDecision, ApprovalRecord, Attachment, Capability,
    CommunicationEntry, EscalationRecord, IvrRequest, IvrStatus, ReviewNote, Role, StatusChange,
};
use ivrflow_storage::{Versioned, WorkflowStore};

use crate::error::WorkflowError;
use crate::service::WorkflowService;

/// Role/ownership gate for one review edge. The edge itself has already
/// been validated; this answers only "may this actor drive it".
fn authorize_transition(
    request: &IvrRequest,
    target: IvrStatus,
    actor: &Actor,
) -> Result<(), WorkflowError> {
    let owning_doctor = actor.role == Role::Doctor && actor.id == request.provider_ref;
    let allowed = match target {
        IvrStatus::Submitted => owning_doctor,
        // Resuming review after documents were provided is the one edge
        // the owning doctor may drive into IN_REVIEW; claiming a
        // submitted request is reviewer work.
        IvrStatus::InReview => match request.status {
            IvrStatus::DocumentsRequested => {
                owning_doctor || can_perform(actor, Capability::ReviewRequest)
            }
            _ => can_perform(actor, Capability::ReviewRequest),
        },
        IvrStatus::DocumentsRequested | IvrStatus::PendingApproval => {
            can_perform(actor, Capability::ReviewRequest)
        }
        IvrStatus::Approved | IvrStatus::Rejected => can_perform(actor, Capability::DecideRequest),
        IvrStatus::Escalated => can_perform(actor, Capability::EscalateRequest),
        // Cancellation: the owning doctor or any reviewer. A doctor who
        // does not own the request holds the capability but fails the
        // ownership half.
        IvrStatus::Cancelled => {
            can_perform(actor, Capability::CancelRequest)
                && (owning_doctor || actor.role.is_reviewer())
        }
        // No edge enters Draft; unreachable past the edge check.
        IvrStatus::Draft => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized {
            entity_id: request.id.clone(),
            actor_id: actor.id.clone(),
            role: actor.role,
            operation: format!("transition to {}", target),
        })
    }
}

impl<S: WorkflowStore> WorkflowService<S> {
    /// Move a request along one edge of the review graph.
    ///
    /// On success the status change, its history entry, the optional
    /// note, and any decision/escalation record commit as one unit, and
    /// every subscriber is notified before this returns. On any error
    /// nothing is written.
    pub fn transition(
        &self,
        request_id: &str,
        target: IvrStatus,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<IvrRequest, WorkflowError> {
        const OP: &str = "transition";
        let Versioned {
            version,
            record: mut request,
        } = self
            .store
            .get_request(request_id)
            .map_err(|e| WorkflowError::from_storage(e, OP))?;

        if !request.status.can_transition_to(target) {
            return Err(WorkflowError::InvalidTransition {
                entity_id: request.id,
                from: request.status.to_string(),
                to: target.to_string(),
            });
        }
        authorize_transition(&request, target, actor)?;

        let from = request.status;
        let at = request.next_timestamp();
        request.status_history.push(StatusChange {
            from,
            to: target,
            actor_id: actor.id.clone(),
            at,
        });
        if let Some(text) = note {
            request.review_notes.push(ReviewNote {
                note: text.to_string(),
                author_ref: actor.id.clone(),
                status: target,
                is_internal: false,
                at,
            });
        }
        match target {
            IvrStatus::Escalated => {
                // Escalation raises priority; history and status trail
                // are left intact.
                request.escalations.push(EscalationRecord {
                    actor_id: actor.id.clone(),
                    reason: note.unwrap_or_default().to_string(),
                    at,
                });
                request.priority = request.priority.raised();
            }
            IvrStatus::Approved | IvrStatus::Rejected => {
                let decision = if target == IvrStatus::Approved {
                    ApprovalDecision::Approved
                } else {
                    ApprovalDecision::Rejected
                };
                request.approvals.push(ApprovalRecord {
                    level: request.approvals.len() as u32 + 1,
                    decision,
                    actor_id: actor.id.clone(),
                    at,
                });
            }
            _ => {}
        }
        request.status = target;
        request.updated_at = at;

        self.store
            .update_request(version, request.clone())
            .map_err(|e| WorkflowError::from_storage(e, OP))?;
        tracing::info!(
            request_id = %request.id,
            from = %from,
            to = %target,
            actor = %actor.id,
            "review transition committed"
        );
        self.broker.notify();
        Ok(request)
    }

    /// Append a review note without touching status. Internal notes
    /// require a reviewer role.
    pub fn add_review_note(
        &self,
        request_id: &str,
        note: &str,
        actor: &Actor,
        is_internal: bool,
    ) -> Result<IvrRequest, WorkflowError> {
        const OP: &str = "add_review_note";
        let Versioned {
            version,
            record: mut request,
        } = self
            .store
            .get_request(request_id)
            .map_err(|e| WorkflowError::from_storage(e, OP))?;

        if is_internal && !can_perform(actor, Capability::AddInternalNote) {
            return Err(WorkflowError::Unauthorized {
                entity_id: request.id,
                actor_id: actor.id.clone(),
                role: actor.role,
                operation: OP.to_string(),
            });
        }

        let at = request.next_timestamp();
        request.review_notes.push(ReviewNote {
            note: note.to_string(),
            author_ref: actor.id.clone(),
            status: request.status,
            is_internal,
            at,
        });
        request.updated_at = at;

        self.store
            .update_request(version, request.clone())
            .map_err(|e| WorkflowError::from_storage(e, OP))?;
        tracing::info!(request_id = %request.id, author = %actor.id, internal = is_internal, "review note added");
        self.broker.notify();
        Ok(request)
    }

    /// Append a message to the participant-visible communication thread.
    /// Attachments are opaque references; nothing is fetched.
    pub fn add_communication(
        &self,
        request_id: &str,
        message: &str,
        actor: &Actor,
        attachments: Vec<Attachment>,
    ) -> Result<IvrRequest, WorkflowError> {
        const OP: &str = "add_communication";
        let Versioned {
            version,
            record: mut request,
        } = self
            .store
            .get_request(request_id)
            .map_err(|e| WorkflowError::from_storage(e, OP))?;

        let at = request.next_timestamp();
        request.communication.push(CommunicationEntry {
            author_ref: actor.id.clone(),
            message: message.to_string(),
            attachments,
            at,
        });
        request.updated_at = at;

        self.store
            .update_request(version, request.clone())
            .map_err(|e| WorkflowError::from_storage(e, OP))?;
        tracing::info!(request_id = %request.id, author = %actor.id, "communication added");
        self.broker.notify();
        Ok(request)
    }
}
