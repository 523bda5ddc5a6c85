use ivrflow_core::{IvrRequest, IvrStatus, Order, OrderStatus};

use crate::error::StorageError;

/// A record together with the version it was read at.
///
/// The version is fed back into `update_*` calls for the optimistic
/// concurrency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: i64,
    pub record: T,
}

/// The storage trait for workflow backends.
///
/// A `WorkflowStore` holds the IVRRequest and Order records, each keyed by
/// id and versioned. There are no partial updates: a mutation replaces the
/// whole record (status plus every audit append) in one step, which is
/// what makes engine operations atomic — either the full new record is
/// visible or none of it is.
///
/// ## OCC conflict detection
///
/// `update_request` / `update_order` are conditional on
/// `stored version == expected_version`. On mismatch they return
/// `Err(StorageError::ConcurrentConflict)` and leave the record untouched.
///
/// ## One order per request
///
/// `insert_order` must reject a second order carrying an already-used
/// `source_ivr_id` with `AlreadyExists`. Enforcing the uniqueness here
/// closes the concurrent-create race without the engine holding locks.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` so one store can be
/// shared across caller threads behind an `Arc`.
pub trait WorkflowStore: Send + Sync + 'static {
    // ── Requests ─────────────────────────────────────────────────────────

    /// Insert a new request at version 0.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if the id is taken.
    fn insert_request(&self, request: IvrRequest) -> Result<(), StorageError>;

    /// Read a request and its current version.
    fn get_request(&self, id: &str) -> Result<Versioned<IvrRequest>, StorageError>;

    /// Replace a request, conditional on `expected_version` (OCC).
    ///
    /// Returns the new version on success.
    fn update_request(
        &self,
        expected_version: i64,
        request: IvrRequest,
    ) -> Result<i64, StorageError>;

    /// List requests, optionally filtered by status, ordered by id.
    fn list_requests(&self, status: Option<IvrStatus>) -> Result<Vec<IvrRequest>, StorageError>;

    // ── Orders ───────────────────────────────────────────────────────────

    /// Insert a new order at version 0.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if the order id or its
    /// `source_ivr_id` is already present.
    fn insert_order(&self, order: Order) -> Result<(), StorageError>;

    /// Read an order and its current version.
    fn get_order(&self, id: &str) -> Result<Versioned<Order>, StorageError>;

    /// Replace an order, conditional on `expected_version` (OCC).
    ///
    /// Returns the new version on success.
    fn update_order(&self, expected_version: i64, order: Order) -> Result<i64, StorageError>;

    /// The order derived from the given request, if one exists.
    fn find_order_for_request(&self, request_id: &str) -> Result<Option<Order>, StorageError>;

    /// List orders, optionally filtered by status, ordered by id.
    fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, StorageError>;
}
