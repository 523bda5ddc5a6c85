//! In-memory reference backend.

use std::collections::BTreeMap;
use std::sync::RwLock;

use ivrflow_core::{IvrRequest, IvrStatus, Order, OrderStatus};

use crate::error::StorageError;
use crate::traits::{Versioned, WorkflowStore};

#[derive(Default)]
struct Inner {
    requests: BTreeMap<String, Versioned<IvrRequest>>,
    orders: BTreeMap<String, Versioned<Order>>,
    /// source_ivr_id -> order id; enforces one order per request.
    orders_by_source: BTreeMap<String, String>,
}

/// `RwLock`-guarded maps. Reference implementation of [`WorkflowStore`]
/// and the substrate the engine tests run on. Whole-record replacement
/// under the write lock gives the atomicity the engine relies on.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        // A poisoned lock means a writer panicked mid-mutation; the maps
        // themselves are replaced whole, so the data is still consistent.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl WorkflowStore for MemoryStore {
    fn insert_request(&self, request: IvrRequest) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.requests.contains_key(&request.id) {
            return Err(StorageError::AlreadyExists {
                entity_id: request.id,
            });
        }
        inner.requests.insert(
            request.id.clone(),
            Versioned {
                version: 0,
                record: request,
            },
        );
        Ok(())
    }

    fn get_request(&self, id: &str) -> Result<Versioned<IvrRequest>, StorageError> {
        self.read()
            .requests
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                entity_id: id.to_string(),
            })
    }

    fn update_request(
        &self,
        expected_version: i64,
        request: IvrRequest,
    ) -> Result<i64, StorageError> {
        let mut inner = self.write();
        let entry = inner
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| StorageError::NotFound {
                entity_id: request.id.clone(),
            })?;
        if entry.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                entity_id: request.id,
                expected_version,
            });
        }
        entry.version += 1;
        entry.record = request;
        Ok(entry.version)
    }

    fn list_requests(&self, status: Option<IvrStatus>) -> Result<Vec<IvrRequest>, StorageError> {
        Ok(self
            .read()
            .requests
            .values()
            .filter(|v| status.map_or(true, |s| v.record.status == s))
            .map(|v| v.record.clone())
            .collect())
    }

    fn insert_order(&self, order: Order) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.orders.contains_key(&order.id) {
            return Err(StorageError::AlreadyExists {
                entity_id: order.id,
            });
        }
        if inner.orders_by_source.contains_key(&order.source_ivr_id) {
            return Err(StorageError::AlreadyExists {
                entity_id: order.source_ivr_id,
            });
        }
        inner
            .orders_by_source
            .insert(order.source_ivr_id.clone(), order.id.clone());
        inner.orders.insert(
            order.id.clone(),
            Versioned {
                version: 0,
                record: order,
            },
        );
        Ok(())
    }

    fn get_order(&self, id: &str) -> Result<Versioned<Order>, StorageError> {
        self.read()
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                entity_id: id.to_string(),
            })
    }

    fn update_order(&self, expected_version: i64, order: Order) -> Result<i64, StorageError> {
        let mut inner = self.write();
        let entry = inner
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| StorageError::NotFound {
                entity_id: order.id.clone(),
            })?;
        if entry.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                entity_id: order.id,
                expected_version,
            });
        }
        entry.version += 1;
        entry.record = order;
        Ok(entry.version)
    }

    fn find_order_for_request(&self, request_id: &str) -> Result<Option<Order>, StorageError> {
        let inner = self.read();
        Ok(inner
            .orders_by_source
            .get(request_id)
            .and_then(|order_id| inner.orders.get(order_id))
            .map(|v| v.record.clone()))
    }

    fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, StorageError> {
        Ok(self
            .read()
            .orders
            .values()
            .filter(|v| status.map_or(true, |s| v.record.status == s))
            .map(|v| v.record.clone())
            .collect())
    }
}
