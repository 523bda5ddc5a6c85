//! ivrflow-storage: versioned record storage for the workflow engine.
//!
//! The [`WorkflowStore`] trait is the only mutation path into persisted
//! state. Every record carries a version; updates are validated against
//! the version the caller read (optimistic concurrency), so two racing
//! writers on the same entity cannot both commit. [`MemoryStore`] is the
//! reference backend and the test substrate.

mod error;
mod memory;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use traits::{Versioned, WorkflowStore};
