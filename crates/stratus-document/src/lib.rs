#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for document store operations.
pub const TRACING_TARGET_STORE: &str = "stratus_document::store";

/// Tracing target for primary-to-fallback backend substitution.
///
/// Use this target for logging the switch to the direct backend and the
/// outcome of the substituted run.
pub const TRACING_TARGET_FALLBACK: &str = "stratus_document::fallback";

mod backend;
mod expression;
mod request;
mod store;

pub use backend::{DocumentBackend, Item, Key};
pub use expression::{Condition, ConditionTest, Operator, Update};
pub use request::{
    BatchGetRequest, BatchGetResponse, BatchWriteRequest, DeleteItemRequest, GetItemRequest,
    PageResponse, PutItemRequest, QueryRequest, ScanRequest, TransactGetRequest,
    TransactWriteRequest, UpdateItemRequest, WriteRequest,
};
pub use store::{DocumentStore, QueryOptions, QueryOutput};

// Re-export the core surface consumers need alongside the store.
pub use stratus_core::{BackendError, BackendRole, Error, ErrorKind, Result, RetryPolicy};
