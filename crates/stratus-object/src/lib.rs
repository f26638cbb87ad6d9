#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for object store operations.
pub const TRACING_TARGET_STORE: &str = "stratus_object::store";

mod backend;
mod store;

pub use backend::{GetObjectRequest, GetObjectResponse, ObjectBackend, PutObjectRequest};
pub use store::ObjectStore;

// Re-export the core surface consumers need alongside the store.
pub use stratus_core::{BackendError, Error, ErrorKind, Result, RetryPolicy};
