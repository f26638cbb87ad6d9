#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for retry scheduling.
///
/// Use this target for logging backoff waits and retry-budget exhaustion.
pub const TRACING_TARGET_RETRY: &str = "stratus_core::retry";

/// Tracing target for page accumulation.
///
/// Use this target for logging per-page progress and ceiling cutoffs.
pub const TRACING_TARGET_PAGE: &str = "stratus_core::page";

mod error;
pub mod page;
pub mod retry;
mod role;

pub use error::{BackendError, Error, ErrorContext, ErrorKind, Result};
pub use page::{Accumulated, Page, accumulate};
pub use retry::RetryPolicy;
pub use role::BackendRole;
