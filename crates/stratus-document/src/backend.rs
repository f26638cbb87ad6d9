//! Backend client contract for the document-database family.

use stratus_core::BackendError;

use crate::request::{
    BatchGetRequest, BatchGetResponse, BatchWriteRequest, DeleteItemRequest, GetItemRequest,
    PageResponse, PutItemRequest, QueryRequest, ScanRequest, TransactGetRequest,
    TransactWriteRequest, UpdateItemRequest,
};

/// A stored document: attribute name to value.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// A primary-key map, also the backend's pagination cursor
/// (the last evaluated key of a page).
pub type Key = serde_json::Map<String, serde_json::Value>;

/// Injected document-database client.
///
/// One method per backend operation, each taking the backend-native request
/// shape. Implementations attach the `retryable` flag to transient failures;
/// the store trusts that flag and nothing else. Handles are expected to be
/// safe for concurrent reuse and are never constructed by this crate.
#[async_trait::async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Executes one page of a key-condition query.
    async fn query(&self, request: QueryRequest) -> Result<PageResponse, BackendError>;

    /// Executes one page of a table scan.
    async fn scan(&self, request: ScanRequest) -> Result<PageResponse, BackendError>;

    /// Point lookup by primary key.
    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, BackendError>;

    /// Point write of a full item.
    async fn put_item(&self, request: PutItemRequest) -> Result<(), BackendError>;

    /// Conditional in-place update driven by an update expression.
    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), BackendError>;

    /// Point delete by primary key.
    async fn delete_item(&self, request: DeleteItemRequest) -> Result<(), BackendError>;

    /// Batched point lookups for one table.
    async fn batch_get(&self, request: BatchGetRequest) -> Result<BatchGetResponse, BackendError>;

    /// Batched puts and deletes for one table.
    async fn batch_write(&self, request: BatchWriteRequest) -> Result<(), BackendError>;

    /// Transactional reads for one table.
    async fn transact_get(
        &self,
        request: TransactGetRequest,
    ) -> Result<BatchGetResponse, BackendError>;

    /// Transactional writes for one table.
    async fn transact_write(&self, request: TransactWriteRequest) -> Result<(), BackendError>;
}
