//! Backend client contract for the object-store family.

use bytes::Bytes;
use stratus_core::BackendError;

/// Blob fetch by bucket and key.
#[derive(Debug, Clone)]
pub struct GetObjectRequest {
    pub bucket: String,
    pub key: String,
}

/// A fetched blob. `body` may legitimately be absent; the store surfaces
/// that as a not-found error distinct from transport failures.
#[derive(Debug, Clone, Default)]
pub struct GetObjectResponse {
    pub body: Option<Bytes>,
    pub content_type: Option<String>,
}

/// Blob write by bucket and key.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Injected object-store client.
///
/// Implementations attach the `retryable` flag to transient failures; in
/// observed deployments the object store never does, so operations run once
/// unless the client says otherwise.
#[async_trait::async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Fetches a blob.
    async fn get_object(
        &self,
        request: GetObjectRequest,
    ) -> Result<GetObjectResponse, BackendError>;

    /// Stores a blob.
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), BackendError>;
}
