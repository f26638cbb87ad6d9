//! Backend client contract for the secret-store family.

use stratus_core::BackendError;

/// Secret lookup by name or ARN-style identifier.
#[derive(Debug, Clone)]
pub struct GetSecretRequest {
    pub secret_id: String,
}

/// A retrieved secret. The string payload may be absent when the secret was
/// stored as binary; the store treats that as not found.
#[derive(Debug, Clone, Default)]
pub struct SecretValue {
    pub secret_string: Option<String>,
}

/// Injected secret-store client.
#[async_trait::async_trait]
pub trait SecretBackend: Send + Sync {
    /// Retrieves the current version of a secret.
    async fn get_secret_value(
        &self,
        request: GetSecretRequest,
    ) -> Result<SecretValue, BackendError>;
}
