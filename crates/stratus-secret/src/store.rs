//! Resilient secret retrieval over an injected secret-store backend.

use std::sync::Arc;

use serde_json::json;
use stratus_core::{Error, Result, RetryPolicy};

use crate::TRACING_TARGET_STORE;
use crate::backend::{GetSecretRequest, SecretBackend, SecretValue};

const COMPONENT: &str = "secret";

/// Secret store with retry.
///
/// Cheaply cloneable; clones share the injected backend handle.
#[derive(Clone)]
pub struct SecretStore {
    backend: Arc<dyn SecretBackend>,
    retry: RetryPolicy,
}

impl SecretStore {
    pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the per-store retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retrieves a secret's string payload.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    pub async fn get_secret(&self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(Error::invalid_parameter("secret name is required").with_context(
                COMPONENT,
                "get_secret",
                json!({"name": name}),
            ));
        }

        let backend = Arc::clone(&self.backend);
        let request = GetSecretRequest {
            secret_id: name.to_string(),
        };
        let value: SecretValue = self
            .retry
            .run(|| {
                let backend = Arc::clone(&backend);
                let request = request.clone();
                async move {
                    backend
                        .get_secret_value(request)
                        .await
                        .map_err(Error::backend)
                }
            })
            .await
            .map_err(|e| e.with_context(COMPONENT, "get_secret", json!({"name": name})))?;

        value.secret_string.ok_or_else(|| {
            Error::not_found(format!("secret {name} has no string payload")).with_context(
                COMPONENT,
                "get_secret",
                json!({"name": name}),
            )
        })
    }

    /// Retrieves a secret and parses it as JSON.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    pub async fn get_secret_json(&self, name: &str) -> Result<serde_json::Value> {
        let payload = self.get_secret(name).await?;
        serde_json::from_str(&payload).map_err(|e| {
            Error::decode("secret payload is not valid JSON")
                .with_source(e)
                .with_context(COMPONENT, "get_secret_json", json!({"name": name}))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use stratus_core::{BackendError, ErrorKind};

    use super::*;

    #[derive(Default)]
    struct ScriptedBackend {
        calls: AtomicU32,
        values: Mutex<VecDeque<Result<SecretValue, BackendError>>>,
    }

    impl ScriptedBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn push(&self, value: Result<SecretValue, BackendError>) {
            self.values.lock().unwrap().push_back(value);
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SecretBackend for ScriptedBackend {
        async fn get_secret_value(
            &self,
            _request: GetSecretRequest,
        ) -> Result<SecretValue, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.values
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::new("unscripted call")))
        }
    }

    fn store(backend: Arc<ScriptedBackend>) -> SecretStore {
        SecretStore::new(backend)
            .with_retry_policy(RetryPolicy::new(3).with_base_interval(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn returns_string_payload() {
        let backend = ScriptedBackend::new();
        backend.push(Ok(SecretValue {
            secret_string: Some("hunter2".into()),
        }));

        let secret = store(backend).get_secret("db/password").await.unwrap();
        assert_eq!(secret, "hunter2");
    }

    #[tokio::test]
    async fn missing_payload_is_not_found() {
        let backend = ScriptedBackend::new();
        backend.push(Ok(SecretValue::default()));

        let err = store(backend).get_secret("db/password").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn empty_name_fails_before_any_call() {
        let backend = ScriptedBackend::new();
        let err = store(backend.clone()).get_secret("").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn unflagged_error_gets_one_attempt() {
        let backend = ScriptedBackend::new();
        backend.push(Err(BackendError::new("forbidden")));

        let err = store(backend.clone()).get_secret("db/password").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn flagged_error_is_retried() {
        let backend = ScriptedBackend::new();
        backend.push(Err(BackendError::retryable("throttled")));
        backend.push(Ok(SecretValue {
            secret_string: Some("ok".into()),
        }));

        let secret = store(backend.clone()).get_secret("db/password").await.unwrap();
        assert_eq!(secret, "ok");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn parses_json_secrets() {
        let backend = ScriptedBackend::new();
        backend.push(Ok(SecretValue {
            secret_string: Some(r#"{"user": "app", "password": "hunter2"}"#.into()),
        }));

        let value = store(backend).get_secret_json("db/creds").await.unwrap();
        assert_eq!(value, json!({"user": "app", "password": "hunter2"}));
    }

    #[tokio::test]
    async fn malformed_json_secret_is_a_decode_error() {
        let backend = ScriptedBackend::new();
        backend.push(Ok(SecretValue {
            secret_string: Some("not json".into()),
        }));

        let err = store(backend).get_secret_json("db/creds").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
