//! Resilient blob store over an injected object-store backend.

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use stratus_core::{Error, Result, RetryPolicy};

use crate::TRACING_TARGET_STORE;
use crate::backend::{GetObjectRequest, GetObjectResponse, ObjectBackend, PutObjectRequest};

const COMPONENT: &str = "object";

/// Object store with retry and read-side shape conversion.
///
/// Cheaply cloneable; clones share the injected backend handle.
#[derive(Clone)]
pub struct ObjectStore {
    backend: Arc<dyn ObjectBackend>,
    retry: RetryPolicy,
}

impl ObjectStore {
    pub fn new(backend: Arc<dyn ObjectBackend>) -> Self {
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

    /// Fetches a blob as raw bytes.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    pub async fn get_raw(&self, bucket: &str, key: &str, decompress: bool) -> Result<Bytes> {
        self.fetch_body(bucket, key, "get_raw", decompress).await
    }

    /// Fetches a blob as UTF-8 text.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    pub async fn get_text(&self, bucket: &str, key: &str, decompress: bool) -> Result<String> {
        let body = self.fetch_body(bucket, key, "get_text", decompress).await?;
        String::from_utf8(body.into()).map_err(|e| {
            Error::decode("object body is not valid UTF-8")
                .with_source(e)
                .with_context(COMPONENT, "get_text", json!({"bucket": bucket, "key": key}))
        })
    }

    /// Fetches a blob and parses it as JSON.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORE)]
    pub async fn get_json(
        &self,
        bucket: &str,
        key: &str,
        decompress: bool,
    ) -> Result<serde_json::Value> {
        let body = self.fetch_body(bucket, key, "get_json", decompress).await?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::decode("object body is not valid JSON")
                .with_source(e)
                .with_context(COMPONENT, "get_json", json!({"bucket": bucket, "key": key}))
        })
    }

    /// Stores raw bytes.
    #[tracing::instrument(skip(self, body), target = TRACING_TARGET_STORE, fields(size = body.len()))]
    pub async fn put_raw(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.store_body(bucket, key, "put_raw", body, None).await
    }

    /// Stores UTF-8 text.
    #[tracing::instrument(skip(self, text), target = TRACING_TARGET_STORE)]
    pub async fn put_text(&self, bucket: &str, key: &str, text: impl Into<String>) -> Result<()> {
        let body = Bytes::from(text.into().into_bytes());
        self.store_body(bucket, key, "put_text", body, Some("text/plain"))
            .await
    }

    /// Stores a JSON value.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_STORE)]
    pub async fn put_json(&self, bucket: &str, key: &str, value: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_vec(value).map_err(|e| {
            Error::decode("value is not serializable as JSON")
                .with_source(e)
                .with_context(COMPONENT, "put_json", json!({"bucket": bucket, "key": key}))
        })?;
        self.store_body(bucket, key, "put_json", Bytes::from(body), Some("application/json"))
            .await
    }

    async fn fetch_body(
        &self,
        bucket: &str,
        key: &str,
        operation: &'static str,
        decompress: bool,
    ) -> Result<Bytes> {
        validate_identifiers(bucket, key, operation)?;

        let backend = Arc::clone(&self.backend);
        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        let response: GetObjectResponse = self
            .retry
            .run(|| {
                let backend = Arc::clone(&backend);
                let request = request.clone();
                async move { backend.get_object(request).await.map_err(Error::backend) }
            })
            .await
            .map_err(|e| {
                e.with_context(COMPONENT, operation, json!({"bucket": bucket, "key": key}))
            })?;

        let body = response.body.ok_or_else(|| {
            Error::not_found(format!("object {bucket}/{key} has no body")).with_context(
                COMPONENT,
                operation,
                json!({"bucket": bucket, "key": key}),
            )
        })?;

        if decompress {
            gunzip(&body).map_err(|e| {
                e.with_context(COMPONENT, operation, json!({"bucket": bucket, "key": key}))
            })
        } else {
            Ok(body)
        }
    }

    async fn store_body(
        &self,
        bucket: &str,
        key: &str,
        operation: &'static str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<()> {
        validate_identifiers(bucket, key, operation)?;

        let backend = Arc::clone(&self.backend);
        let request = PutObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type: content_type.map(str::to_string),
        };
        self.retry
            .run(|| {
                let backend = Arc::clone(&backend);
                let request = request.clone();
                async move { backend.put_object(request).await.map_err(Error::backend) }
            })
            .await
            .map_err(|e| {
                e.with_context(COMPONENT, operation, json!({"bucket": bucket, "key": key}))
            })
    }
}

fn validate_identifiers(bucket: &str, key: &str, operation: &'static str) -> Result<()> {
    if bucket.is_empty() || key.is_empty() {
        return Err(Error::invalid_parameter("bucket and key are required")
            .with_context(COMPONENT, operation, json!({"bucket": bucket, "key": key})));
    }
    Ok(())
}

/// Inflates a gzip body in memory.
fn gunzip(body: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(body);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| Error::decode("object body is not valid gzip").with_source(e))?;
    Ok(Bytes::from(inflated))
}
