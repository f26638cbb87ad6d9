//! Resilient document store over injected primary and fallback backends.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use stratus_core::{Accumulated, BackendRole, Error, Page, Result, RetryPolicy, accumulate};

use crate::backend::{DocumentBackend, Item, Key};
use crate::expression::{Condition, Update, build_conditions, build_update};
use crate::request::{
    BatchGetRequest, BatchGetResponse, BatchWriteRequest, DeleteItemRequest, GetItemRequest,
    PutItemRequest, QueryRequest, ScanRequest, TransactGetRequest, TransactWriteRequest,
    UpdateItemRequest, WriteRequest,
};
use crate::{TRACING_TARGET_FALLBACK, TRACING_TARGET_STORE};

const COMPONENT: &str = "document";

/// Pagination controls for query and scan operations.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Secondary index to run against, when any.
    pub index_name: Option<String>,
    /// Cursor to resume from, as returned by a previous call.
    pub start_key: Option<Key>,
    /// Maximum number of items to accumulate across pages.
    pub limit: Option<usize>,
}

/// Merged result of a paged query or scan.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    /// Items in page arrival order.
    pub items: Vec<Item>,
    /// The final page's raw cursor; present when the backend reported more
    /// data (ceiling cutoffs included), usable to resume externally.
    pub last_evaluated_key: Option<Key>,
}

/// Document-database store with retry, pagination, and backend substitution.
///
/// Cheaply cloneable: clones share the injected backend handles, which are
/// assumed safe for concurrent reuse. The store never constructs the primary
/// client; a direct fallback handle is supplied at construction when the
/// primary is a caching proxy.
#[derive(Clone)]
pub struct DocumentStore {
    primary: Arc<dyn DocumentBackend>,
    fallback: Option<Arc<dyn DocumentBackend>>,
    role: BackendRole,
    retry: RetryPolicy,
}

impl DocumentStore {
    /// Store over a client that talks to the database directly.
    pub fn direct(primary: Arc<dyn DocumentBackend>) -> Self {
        Self {
            primary,
            fallback: None,
            role: BackendRole::Direct,
            retry: RetryPolicy::default(),
        }
    }

    /// Store over a caching-proxy front-end, with a direct backend to
    /// substitute when an entire retried operation fails against the proxy.
    pub fn cache_proxied(
        primary: Arc<dyn DocumentBackend>,
        fallback: Arc<dyn DocumentBackend>,
    ) -> Self {
        Self {
            primary,
            fallback: Some(fallback),
            role: BackendRole::CacheProxy,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the per-store retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The declared role of the primary backend.
    pub fn role(&self) -> BackendRole {
        self.role
    }

    /// Runs a single-shot operation with retry and backend substitution.
    async fn run_single<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(Arc<dyn DocumentBackend>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let primary = Arc::clone(&self.primary);
        let primary_err = match self.retry.run(|| operation(Arc::clone(&primary))).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(fallback) = self.substitution_target() else {
            return Err(primary_err);
        };

        tracing::warn!(
            target: TRACING_TARGET_FALLBACK,
            error = %primary_err,
            "Primary backend exhausted, substituting direct backend"
        );
        self.retry
            .run(|| operation(Arc::clone(&fallback)))
            .await
            .map_err(|fallback_err| Error::fallback(fallback_err, primary_err))
    }

    /// Runs a paged operation with retry and backend substitution.
    ///
    /// A substituted run starts over from the caller's original cursor: items
    /// accumulated against the failed primary were discarded with its error.
    async fn run_paged<F, Fut>(
        &self,
        start: Option<Key>,
        ceiling: Option<usize>,
        fetch: F,
    ) -> Result<Accumulated<Item, Key>>
    where
        F: Fn(Arc<dyn DocumentBackend>, Option<Key>) -> Fut,
        Fut: Future<Output = Result<Page<Item, Key>>>,
    {
        let primary = Arc::clone(&self.primary);
        let primary_err = match accumulate(&self.retry, start.clone(), ceiling, |cursor| {
            fetch(Arc::clone(&primary), cursor)
        })
        .await
        {
            Ok(accumulated) => return Ok(accumulated),
            Err(err) => err,
        };

        let Some(fallback) = self.substitution_target() else {
            return Err(primary_err);
        };

        tracing::warn!(
            target: TRACING_TARGET_FALLBACK,
            error = %primary_err,
            "Primary backend exhausted mid-pagination, re-running against direct backend"
        );
        accumulate(&self.retry, start, ceiling, |cursor| {
            fetch(Arc::clone(&fallback), cursor)
        })
        .await
        .map_err(|fallback_err| Error::fallback(fallback_err, primary_err))
    }

    fn substitution_target(&self) -> Option<Arc<dyn DocumentBackend>> {
        if !self.role.allows_substitution() {
            return None;
        }
        self.fallback.as_ref().map(Arc::clone)
    }

    /// Paged query over a conjunctive key condition.
    #[tracing::instrument(skip(self, conditions, options), target = TRACING_TARGET_STORE, fields(table = %table))]
    pub async fn query(
        &self,
        table: &str,
        conditions: &[Condition],
        options: QueryOptions,
    ) -> Result<QueryOutput> {
        if table.is_empty() {
            return Err(parameter(
                "query",
                "table name is required",
                json!({"table": table, "conditions": conditions}),
            ));
        }
        if conditions.is_empty() {
            return Err(parameter(
                "query",
                "at least one condition is required",
                json!({"table": table}),
            ));
        }
        if conditions.iter().any(|c| c.key.is_empty()) {
            return Err(parameter(
                "query",
                "condition key names must not be empty",
                json!({"table": table, "conditions": conditions}),
            ));
        }

        let built = build_conditions(conditions);
        let request = QueryRequest {
            table: table.to_string(),
            key_condition_expression: built.expression,
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
            index_name: options.index_name.clone(),
            exclusive_start_key: None,
        };

        let accumulated = self
            .run_paged(options.start_key, options.limit, move |backend, cursor| {
                let mut request = request.clone();
                request.exclusive_start_key = cursor;
                async move {
                    let response = backend.query(request).await.map_err(Error::backend)?;
                    Ok(Page::from(response))
                }
            })
            .await
            .map_err(|e| e.with_context(COMPONENT, "query", json!({"table": table})))?;

        Ok(QueryOutput {
            items: accumulated.items,
            last_evaluated_key: accumulated.last_cursor,
        })
    }

    /// Point query on a single hash key.
    pub async fn query_key(
        &self,
        table: &str,
        key_name: &str,
        value: impl Into<serde_json::Value>,
        options: QueryOptions,
    ) -> Result<QueryOutput> {
        if table.is_empty() || key_name.is_empty() {
            return Err(parameter(
                "query_key",
                "table and key name are required",
                json!({"table": table, "key_name": key_name}),
            ));
        }
        self.query(table, &[Condition::eq(key_name, value)], options)
            .await
    }

    /// Paged scan, full or filtered.
    ///
    /// An empty `filter` scans the whole table; otherwise the conditions
    /// become a conjunctive filter expression.
    #[tracing::instrument(skip(self, filter, options), target = TRACING_TARGET_STORE, fields(table = %table))]
    pub async fn scan(
        &self,
        table: &str,
        filter: &[Condition],
        options: QueryOptions,
    ) -> Result<QueryOutput> {
        if table.is_empty() {
            return Err(parameter(
                "scan",
                "table name is required",
                json!({"table": table}),
            ));
        }

        let built = if filter.is_empty() {
            Default::default()
        } else {
            build_conditions(filter)
        };
        let request = ScanRequest {
            table: table.to_string(),
            filter_expression: (!filter.is_empty()).then_some(built.expression),
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
            index_name: options.index_name.clone(),
            exclusive_start_key: None,
        };

        let accumulated = self
            .run_paged(options.start_key, options.limit, move |backend, cursor| {
                let mut request = request.clone();
                request.exclusive_start_key = cursor;
                async move {
                    let response = backend.scan(request).await.map_err(Error::backend)?;
                    Ok(Page::from(response))
                }
            })
            .await
            .map_err(|e| e.with_context(COMPONENT, "scan", json!({"table": table})))?;

        Ok(QueryOutput {
            items: accumulated.items,
            last_evaluated_key: accumulated.last_cursor,
        })
    }

    /// Point lookup by primary key.
    #[tracing::instrument(skip(self, key), target = TRACING_TARGET_STORE, fields(table = %table))]
    pub async fn get_item(&self, table: &str, key: Key) -> Result<Option<Item>> {
        if table.is_empty() || key.is_empty() {
            return Err(parameter(
                "get_item",
                "table name and key are required",
                json!({"table": table, "key": key}),
            ));
        }
        let request = GetItemRequest {
            table: table.to_string(),
            key,
        };
        self.run_single(move |backend| {
            let request = request.clone();
            async move { backend.get_item(request).await.map_err(Error::backend) }
        })
        .await
        .map_err(|e| e.with_context(COMPONENT, "get_item", json!({"table": table})))
    }

    /// Point write of a full item.
    #[tracing::instrument(skip(self, item), target = TRACING_TARGET_STORE, fields(table = %table))]
    pub async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        if table.is_empty() || item.is_empty() {
            return Err(parameter(
                "put_item",
                "table name and a non-empty item are required",
                json!({"table": table, "item": item}),
            ));
        }
        let request = PutItemRequest {
            table: table.to_string(),
            item,
        };
        self.run_single(move |backend| {
            let request = request.clone();
            async move { backend.put_item(request).await.map_err(Error::backend) }
        })
        .await
        .map_err(|e| e.with_context(COMPONENT, "put_item", json!({"table": table})))
    }

    /// In-place update from `set` and `increment` maps.
    #[tracing::instrument(skip(self, key, update), target = TRACING_TARGET_STORE, fields(table = %table))]
    pub async fn update_item(&self, table: &str, key: Key, update: Update) -> Result<()> {
        if table.is_empty() || key.is_empty() {
            return Err(parameter(
                "update_item",
                "table name and key are required",
                json!({"table": table, "key": key}),
            ));
        }
        if update.is_empty() {
            return Err(parameter(
                "update_item",
                "update must set or increment at least one attribute",
                json!({"table": table, "update": update}),
            ));
        }

        let built = build_update(&update);
        let request = UpdateItemRequest {
            table: table.to_string(),
            key,
            update_expression: built.expression,
            expression_attribute_names: built.names,
            expression_attribute_values: built.values,
        };
        self.run_single(move |backend| {
            let request = request.clone();
            async move { backend.update_item(request).await.map_err(Error::backend) }
        })
        .await
        .map_err(|e| e.with_context(COMPONENT, "update_item", json!({"table": table})))
    }

    /// Point delete by primary key.
    #[tracing::instrument(skip(self, key), target = TRACING_TARGET_STORE, fields(table = %table))]
    pub async fn delete_item(&self, table: &str, key: Key) -> Result<()> {
        if table.is_empty() || key.is_empty() {
            return Err(parameter(
                "delete_item",
                "table name and key are required",
                json!({"table": table, "key": key}),
            ));
        }
        let request = DeleteItemRequest {
            table: table.to_string(),
            key,
        };
        self.run_single(move |backend| {
            let request = request.clone();
            async move { backend.delete_item(request).await.map_err(Error::backend) }
        })
        .await
        .map_err(|e| e.with_context(COMPONENT, "delete_item", json!({"table": table})))
    }

    /// Batched point lookups, flattened to the requested table's items.
    #[tracing::instrument(skip(self, keys), target = TRACING_TARGET_STORE, fields(table = %table, keys = keys.len()))]
    pub async fn batch_get(&self, table: &str, keys: Vec<Key>) -> Result<Vec<Item>> {
        if table.is_empty() || keys.is_empty() {
            return Err(parameter(
                "batch_get",
                "table name and at least one key are required",
                json!({"table": table, "keys": keys}),
            ));
        }
        let request = BatchGetRequest {
            table: table.to_string(),
            keys,
        };
        let response = self
            .run_single(move |backend| {
                let request = request.clone();
                async move { backend.batch_get(request).await.map_err(Error::backend) }
            })
            .await
            .map_err(|e| e.with_context(COMPONENT, "batch_get", json!({"table": table})))?;
        Ok(flatten_table_items(response, table))
    }

    /// Batched puts and deletes.
    #[tracing::instrument(skip(self, writes), target = TRACING_TARGET_STORE, fields(table = %table, writes = writes.len()))]
    pub async fn batch_write(&self, table: &str, writes: Vec<WriteRequest>) -> Result<()> {
        if table.is_empty() || writes.is_empty() {
            return Err(parameter(
                "batch_write",
                "table name and at least one write are required",
                json!({"table": table}),
            ));
        }
        let request = BatchWriteRequest {
            table: table.to_string(),
            writes,
        };
        self.run_single(move |backend| {
            let request = request.clone();
            async move { backend.batch_write(request).await.map_err(Error::backend) }
        })
        .await
        .map_err(|e| e.with_context(COMPONENT, "batch_write", json!({"table": table})))
    }

    /// Transactional reads, flattened to the requested table's items.
    #[tracing::instrument(skip(self, keys), target = TRACING_TARGET_STORE, fields(table = %table, keys = keys.len()))]
    pub async fn transact_get(&self, table: &str, keys: Vec<Key>) -> Result<Vec<Item>> {
        if table.is_empty() || keys.is_empty() {
            return Err(parameter(
                "transact_get",
                "table name and at least one key are required",
                json!({"table": table, "keys": keys}),
            ));
        }
        let request = TransactGetRequest {
            table: table.to_string(),
            keys,
        };
        let response = self
            .run_single(move |backend| {
                let request = request.clone();
                async move { backend.transact_get(request).await.map_err(Error::backend) }
            })
            .await
            .map_err(|e| e.with_context(COMPONENT, "transact_get", json!({"table": table})))?;
        Ok(flatten_table_items(response, table))
    }

    /// Transactional writes.
    #[tracing::instrument(skip(self, writes), target = TRACING_TARGET_STORE, fields(table = %table, writes = writes.len()))]
    pub async fn transact_write(&self, table: &str, writes: Vec<WriteRequest>) -> Result<()> {
        if table.is_empty() || writes.is_empty() {
            return Err(parameter(
                "transact_write",
                "table name and at least one write are required",
                json!({"table": table}),
            ));
        }
        let request = TransactWriteRequest {
            table: table.to_string(),
            writes,
        };
        self.run_single(move |backend| {
            let request = request.clone();
            async move { backend.transact_write(request).await.map_err(Error::backend) }
        })
        .await
        .map_err(|e| e.with_context(COMPONENT, "transact_write", json!({"table": table})))
    }
}

fn parameter(operation: &'static str, reason: &str, input: serde_json::Value) -> Error {
    Error::invalid_parameter(reason).with_context(COMPONENT, operation, input)
}

/// Flattens a per-table response map into the requested table's items.
fn flatten_table_items(response: BatchGetResponse, table: &str) -> Vec<Item> {
    response
        .responses
        .and_then(|mut by_table| by_table.remove(table))
        .unwrap_or_default()
}
