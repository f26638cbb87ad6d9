//! Backend-native request and response shapes.
//!
//! Built once per logical call; during pagination only the
//! `exclusive_start_key` field changes between page attempts.

use std::collections::HashMap;

use crate::backend::{Item, Key};

/// One page of a key-condition query.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub table: String,
    pub key_condition_expression: String,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: serde_json::Map<String, serde_json::Value>,
    pub index_name: Option<String>,
    pub exclusive_start_key: Option<Key>,
}

/// One page of a table scan, optionally filtered.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub table: String,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: serde_json::Map<String, serde_json::Value>,
    pub index_name: Option<String>,
    pub exclusive_start_key: Option<Key>,
}

/// A query/scan page as the backend reports it.
///
/// `items` is `None` when the backend omits the items field entirely; the
/// accumulator treats that as a valid empty page. A present
/// `last_evaluated_key` is the sole signal that more data exists.
#[derive(Debug, Clone, Default)]
pub struct PageResponse {
    pub items: Option<Vec<Item>>,
    pub last_evaluated_key: Option<Key>,
}

#[derive(Debug, Clone)]
pub struct GetItemRequest {
    pub table: String,
    pub key: Key,
}

#[derive(Debug, Clone)]
pub struct PutItemRequest {
    pub table: String,
    pub item: Item,
}

#[derive(Debug, Clone)]
pub struct UpdateItemRequest {
    pub table: String,
    pub key: Key,
    pub update_expression: String,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct DeleteItemRequest {
    pub table: String,
    pub key: Key,
}

/// A single batched or transactional write.
#[derive(Debug, Clone)]
pub enum WriteRequest {
    Put(Item),
    Delete(Key),
}

#[derive(Debug, Clone)]
pub struct BatchGetRequest {
    pub table: String,
    pub keys: Vec<Key>,
}

/// Batch/transactional read response: items grouped per table.
///
/// The store flattens the requested table's entry; a missing or malformed
/// map yields an empty sequence, not an error.
#[derive(Debug, Clone, Default)]
pub struct BatchGetResponse {
    pub responses: Option<HashMap<String, Vec<Item>>>,
}

#[derive(Debug, Clone)]
pub struct BatchWriteRequest {
    pub table: String,
    pub writes: Vec<WriteRequest>,
}

#[derive(Debug, Clone)]
pub struct TransactGetRequest {
    pub table: String,
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone)]
pub struct TransactWriteRequest {
    pub table: String,
    pub writes: Vec<WriteRequest>,
}

impl From<PageResponse> for stratus_core::Page<Item, Key> {
    fn from(response: PageResponse) -> Self {
        Self {
            items: response.items,
            next_cursor: response.last_evaluated_key,
        }
    }
}
