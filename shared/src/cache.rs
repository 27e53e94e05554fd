//! Durable token cache.
//!
//! A single logical row keyed by a fixed id holds the current bearer token
//! and its issuance time. Refreshes overwrite the row (last-write-wins); a
//! missing row or a store failure is treated as "no token" by the caller.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{Error, Result};

/// Partition key value of the singleton token item.
const TOKEN_KEY: &str = "token";
/// Partition key attribute name.
const KEY_ATTRIBUTE: &str = "id";

/// The cached bearer token and when it was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub token: String,
    pub created: DateTime<Utc>,
}

/// Storage seam for the singleton token record.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the current record, `None` when no token has been stored yet.
    async fn read(&self) -> Result<Option<TokenRecord>>;

    /// Overwrite the current record.
    async fn write(&self, record: &TokenRecord) -> Result<()>;
}

/// DynamoDB-backed token store.
pub struct DynamoTokenStore {
    client: DynamoClient,
    table: String,
}

impl DynamoTokenStore {
    pub fn new(client: DynamoClient, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl TokenStore for DynamoTokenStore {
    async fn read(&self) -> Result<Option<TokenRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTRIBUTE, AttributeValue::S(TOKEN_KEY.to_string()))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to read token item: {}", e)))?;

        let Some(item) = output.item else {
            return Ok(None);
        };

        let token = item
            .get("token")
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| Error::Aws("Token item has no token attribute".to_string()))?;

        let created = item
            .get("created")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| Error::Aws("Token item has a malformed created attribute".to_string()))?;

        Ok(Some(TokenRecord { token, created }))
    }

    async fn write(&self, record: &TokenRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item(KEY_ATTRIBUTE, AttributeValue::S(TOKEN_KEY.to_string()))
            .item("token", AttributeValue::S(record.token.clone()))
            .item(
                "created",
                AttributeValue::N(record.created.timestamp().to_string()),
            )
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to write token item: {}", e)))?;

        Ok(())
    }
}

/// In-memory token store for tests and local runs.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<TokenRecord>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn read(&self) -> Result<Option<TokenRecord>> {
        Ok(self.inner.read().await.clone())
    }

    async fn write(&self, record: &TokenRecord) -> Result<()> {
        *self.inner.write().await = Some(record.clone());
        Ok(())
    }
}
