//! Storage trait definitions
//!
//! Implementations can be in-memory, Redis-backed, or any other system that
//! stores strings under string keys with an optional expiry.

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::Result;

/// Trait for TTL-capable key/value backends
///
/// Implementations must be thread-safe (Send + Sync) as they are shared
/// across request handlers and background tasks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value; expired and missing keys both return `None`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value without expiry, replacing any existing value
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Store a value that expires after `ttl`, replacing any existing value
    async fn setex(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List live keys starting with `prefix`
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
