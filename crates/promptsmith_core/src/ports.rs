//! crates/promptsmith_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like storage or the
//! remote generation API.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde_json::Value;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// How a call to the remote generation collaborator can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFailure {
    /// The collaborator answered with a non-success status.
    #[error("request rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },
    /// The exchange itself broke down (network, malformed response, ...).
    #[error("transport failure: {0}")]
    Transport(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable key-value storage, read at startup and overwritten wholesale on every mutation.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw stored value, or `None` if the key was never written.
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;
}

/// The remote model that restructures a rough idea into a prompt.
#[async_trait]
pub trait PromptGenerationService: Send + Sync {
    /// Sends the user's text and returns whatever JSON the model produced.
    async fn generate(&self, input: &str) -> Result<Value, GenerationFailure>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Today's calendar day in local time.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}
