//! Transaction model and collaborator traits
//!
//! A transaction is one captured HTTP exchange. It is evaluated against the
//! request policy before the response exists, and possibly again against the
//! response policy once the response has arrived.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::error::PendingError;
use crate::level::Direction;

/// Stable identity of a transaction across both decision points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Request payload as seen by breakpoint conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub port: u16,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let port = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.port_or_known_default())
            .unwrap_or(80);
        Self {
            method: method.into(),
            url,
            headers: HashMap::new(),
            body: Vec::new(),
            port,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Hostname of the request URL, if it parses
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Response payload as seen by breakpoint conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseContext {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ResponseContext {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Named predicate over a request/response pair, supplied by the rule engine.
///
/// Evaluation happens while the interceptor holds its state lock, so
/// implementations must be fast and must never call back into the interceptor.
pub trait ConditionSet: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn matches(&self, request: &RequestContext, response: Option<&ResponseContext>) -> bool;
}

/// Receives disposition notices for transactions it holds
pub trait PendingOwner: Send + Sync {
    fn notify_handled(&self, id: TransactionId);
}

/// A single in-flight HTTP exchange
pub trait Transaction: Send + Sync + fmt::Debug {
    fn id(&self) -> TransactionId;

    fn has_response(&self) -> bool;

    fn request(&self) -> Arc<RequestContext>;

    fn response(&self) -> Option<Arc<ResponseContext>>;

    /// Record which interceptor now holds this transaction.
    ///
    /// Must reject a second hold while one is outstanding.
    fn mark_pending(&self, owner: Weak<dyn PendingOwner>) -> Result<(), PendingError>;

    /// Release the transaction so it resumes through the proxy pipeline.
    fn forward(&self);

    fn direction(&self) -> Direction {
        Direction::of(self.has_response())
    }
}
