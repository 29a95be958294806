//! Intercept Core Library
//!
//! This library provides the interception engine of the proxy: the per-direction
//! hold/pass decision, the queue of held transactions, and live re-evaluation
//! of that queue when levels, breakpoint sets or the workspace change.

pub mod breakpoints;
pub mod interceptor;
pub mod model;
pub mod observer;
pub mod stats;
pub mod transaction;
pub mod workspace;

/// Configuration types and utilities
pub mod config;

/// Error types for interceptor operations
pub mod error;

/// Logging setup for embedders
pub mod logging;

pub use breakpoints::{
    BreakpointCondition, BreakpointSet, BreakpointSetDefinition, MatchMode, REQUEST_BREAKPOINT_SET,
    RESPONSE_BREAKPOINT_SET,
};
pub use config::InterceptorConfig;
pub use error::InterceptError;
pub use interceptor::{HttpInterceptor, Subscriptions};
pub use logging::{init_logging, LoggingConfig};
pub use model::{ConditionSetChanged, Model, WorkspaceEvent};
pub use observer::{ChannelObserver, InterceptorEvent, InterceptorObserver};
pub use stats::StatsSnapshot;
pub use transaction::ProxyTransaction;
pub use workspace::MemoryWorkspace;

/// Re-export the shared vocabulary
pub use intercept_common::{
    ConditionSet, Direction, InterceptionLevel, PendingError, PendingOwner, PropertyStore,
    RequestContext, ResponseContext, Transaction, TransactionId, Workspace,
};

/// Result type alias for interceptor operations
pub type Result<T> = std::result::Result<T, InterceptError>;
