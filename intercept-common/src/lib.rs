//! Common Interception Vocabulary
//!
//! Types and collaborator traits shared by the interception engine and the
//! components that plug into it:
//! - The proxy pipeline, which produces transactions
//! - The rule engine, which supplies breakpoint condition sets
//! - The workspace model, which persists interceptor levels

pub mod error;
pub mod level;
pub mod transaction;
pub mod workspace;

pub use error::PendingError;
pub use level::{Direction, InterceptionLevel};
pub use transaction::{
    ConditionSet, PendingOwner, RequestContext, ResponseContext, Transaction, TransactionId,
};
pub use workspace::{PropertyStore, Workspace};
