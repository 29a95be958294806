//! Workspace persistence boundary

use std::fmt;

/// Integer-valued key/value settings attached to a workspace
pub trait PropertyStore: Send + Sync {
    fn get_integer_property(&self, key: &str) -> Option<i64>;

    fn set_integer_property(&self, key: &str, value: i64);
}

/// An open project workspace; the interceptor only uses its property store
pub trait Workspace: PropertyStore + fmt::Debug {
    fn name(&self) -> &str;
}
