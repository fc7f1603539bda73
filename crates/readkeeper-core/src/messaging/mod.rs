//! The messaging-client capability the data actor is written against.

pub mod port;
pub mod throttled;
pub mod types;
