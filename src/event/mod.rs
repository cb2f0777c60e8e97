//! Event system: observable topics and the synchronous bus that connects
//! them to resolver listeners and host callbacks.

pub mod bus;
pub mod topic;

pub use bus::{EventBus, Handler, SubscriptionId};
pub use topic::{EventKind, Observable, ResolverField, Topic};
