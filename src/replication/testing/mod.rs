//! In-memory stand-ins for the collaborators this crate depends on but does
//! not implement, for use in this crate's own tests and in a consuming
//! binary's integration tests.

mod pool;
mod sink;
mod store;

pub use pool::{PoolEvent, ScriptedConnection, ScriptedPool};
pub use sink::CollectingSink;
pub use store::InMemoryStore;
