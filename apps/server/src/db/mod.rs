//! Persistence layer
//!
//! [`Store`] is the seam between the services and the relational backend.
//! Two backends are provided: PostgreSQL for deployments and an in-memory
//! store for tests and local runs.

pub mod memory;
pub mod store;
pub mod traits;

pub use memory::{FailPoint, MemoryStore};
pub use store::PostgresStore;
pub use traits::{Store, StoreTransaction};
