pub mod cache;
pub mod decode;
pub mod queries;
pub mod resolver;
pub mod schema;
pub mod seed;

#[cfg(feature = "surrealdb")]
pub mod surrealdb_store;

pub use cache::SnapshotCache;
pub use decode::{decode_all, FromRecord};
pub use resolver::ReferenceResolver;
pub use seed::{SeedDocument, SeedReport};

#[cfg(feature = "surrealdb")]
pub use surrealdb_store::SurrealDbStore;
