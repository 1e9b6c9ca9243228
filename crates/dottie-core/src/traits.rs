use crate::{QueryParams, Record, Result};
use async_trait::async_trait;

/// Query-execute capability of the graph store.
///
/// Implementations map transport and query failures to `TriageError::Query`. Rows come back
/// in whatever order the store produced them.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn execute_query(&self, query: &str, params: QueryParams) -> Result<Vec<Record>>;
}
