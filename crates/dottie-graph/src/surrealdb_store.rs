use async_trait::async_trait;
use dottie_core::{GraphConfig, GraphStore, QueryParams, Record, Result, TriageError};
use secrecy::ExposeSecret;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use surrealdb::{engine::any::Any, opt::auth::Root, Error as SurrealError, Surreal};
use tracing::{debug, info};

/// SurrealDB-backed graph store.
#[derive(Clone)]
pub struct SurrealDbStore {
    db: Arc<Surreal<Any>>,
}

impl SurrealDbStore {
    /// Connect, authenticate when credentials are configured, and select namespace/database.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        info!(
            connection = %config.connection,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB graph store"
        );

        let db: Surreal<Any> = Surreal::init();
        db.connect(config.connection.as_str())
            .await
            .map_err(|e| TriageError::Query(format!("Failed to connect: {}", truncate_surreal_error(&e))))?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.expose_secret(),
            })
            .await
            .map_err(|e| TriageError::Query(format!("Authentication failed: {}", truncate_surreal_error(&e))))?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|e| {
                TriageError::Query(format!(
                    "Failed to select namespace/database: {}",
                    truncate_surreal_error(&e)
                ))
            })?;

        info!("SurrealDB graph store ready");
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl GraphStore for SurrealDbStore {
    /// Runs the statement(s) and returns the rows of the last one. A last statement
    /// that yields NONE (DEFINE, REMOVE, ...) returns no rows.
    async fn execute_query(&self, query: &str, params: QueryParams) -> Result<Vec<Record>> {
        debug!(query = query.trim(), params = params.len(), "executing graph query");

        let response = self
            .db
            .query(query)
            .bind(params)
            .await
            .map_err(|e| TriageError::Query(format!("Failed to run query: {}", truncate_surreal_error(&e))))?;

        let mut response = response
            .check()
            .map_err(|e| TriageError::Query(format!("Query rejected: {}", truncate_surreal_error(&e))))?;

        let last = response.num_statements().saturating_sub(1);
        let rows: Vec<Option<HashMap<String, JsonValue>>> = response.take(last).map_err(|e| {
            TriageError::Query(format!(
                "Failed to extract query results: {}",
                truncate_surreal_error(&e)
            ))
        })?;

        Ok(rows.into_iter().flatten().map(Record::from).collect())
    }
}

fn truncate_surreal_error(e: &SurrealError) -> String {
    const MAX_LEN: usize = 512;
    let mut msg = e.to_string();
    if msg.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while !msg.is_char_boundary(cut) {
            cut -= 1;
        }
        msg.truncate(cut);
        msg.push('…');
    }
    msg
}
