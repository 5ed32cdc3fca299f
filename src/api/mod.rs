//! Data-source clients for the hosted backend

pub mod memory;
pub mod query;
pub mod rest;

use serde_json::Value;

use crate::config::Config;
use crate::session::Session;

pub use memory::MemoryStore;
pub use query::{Embed, Filter, Order, Range, Relation, Select, StoreError};
pub use rest::RestClient;

/// The four verbs the client issues against named relations
#[allow(async_fn_in_trait)]
pub trait DataSource {
    /// Read rows
    async fn select(&self, query: &Select) -> Result<Vec<Value>, StoreError>;

    /// Insert one or more rows, returning them as stored
    async fn insert(&self, relation: Relation, rows: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    /// Patch every row matching `filters`, returning the affected rows
    async fn update(
        &self,
        relation: Relation,
        patch: Value,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError>;

    /// Delete every row matching `filters`
    async fn delete(&self, relation: Relation, filters: &[Filter]) -> Result<(), StoreError>;
}

/// Unified client that wraps the concrete sources
pub enum Client {
    /// Hosted PostgREST backend
    Rest(RestClient),
    /// In-process store (demo mode)
    Memory(MemoryStore),
}

impl DataSource for Client {
    async fn select(&self, query: &Select) -> Result<Vec<Value>, StoreError> {
        match self {
            Client::Rest(c) => c.select(query).await,
            Client::Memory(c) => c.select(query).await,
        }
    }

    async fn insert(&self, relation: Relation, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        match self {
            Client::Rest(c) => c.insert(relation, rows).await,
            Client::Memory(c) => c.insert(relation, rows).await,
        }
    }

    async fn update(
        &self,
        relation: Relation,
        patch: Value,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError> {
        match self {
            Client::Rest(c) => c.update(relation, patch, filters).await,
            Client::Memory(c) => c.update(relation, patch, filters).await,
        }
    }

    async fn delete(&self, relation: Relation, filters: &[Filter]) -> Result<(), StoreError> {
        match self {
            Client::Rest(c) => c.delete(relation, filters).await,
            Client::Memory(c) => c.delete(relation, filters).await,
        }
    }
}

/// Build the REST client for the configured backend
pub fn get_client(config: &Config, session: Option<&Session>) -> anyhow::Result<Client> {
    let client = RestClient::new(
        &config.backend_url,
        &config.api_key,
        session.and_then(Session::access_token),
        config.request_timeout(),
    )?;
    Ok(Client::Rest(client))
}
