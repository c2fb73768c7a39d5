//! Storage collaborator seam.
//!
//! The router decides *where* a query goes; a [`ShardedStore`] owns the
//! connections and query execution.

use std::future::Future;

use thiserror::Error;

use crate::registry::{NoPoolAvailable, Pool};
use crate::routing::replica::{Primary, ReplicaRouter};

/// Connection provider for replicas and the primary.
pub trait ShardedStore: Send + Sync {
    type Connection: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a read connection to `replica`.
    fn read(&self, replica: &Pool) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// Open a write connection to the primary.
    fn write(&self, primary: &Primary) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

#[derive(Debug, Error)]
pub enum StorageError<E> {
    #[error(transparent)]
    NoReplica(#[from] NoPoolAvailable),

    #[error("storage error: {0}")]
    Store(#[source] E),
}

impl ReplicaRouter {
    /// Read connection for a tenant, on its shard or a failover replica.
    pub async fn read_connection<S: ShardedStore>(
        &self,
        store: &S,
        tenant_id: i64,
    ) -> Result<S::Connection, StorageError<S::Error>> {
        let replica = self.route_read(tenant_id)?;
        store.read(&replica).await.map_err(StorageError::Store)
    }

    /// Write connection to the primary.
    pub async fn write_connection<S: ShardedStore>(&self, store: &S) -> Result<S::Connection, StorageError<S::Error>> {
        let primary = self.route_write();
        store.write(&primary).await.map_err(StorageError::Store)
    }
}
