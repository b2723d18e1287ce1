//! Persistence seam for the listing services.
//!
//! All reads and writes go through a [`Transaction`]. A write transaction is
//! atomic: nothing it did is visible to others until [`Transaction::commit`],
//! and dropping it uncommitted discards every change. Read transactions see a
//! consistent snapshot and refuse writes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::pagination::{Sort, Window};
use crate::predicate::Predicate;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A document stored in its own collection, keyed by `_id`.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

#[async_trait]
pub trait Transaction: Send {
    async fn find_by_id<R: Record>(&mut self, id: &str) -> Result<Option<R>, StoreError>;

    /// Inserts or replaces the record with the same id.
    async fn save<R: Record>(&mut self, record: &R) -> Result<(), StoreError>;

    /// Returns whether a record was actually removed.
    async fn delete<R: Record>(&mut self, id: &str) -> Result<bool, StoreError>;

    async fn count<R: Record>(&mut self, predicate: &Predicate) -> Result<u64, StoreError>;

    async fn find_window<R: Record>(
        &mut self,
        predicate: &Predicate,
        sort: Sort,
        window: Window,
    ) -> Result<Vec<R>, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: Transaction;

    /// Opens an atomic read-write transaction.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Opens a read-only view; committing it is a no-op.
    async fn begin_read(&self) -> Result<Self::Tx, StoreError>;
}
