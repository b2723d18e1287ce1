use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use bson::Document;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Record, Store, Transaction};
use crate::error::StoreError;
use crate::pagination::{Sort, Window};
use crate::predicate::{compare, lookup, Predicate};

type Table = BTreeMap<String, Document>;
type Tables = HashMap<&'static str, Table>;

/// Process-local store. Writers are serialized; readers work on snapshots and
/// never wait for writers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    committed: Arc<RwLock<Tables>>,
    writer: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Tables {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct MemoryTx {
    store: MemoryStore,
    writer: Option<OwnedMutexGuard<()>>,
    working: Tables,
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let writer = self.writer.clone().lock_owned().await;
        Ok(MemoryTx {
            store: self.clone(),
            writer: Some(writer),
            working: self.snapshot(),
        })
    }

    async fn begin_read(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            store: self.clone(),
            writer: None,
            working: self.snapshot(),
        })
    }
}

impl MemoryTx {
    fn table_mut(&mut self, name: &'static str) -> Result<&mut Table, StoreError> {
        if self.writer.is_none() {
            return Err(StoreError::ReadOnly);
        }
        Ok(self.working.entry(name).or_default())
    }

    fn select(&self, name: &'static str, predicate: &Predicate) -> Vec<&Document> {
        self.working
            .get(name)
            .map(|table| table.values().filter(|doc| predicate.matches(doc)).collect())
            .unwrap_or_default()
    }
}

fn recent_first(a: &Document, b: &Document) -> Ordering {
    let by_created = match (lookup(a, "createdAt"), lookup(b, "createdAt")) {
        (Some(x), Some(y)) => compare(y, x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_created.then_with(|| a.get_str("_id").ok().cmp(&b.get_str("_id").ok()))
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn find_by_id<R: Record>(&mut self, id: &str) -> Result<Option<R>, StoreError> {
        match self.working.get(R::COLLECTION).and_then(|t| t.get(id)) {
            Some(doc) => Ok(Some(bson::from_document(doc.clone())?)),
            None => Ok(None),
        }
    }

    async fn save<R: Record>(&mut self, record: &R) -> Result<(), StoreError> {
        let doc = bson::to_document(record)?;
        self.table_mut(R::COLLECTION)?
            .insert(record.id().to_string(), doc);
        Ok(())
    }

    async fn delete<R: Record>(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.table_mut(R::COLLECTION)?.remove(id).is_some())
    }

    async fn count<R: Record>(&mut self, predicate: &Predicate) -> Result<u64, StoreError> {
        Ok(self.select(R::COLLECTION, predicate).len() as u64)
    }

    async fn find_window<R: Record>(
        &mut self,
        predicate: &Predicate,
        sort: Sort,
        window: Window,
    ) -> Result<Vec<R>, StoreError> {
        let mut rows = self.select(R::COLLECTION, predicate);
        if sort == Sort::Recent {
            rows.sort_by(|a, b| recent_first(a, b));
        }
        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let take = window
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        rows.into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| bson::from_document(doc.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.writer.is_some() {
            *self
                .store
                .committed
                .write()
                .unwrap_or_else(PoisonError::into_inner) = self.working;
        }
        Ok(())
    }
}
