//! MongoDB backend. Write transactions run inside a multi-document transaction
//! (the deployment must be a replica set); read transactions use a plain session.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::debug;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, FindOptions, ReplaceOptions};
use mongodb::{Client, ClientSession, Collection, Database};

use super::{Record, Store, Transaction};
use crate::config::Config;
use crate::error::StoreError;
use crate::pagination::{Sort, Window};
use crate::predicate::{Clause, Expr, Predicate};

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub fn new(client: Client, database: &str) -> Self {
        let database = client.database(database);
        MongoStore { client, database }
    }

    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let mut client_options = ClientOptions::parse(&config.mongo_uri).await?;
        client_options.app_name = Some(config.app_name.clone());
        client_options.server_selection_timeout =
            Some(Duration::from_secs(config.server_selection_timeout_secs));
        let client = Client::with_options(client_options)?;
        debug!("connected to mongodb, database {}", config.database);
        Ok(MongoStore::new(client, &config.database))
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

pub struct MongoTx {
    database: Database,
    session: ClientSession,
    in_transaction: bool,
}

#[async_trait]
impl Store for MongoStore {
    type Tx = MongoTx;

    async fn begin(&self) -> Result<MongoTx, StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(MongoTx {
            database: self.database.clone(),
            session,
            in_transaction: true,
        })
    }

    async fn begin_read(&self) -> Result<MongoTx, StoreError> {
        let session = self.client.start_session(None).await?;
        Ok(MongoTx {
            database: self.database.clone(),
            session,
            in_transaction: false,
        })
    }
}

impl MongoTx {
    fn collection<R: Record>(&self) -> Collection<R> {
        self.database.collection::<R>(R::COLLECTION)
    }

    fn writable(&self) -> Result<(), StoreError> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(StoreError::ReadOnly)
        }
    }
}

#[async_trait]
impl Transaction for MongoTx {
    async fn find_by_id<R: Record>(&mut self, id: &str) -> Result<Option<R>, StoreError> {
        let found = self
            .collection::<R>()
            .find_one_with_session(doc! { "_id": id }, None, &mut self.session)
            .await?;
        Ok(found)
    }

    async fn save<R: Record>(&mut self, record: &R) -> Result<(), StoreError> {
        self.writable()?;
        let mut replace_options = ReplaceOptions::default();
        replace_options.upsert = Some(true);
        self.collection::<R>()
            .replace_one_with_session(
                doc! { "_id": record.id() },
                record,
                replace_options,
                &mut self.session,
            )
            .await?;
        Ok(())
    }

    async fn delete<R: Record>(&mut self, id: &str) -> Result<bool, StoreError> {
        self.writable()?;
        let result = self
            .collection::<R>()
            .delete_one_with_session(doc! { "_id": id }, None, &mut self.session)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn count<R: Record>(&mut self, predicate: &Predicate) -> Result<u64, StoreError> {
        let count = self
            .collection::<R>()
            .count_documents_with_session(filter_document(predicate), None, &mut self.session)
            .await?;
        Ok(count)
    }

    async fn find_window<R: Record>(
        &mut self,
        predicate: &Predicate,
        sort: Sort,
        window: Window,
    ) -> Result<Vec<R>, StoreError> {
        let mut find_options = FindOptions::default();
        find_options.sort = Some(sort_document(sort));
        find_options.skip = Some(window.skip);
        find_options.limit = window.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut cursor = self
            .collection::<R>()
            .find_with_session(filter_document(predicate), find_options, &mut self.session)
            .await?;
        let rows: Vec<R> = cursor.stream(&mut self.session).try_collect().await?;
        Ok(rows)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            self.session.commit_transaction().await?;
        }
        Ok(())
    }
}

/// Compiles a predicate tree into a MongoDB query document.
pub fn filter_document(predicate: &Predicate) -> Document {
    match predicate {
        Expr::And(..) => {
            let mut parts = Vec::new();
            flatten_and(predicate, &mut parts);
            doc! { "$and": parts }
        }
        Expr::Or(..) => {
            let mut parts = Vec::new();
            flatten_or(predicate, &mut parts);
            doc! { "$or": parts }
        }
        Expr::Literal(clause) => clause_document(clause),
    }
}

fn flatten_and(predicate: &Predicate, out: &mut Vec<Bson>) {
    match predicate {
        Expr::And(a, b) => {
            flatten_and(a, out);
            flatten_and(b, out);
        }
        other => out.push(Bson::Document(filter_document(other))),
    }
}

fn flatten_or(predicate: &Predicate, out: &mut Vec<Bson>) {
    match predicate {
        Expr::Or(a, b) => {
            flatten_or(a, out);
            flatten_or(b, out);
        }
        other => out.push(Bson::Document(filter_document(other))),
    }
}

fn clause_document(clause: &Clause) -> Document {
    let mut condition = Document::new();
    match clause {
        Clause::Eq { path, value } => {
            condition.insert(*path, value.clone());
        }
        Clause::Gte { path, value } => {
            condition.insert(*path, doc! { "$gte": value.clone() });
        }
        Clause::Lte { path, value } => {
            condition.insert(*path, doc! { "$lte": value.clone() });
        }
        Clause::Contains { path, needle } => {
            condition.insert(
                *path,
                doc! { "$regex": regex::escape(needle), "$options": "i" },
            );
        }
        Clause::AnyOf { path, values } => {
            condition.insert(*path, doc! { "$in": values.clone() });
        }
        Clause::Missing { path } => {
            condition.insert(*path, Bson::Null);
        }
    }
    condition
}

fn sort_document(sort: Sort) -> Document {
    match sort {
        Sort::Natural => doc! { "_id": 1 },
        Sort::Recent => doc! { "createdAt": -1, "_id": 1 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_clauses_compile_to_field_conditions() {
        assert_eq!(
            filter_document(&Predicate::published()),
            doc! { "published": true }
        );
        assert_eq!(
            filter_document(&Predicate::gte("price", 100.0)),
            doc! { "price": { "$gte": 100.0 } }
        );
        assert_eq!(
            filter_document(&Predicate::any_of("type", ["HOTEL", "ROOM"])),
            doc! { "type": { "$in": ["HOTEL", "ROOM"] } }
        );
        assert_eq!(
            filter_document(&Predicate::missing("availableFrom")),
            doc! { "availableFrom": Bson::Null }
        );
    }

    #[test]
    fn contains_escapes_regex_metacharacters() {
        assert_eq!(
            filter_document(&Predicate::contains("title", "a.b (c)")),
            doc! { "title": { "$regex": "a\\.b \\(c\\)", "$options": "i" } }
        );
    }

    #[test]
    fn conjunctions_are_flattened() {
        let predicate = Predicate::all_of(
            Predicate::published(),
            vec![
                Predicate::gte("price", 1.0),
                Expr::or(
                    Predicate::contains("title", "x"),
                    Expr::or(
                        Predicate::contains("description", "x"),
                        Predicate::equals("rooms", 2),
                    ),
                ),
            ],
        );
        let compiled = filter_document(&predicate);
        let parts = compiled.get_array("$and").unwrap();
        assert_eq!(parts.len(), 3);
        let either = parts[2].as_document().unwrap().get_array("$or").unwrap();
        assert_eq!(either.len(), 3);
    }

    #[test]
    fn recent_sort_breaks_ties_by_id() {
        let sort = sort_document(Sort::Recent);
        let keys: Vec<&String> = sort.keys().collect();
        assert_eq!(keys, vec!["createdAt", "_id"]);
    }
}
