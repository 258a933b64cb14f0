//! # Document Stores
//!
//! This module defines the seam between the migration orchestrator and the
//! database. The orchestrator only needs two things from an instance: read the
//! `page_setup` documents whose `_id` is in a list, and replace-or-insert a
//! document by its `_id`.
//!
//! - **`DocumentStore`**: one live connection to one instance.
//! - **`Connector`**: creates a `DocumentStore` for a [`HostSpec`].
//!
//! [`MongoConnector`] is the production implementation built on the blocking
//! API of the `mongodb` driver. Tests substitute in-memory stores.

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::sync::{Client, Collection};

use crate::error::{Error, Result};
use crate::host::HostSpec;

/// The only collection this tool reads and writes.
pub const PAGE_SETUP_COLLECTION: &str = "page_setup";

/// Identifier field of every document.
pub const ID_FIELD: &str = "_id";

/// One connection to one database instance.
pub trait DocumentStore: Send + Sync {
    /// Documents in `db_name.page_setup` whose `_id` is one of `ids`, in the
    /// order the server returns them.
    fn find_page_setups(&self, db_name: &str, ids: &[ObjectId]) -> Result<Vec<Document>>;

    /// Replace the document with the same `_id` in `db_name.page_setup`, or
    /// insert it if none exists.
    fn upsert_page_setup(&self, db_name: &str, document: &Document) -> Result<()>;
}

/// Opens connections to database instances.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &HostSpec) -> Result<Arc<dyn DocumentStore>>;
}

/// Connects through the `mongodb` driver's blocking client.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

impl Connector for MongoConnector {
    fn connect(&self, host: &HostSpec) -> Result<Arc<dyn DocumentStore>> {
        let client = Client::with_uri_str(host.uri()).map_err(|e| Error::Connect {
            host: host.to_string(),
            message: e.to_string(),
        })?;
        Ok(Arc::new(MongoStore {
            host: host.clone(),
            client,
        }))
    }
}

/// A `DocumentStore` backed by a `mongodb::sync::Client`.
pub struct MongoStore {
    host: HostSpec,
    client: Client,
}

impl MongoStore {
    fn collection(&self, db_name: &str) -> Collection<Document> {
        self.client
            .database(db_name)
            .collection::<Document>(PAGE_SETUP_COLLECTION)
    }
}

impl DocumentStore for MongoStore {
    fn find_page_setups(&self, db_name: &str, ids: &[ObjectId]) -> Result<Vec<Document>> {
        let source_error = |message: String| Error::DataSource {
            host: self.host.to_string(),
            ids: join_ids(ids),
            message,
        };

        let filter = doc! { "_id": { "$in": ids.to_vec() } };
        let cursor = self
            .collection(db_name)
            .find(filter)
            .run()
            .map_err(|e| source_error(e.to_string()))?;

        cursor
            .map(|document| document.map_err(|e| source_error(e.to_string())))
            .collect()
    }

    fn upsert_page_setup(&self, db_name: &str, document: &Document) -> Result<()> {
        let id = document_id(document).ok_or_else(|| Error::DataWrite {
            host: self.host.to_string(),
            document_id: "<missing _id>".to_string(),
            message: "document has no _id field".to_string(),
        })?;

        self.collection(db_name)
            .replace_one(doc! { "_id": id.clone() }, document)
            .upsert(true)
            .run()
            .map_err(|e| Error::DataWrite {
                host: self.host.to_string(),
                document_id: display_id(id),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

/// The `_id` value of a document, if present.
pub fn document_id(document: &Document) -> Option<&Bson> {
    document.get(ID_FIELD)
}

/// Render an `_id` the way operators pass it on the command line.
pub fn display_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn join_ids(ids: &[ObjectId]) -> String {
    ids.iter().map(|id| id.to_hex()).collect::<Vec<_>>().join(",")
}
