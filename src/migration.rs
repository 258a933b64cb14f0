//! `page_setup` document migration between database instances.
//!
//! Documents are read from every source first and only then written to the
//! target, so the target never sees a partial set of sources. The write phase
//! itself is not transactional: a failed upsert stops the batch and leaves the
//! documents written before it in place.

use log::{error, info, warn};
use mongodb::bson::Document;

use crate::cache::ConnectionCache;
use crate::error::{Error, Result};
use crate::host::{HostSpec, PageIdGroup};
use crate::store::{display_id, document_id};

/// One source host together with the page ids to copy from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTask {
    pub host: HostSpec,
    pub ids: PageIdGroup,
}

impl SourceTask {
    pub fn new(host: HostSpec, ids: PageIdGroup) -> Self {
        Self { host, ids }
    }
}

/// What a successful migration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// `(source host, documents read)` in task order.
    pub fetched: Vec<(String, usize)>,
    /// Documents upserted into the target.
    pub written: usize,
}

/// Copies `page_setup` documents through a [`ConnectionCache`].
pub struct Migrator {
    cache: ConnectionCache,
}

impl Migrator {
    pub fn new(cache: ConnectionCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    /// Read the documents of every task, in task order.
    ///
    /// The first source that fails aborts the read; nothing is returned from
    /// the sources that succeeded before it.
    pub fn collect(
        &self,
        tasks: &[SourceTask],
        db_name: &str,
        report: &mut MigrationReport,
    ) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for task in tasks {
            let store = self.cache.get_connection(&task.host).map_err(|e| match e {
                Error::Connect { host, message } => Error::DataSource {
                    host,
                    ids: task.ids.to_string(),
                    message,
                },
                other => other,
            })?;
            let found = store.find_page_setups(db_name, task.ids.ids())?;
            info!(
                "read {} of {} page_setup document(s) from {}",
                found.len(),
                task.ids.len(),
                task.host
            );
            warn_missing(task, &found);
            report.fetched.push((task.host.to_string(), found.len()));
            documents.extend(found);
        }
        Ok(documents)
    }

    /// Upsert `documents` into the target, stopping at the first failure.
    pub fn write(&self, target: &HostSpec, db_name: &str, documents: &[Document]) -> Result<usize> {
        let store = self.cache.get_connection(target)?;
        for (written, document) in documents.iter().enumerate() {
            if let Err(e) = store.upsert_page_setup(db_name, document) {
                let id = document_id(document)
                    .map(display_id)
                    .unwrap_or_else(|| "<missing _id>".to_string());
                error!(
                    "upsert of page_setup {} into {} failed after {} write(s)",
                    id, target, written
                );
                return Err(match e {
                    Error::DataWrite { .. } => e,
                    other => Error::DataWrite {
                        host: target.to_string(),
                        document_id: id,
                        message: other.to_string(),
                    },
                });
            }
        }
        info!(
            "upserted {} page_setup document(s) into {}",
            documents.len(),
            target
        );
        Ok(documents.len())
    }

    /// Read every task's documents, then upsert all of them into `target`.
    pub fn migrate(
        &self,
        tasks: &[SourceTask],
        target: &HostSpec,
        db_name: &str,
    ) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        let documents = self.collect(tasks, db_name, &mut report)?;
        report.written = self.write(target, db_name, &documents)?;
        Ok(report)
    }
}

fn warn_missing(task: &SourceTask, found: &[Document]) {
    for id in task.ids.ids() {
        let present = found.iter().any(|document| {
            document_id(document)
                .and_then(|value| value.as_object_id())
                .is_some_and(|oid| oid == *id)
        });
        if !present {
            warn!("page_setup {} not found on {}", id.to_hex(), task.host);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::{Connector, DocumentStore};
    use mongodb::bson::oid::ObjectId;
    use mongodb::bson::{doc, Bson};
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// An in-memory database instance: `db_name -> (_id hex -> document)`.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) databases: Mutex<HashMap<String, BTreeMap<String, Document>>>,
        pub(crate) fail_reads: bool,
        pub(crate) fail_write_of: Option<ObjectId>,
    }

    impl MemoryStore {
        pub(crate) fn with_documents(db_name: &str, documents: Vec<Document>) -> Self {
            let store = Self::default();
            {
                let mut databases = store.databases.lock().unwrap();
                let collection = databases.entry(db_name.to_string()).or_default();
                for document in documents {
                    let key = display_id(document_id(&document).unwrap());
                    collection.insert(key, document);
                }
            }
            store
        }

        pub(crate) fn documents(&self, db_name: &str) -> Vec<Document> {
            self.databases
                .lock()
                .unwrap()
                .get(db_name)
                .map(|collection| collection.values().cloned().collect())
                .unwrap_or_default()
        }
    }

    impl DocumentStore for MemoryStore {
        fn find_page_setups(&self, db_name: &str, ids: &[ObjectId]) -> Result<Vec<Document>> {
            if self.fail_reads {
                return Err(Error::DataSource {
                    host: "memory".to_string(),
                    ids: crate::store::join_ids(ids),
                    message: "connection reset".to_string(),
                });
            }
            let databases = self.databases.lock().unwrap();
            let Some(collection) = databases.get(db_name) else {
                return Ok(Vec::new());
            };
            // Collection order, like a server answering an `$in` query.
            let wanted: HashSet<String> = ids.iter().map(|id| id.to_hex()).collect();
            Ok(collection
                .iter()
                .filter(|(key, _)| wanted.contains(*key))
                .map(|(_, document)| document.clone())
                .collect())
        }

        fn upsert_page_setup(&self, db_name: &str, document: &Document) -> Result<()> {
            let id = document_id(document).unwrap();
            if let (Some(fail), Bson::ObjectId(oid)) = (self.fail_write_of, id) {
                if fail == *oid {
                    return Err(Error::DataWrite {
                        host: "memory".to_string(),
                        document_id: oid.to_hex(),
                        message: "write concern error".to_string(),
                    });
                }
            }
            self.databases
                .lock()
                .unwrap()
                .entry(db_name.to_string())
                .or_default()
                .insert(display_id(id), document.clone());
            Ok(())
        }
    }

    /// Connector handing out pre-registered in-memory stores by host.
    #[derive(Default)]
    pub(crate) struct MemoryConnector {
        pub(crate) stores: HashMap<HostSpec, Arc<MemoryStore>>,
        pub(crate) connects: Arc<Mutex<Vec<String>>>,
    }

    impl MemoryConnector {
        pub(crate) fn with_store(mut self, host: &str, store: MemoryStore) -> Self {
            self.stores.insert(host.parse().unwrap(), Arc::new(store));
            self
        }

        pub(crate) fn store(&self, host: &str) -> Arc<MemoryStore> {
            Arc::clone(&self.stores[&host.parse::<HostSpec>().unwrap()])
        }
    }

    impl Connector for MemoryConnector {
        fn connect(&self, host: &HostSpec) -> Result<Arc<dyn DocumentStore>> {
            self.connects.lock().unwrap().push(host.to_string());
            match self.stores.get(host) {
                Some(store) => Ok(Arc::clone(store) as Arc<dyn DocumentStore>),
                None => Err(Error::Connect {
                    host: host.to_string(),
                    message: "no route to host".to_string(),
                }),
            }
        }
    }

    pub(crate) fn oid(n: u8) -> ObjectId {
        ObjectId::parse_str(format!("5f1d7c2e9b1e8a00123456{:02x}", n)).unwrap()
    }

    pub(crate) fn page(n: u8, title: &str) -> Document {
        doc! { "_id": oid(n), "title": title }
    }

    fn task(host: &str, ids: &[u8]) -> SourceTask {
        SourceTask::new(
            host.parse().unwrap(),
            PageIdGroup::new(ids.iter().map(|n| oid(*n)).collect()),
        )
    }

    fn fixture() -> (Migrator, Arc<MemoryStore>, Arc<Mutex<Vec<String>>>) {
        let connector = MemoryConnector::default()
            .with_store(
                "10.0.0.1:27017",
                MemoryStore::with_documents("site", vec![page(1, "p1"), page(2, "p2"), page(9, "other")]),
            )
            .with_store(
                "10.0.0.2:27017",
                MemoryStore::with_documents("site", vec![page(3, "p3")]),
            )
            .with_store("10.0.0.9:27017", MemoryStore::default());
        let target = connector.store("10.0.0.9:27017");
        let connects = Arc::clone(&connector.connects);
        let migrator = Migrator::new(ConnectionCache::new(Box::new(connector)));
        (migrator, target, connects)
    }

    #[test]
    fn test_collect_preserves_source_order() {
        let (migrator, _, _) = fixture();
        // Within one source the store decides the order; across sources the
        // task order holds.
        let tasks = vec![task("10.0.0.2:27017", &[3]), task("10.0.0.1:27017", &[2, 1])];

        let mut report = MigrationReport::default();
        let documents = migrator.collect(&tasks, "site", &mut report).unwrap();

        let titles: Vec<&str> = documents
            .iter()
            .map(|d| d.get_str("title").unwrap())
            .collect();
        assert_eq!(titles, vec!["p3", "p1", "p2"]);
        assert_eq!(
            report.fetched,
            vec![("10.0.0.2:27017".to_string(), 1), ("10.0.0.1:27017".to_string(), 2)]
        );
    }

    #[test]
    fn test_migrate_upserts_into_target() {
        let (migrator, target, _) = fixture();
        target
            .upsert_page_setup("site", &page(1, "stale"))
            .unwrap();
        let tasks = vec![task("10.0.0.1:27017", &[1, 2]), task("10.0.0.2:27017", &[3])];

        let report = migrator
            .migrate(&tasks, &"10.0.0.9:27017".parse().unwrap(), "site")
            .unwrap();

        assert_eq!(report.written, 3);
        let titles: Vec<String> = target
            .documents("site")
            .iter()
            .map(|d| d.get_str("title").unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_migrate_twice_is_idempotent() {
        let (migrator, target, _) = fixture();
        let tasks = vec![task("10.0.0.1:27017", &[1, 2]), task("10.0.0.2:27017", &[3])];
        let target_host: HostSpec = "10.0.0.9:27017".parse().unwrap();

        migrator.migrate(&tasks, &target_host, "site").unwrap();
        let first = target.documents("site");
        migrator.migrate(&tasks, &target_host, "site").unwrap();

        assert_eq!(target.documents("site"), first);
    }

    #[test]
    fn test_connections_are_reused_across_runs() {
        let (migrator, _, connects) = fixture();
        let tasks = vec![task("10.0.0.1:27017", &[1]), task("10.0.0.1:27017", &[2])];
        let target_host: HostSpec = "10.0.0.9:27017".parse().unwrap();

        migrator.migrate(&tasks, &target_host, "site").unwrap();
        migrator.migrate(&tasks, &target_host, "site").unwrap();

        assert_eq!(
            *connects.lock().unwrap(),
            vec!["10.0.0.1:27017", "10.0.0.9:27017"]
        );
    }

    #[test]
    fn test_unreachable_source_aborts_before_any_write() {
        let (migrator, target, _) = fixture();
        let tasks = vec![task("10.0.0.1:27017", &[1]), task("10.0.0.5:27017", &[3])];

        let err = migrator
            .migrate(&tasks, &"10.0.0.9:27017".parse().unwrap(), "site")
            .unwrap_err();

        assert!(matches!(err, Error::DataSource { ref host, .. } if host == "10.0.0.5:27017"));
        assert!(target.documents("site").is_empty());
    }

    #[test]
    fn test_unreachable_target_is_a_connect_error() {
        let connector = MemoryConnector::default().with_store(
            "10.0.0.1:27017",
            MemoryStore::with_documents("site", vec![page(1, "p1")]),
        );
        let migrator = Migrator::new(ConnectionCache::new(Box::new(connector)));

        let err = migrator
            .migrate(
                &[task("10.0.0.1:27017", &[1])],
                &"10.0.0.9:27017".parse().unwrap(),
                "site",
            )
            .unwrap_err();

        assert!(matches!(err, Error::Connect { ref host, .. } if host == "10.0.0.9:27017"));
    }

    #[test]
    fn test_failing_read_aborts_before_any_write() {
        let connector = MemoryConnector::default()
            .with_store(
                "10.0.0.1:27017",
                MemoryStore {
                    fail_reads: true,
                    ..MemoryStore::default()
                },
            )
            .with_store("10.0.0.9:27017", MemoryStore::default());
        let target = connector.store("10.0.0.9:27017");
        let migrator = Migrator::new(ConnectionCache::new(Box::new(connector)));

        let err = migrator
            .migrate(
                &[task("10.0.0.1:27017", &[1])],
                &"10.0.0.9:27017".parse().unwrap(),
                "site",
            )
            .unwrap_err();

        assert!(matches!(err, Error::DataSource { .. }));
        assert!(target.documents("site").is_empty());
    }

    #[test]
    fn test_write_failure_names_document_and_keeps_earlier_writes() {
        let connector = MemoryConnector::default()
            .with_store(
                "10.0.0.1:27017",
                MemoryStore::with_documents("site", vec![page(1, "p1"), page(2, "p2"), page(3, "p3")]),
            )
            .with_store(
                "10.0.0.9:27017",
                MemoryStore {
                    fail_write_of: Some(oid(2)),
                    ..MemoryStore::default()
                },
            );
        let target = connector.store("10.0.0.9:27017");
        let migrator = Migrator::new(ConnectionCache::new(Box::new(connector)));

        let err = migrator
            .migrate(
                &[task("10.0.0.1:27017", &[1, 2, 3])],
                &"10.0.0.9:27017".parse().unwrap(),
                "site",
            )
            .unwrap_err();

        match err {
            Error::DataWrite { document_id, .. } => assert_eq!(document_id, oid(2).to_hex()),
            other => panic!("unexpected error: {other:?}"),
        }
        let written = target.documents("site");
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].get_str("title").unwrap(), "p1");
    }

    #[test]
    fn test_missing_ids_are_not_an_error() {
        let (migrator, _, _) = fixture();
        let mut report = MigrationReport::default();

        let documents = migrator
            .collect(&[task("10.0.0.2:27017", &[3, 4])], "site", &mut report)
            .unwrap();

        assert_eq!(documents.len(), 1);
    }
}
