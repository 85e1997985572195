//! Client facade.
//!
//! The menus reach the store and the replication session only through
//! this facade; nothing else may close or reconfigure them.

use crate::error::{ClientError, ClientResult};
use caravel_store::{Collection, Document, Store};
use caravel_sync::{ActivityLevel, Coordinator};
use parking_lot::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Channels stamped onto demo documents.
const DEFAULT_CHANNELS: [&str; 3] = ["channel1", "channel2", "blue"];

/// How long replication state changes may take before the client reports
/// a timeout to the operator.
const REPLICATION_WAIT: Duration = Duration::from_secs(30);

/// The console client: one store, one replication coordinator.
pub struct Client {
    store: Store,
    coordinator: Coordinator,
    scope: String,
    selected: RwLock<String>,
}

impl Client {
    /// Creates a client and wires the quiescent-count log.
    ///
    /// The working collection starts as the first collection in the
    /// scope; a scope with no collections is a configuration error.
    pub fn new(store: Store, coordinator: Coordinator, scope: String) -> ClientResult<Self> {
        let collections = store.collections_in_scope(&scope)?;
        let first = collections
            .first()
            .ok_or_else(|| {
                ClientError::Config(format!("scope `{scope}` has no collections configured"))
            })?
            .name()
            .to_string();

        // Whenever the session goes quiescent, log how much we hold
        // locally; mirrors what an operator watches during a demo.
        let handles = collections.clone();
        coordinator.set_quiescent_observer(Box::new(move |level| {
            let total: u64 = handles.iter().filter_map(|c| c.count().ok()).sum();
            tracing::info!(%level, total, "documents in the local store");
        }));

        Ok(Self {
            store,
            coordinator,
            scope,
            selected: RwLock::new(first),
        })
    }

    /// Returns the scope name.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the collections in the client's scope, ordered by name.
    pub fn collections(&self) -> ClientResult<Vec<Collection>> {
        Ok(self.store.collections_in_scope(&self.scope)?)
    }

    /// Returns the name of the working collection.
    pub fn selected_name(&self) -> String {
        self.selected.read().clone()
    }

    /// Returns the working collection handle.
    pub fn selected_collection(&self) -> ClientResult<Collection> {
        let name = self.selected_name();
        Ok(self.store.collection(&self.scope, &name)?)
    }

    /// Changes the working collection. The collection must exist.
    pub fn select_collection(&self, name: &str) -> ClientResult<()> {
        self.store.collection(&self.scope, name)?;
        *self.selected.write() = name.to_string();
        tracing::info!(collection = %name, "working collection changed");
        Ok(())
    }

    /// Total documents across the scope.
    pub fn count(&self) -> ClientResult<u64> {
        let mut total = 0;
        for collection in self.collections()? {
            total += collection.count()?;
        }
        Ok(total)
    }

    /// Per-collection document counts, ordered by name.
    pub fn count_per_collection(&self) -> ClientResult<Vec<(String, u64)>> {
        let mut counts = Vec::new();
        for collection in self.collections()? {
            counts.push((collection.full_name(), collection.count()?));
        }
        Ok(counts)
    }

    /// Prints every document of one collection, ordered by id.
    pub fn print_collection(&self, collection: &Collection) -> ClientResult<()> {
        let docs = collection.find_all()?;
        println!(
            "Found {} documents in `{}`:",
            docs.len(),
            collection.full_name()
        );
        for doc in docs {
            println!(" - {}", doc.to_json());
        }
        Ok(())
    }

    /// Prints every document in the scope.
    pub fn print_all(&self) -> ClientResult<()> {
        for collection in self.collections()? {
            self.print_collection(&collection)?;
        }
        Ok(())
    }

    /// Creates a batch of demo documents in the working collection.
    ///
    /// Ids continue the `test:NNNNN` sequence from the collection's
    /// current count.
    pub fn create_documents(&self, count: usize) -> ClientResult<Vec<String>> {
        let collection = self.selected_collection()?;
        let mut seq = collection.count()? + 1;
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let id = format!("test:{seq:05}");
            let mut doc = Document::new(&id);
            doc.set_string("rfid", "123456789")
                .set_string("type", collection.name())
                .set_string_array("channels", DEFAULT_CHANNELS)
                .set_string_array("destination", DEFAULT_CHANNELS);
            collection.save(doc)?;
            tracing::info!(%id, collection = %collection.full_name(), "created document");
            created.push(id);
            seq += 1;
        }
        Ok(created)
    }

    /// Updates `myproperty` on a document in the working collection.
    ///
    /// Returns false when the document does not exist.
    pub fn update_document(&self, id: &str) -> ClientResult<bool> {
        let collection = self.selected_collection()?;
        match collection.get(id)? {
            Some(mut doc) => {
                let value = format!("value {}", unix_millis());
                doc.set_string("myproperty", &value);
                collection.save(doc)?;
                tracing::info!(%id, %value, "updated document");
                Ok(true)
            }
            None => {
                tracing::info!(%id, "document not found");
                Ok(false)
            }
        }
    }

    /// Returns true while the replication session is active.
    pub fn is_replicating(&self) -> bool {
        self.coordinator.is_active()
    }

    /// Starts replication and waits until it settles.
    ///
    /// A continuous session settles at `IDLE`; a one-shot session runs
    /// to `STOPPED`.
    pub fn start_replication(&self) -> ClientResult<()> {
        self.coordinator.start()?;
        if self.coordinator.continuous() {
            self.coordinator
                .await_state(ActivityLevel::Idle, REPLICATION_WAIT)?;
        } else {
            // The cached level is Stopped until the session emits its
            // first event; wait for Connecting before waiting for the
            // final Stopped so the start is not mistaken for the end.
            self.coordinator
                .await_state(ActivityLevel::Connecting, REPLICATION_WAIT)?;
            self.coordinator
                .await_state(ActivityLevel::Stopped, REPLICATION_WAIT)?;
        }
        Ok(())
    }

    /// Stops replication and waits until the stop is observed.
    pub fn stop_replication(&self) -> ClientResult<()> {
        self.coordinator.stop()?;
        self.coordinator
            .await_state(ActivityLevel::Stopped, REPLICATION_WAIT)?;
        Ok(())
    }

    /// Closes the coordinator, the session, and the store.
    pub fn close(&self) -> ClientResult<()> {
        self.coordinator.close()?;
        self.store.close()?;
        Ok(())
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_store::{runtime, StoreConfig};
    use caravel_sync::{
        AuthCredential, LoopbackSession, PartitionFilter, SessionConfig, StopPolicy, SyncEndpoint,
        SyncSession,
    };
    use std::sync::Arc;

    fn demo_client(dir: &std::path::Path) -> Client {
        runtime::initialize();
        let store = Store::open(StoreConfig::new("demo", dir)).unwrap();
        store.create_collection("retail", "inventory").unwrap();
        store.create_collection("retail", "shipments").unwrap();

        let config = SessionConfig::new(
            SyncEndpoint::parse("ws://127.0.0.1:4984/db").unwrap(),
            AuthCredential::new("userdb1", "Password1!"),
        )
        .with_continuous(true)
        .with_collections(vec![PartitionFilter::replicate_all("inventory")]);
        let session = Arc::new(
            LoopbackSession::new(config).with_step(Duration::from_millis(10)),
        );
        let coordinator = Coordinator::new(session as Arc<dyn SyncSession>, StopPolicy::Halt);

        Client::new(store, coordinator, "retail".into()).unwrap()
    }

    #[test]
    fn selects_first_collection_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let client = demo_client(tmp.path());
        assert_eq!(client.selected_name(), "inventory");

        client.select_collection("shipments").unwrap();
        assert_eq!(client.selected_name(), "shipments");

        assert!(client.select_collection("returns").is_err());
        assert_eq!(client.selected_name(), "shipments");
        client.close().unwrap();
    }

    #[test]
    fn create_and_update_documents() {
        let tmp = tempfile::tempdir().unwrap();
        let client = demo_client(tmp.path());

        let created = client.create_documents(6).unwrap();
        assert_eq!(created[0], "test:00001");
        assert_eq!(created[5], "test:00006");
        assert_eq!(client.count().unwrap(), 6);

        assert!(client.update_document("test:00003").unwrap());
        assert!(!client.update_document("test:99999").unwrap());

        let doc = client
            .selected_collection()
            .unwrap()
            .get("test:00003")
            .unwrap()
            .unwrap();
        assert!(doc.get_str("myproperty").unwrap().starts_with("value "));
        client.close().unwrap();
    }

    #[test]
    fn counts_cover_the_whole_scope() {
        let tmp = tempfile::tempdir().unwrap();
        let client = demo_client(tmp.path());

        client.create_documents(2).unwrap();
        client.select_collection("shipments").unwrap();
        client.create_documents(3).unwrap();

        assert_eq!(client.count().unwrap(), 5);
        let counts = client.count_per_collection().unwrap();
        assert_eq!(
            counts,
            vec![
                ("retail.inventory".to_string(), 2),
                ("retail.shipments".to_string(), 3),
            ]
        );
        client.close().unwrap();
    }

    #[test]
    fn replication_toggle_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let client = demo_client(tmp.path());

        assert!(!client.is_replicating());
        client.start_replication().unwrap();
        assert!(client.is_replicating());

        client.stop_replication().unwrap();
        assert!(!client.is_replicating());
        client.close().unwrap();
    }
}
