//! StateManager - actor that owns the coordination store
//!
//! Processes commands via channels so every controller and worker task
//! shares one store handle. The store is synchronous (SQLite may wait on
//! another process's lock), so the actor runs on the blocking pool.

use docstore::{CoordinationStore, Document, Filter, Record, Update};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over an opened store
    pub fn spawn(store: impl CoordinationStore + 'static) -> Self {
        Self::spawn_boxed(Box::new(store))
    }

    pub fn spawn_boxed(store: Box<dyn CoordinationStore>) -> Self {
        debug!("spawn: called");
        let (tx, rx) = mpsc::channel(256);

        tokio::task::spawn_blocking(move || actor_loop(store, rx));

        info!("StateManager spawned");
        Self { tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Generic document operations ===

    /// Insert one document, returning its identity
    pub async fn insert(&self, collection: &str, doc: Document) -> StateResponse<String> {
        debug!(%collection, "insert: called");
        self.request(|reply| StateCommand::Insert {
            collection: collection.to_string(),
            doc,
            reply,
        })
        .await
    }

    pub async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StateResponse<Vec<String>> {
        debug!(%collection, count = docs.len(), "insert_many: called");
        self.request(|reply| StateCommand::InsertMany {
            collection: collection.to_string(),
            docs,
            reply,
        })
        .await
    }

    pub async fn find(&self, collection: &str, filters: Vec<Filter>) -> StateResponse<Vec<Document>> {
        debug!(%collection, ?filters, "find: called");
        self.request(|reply| StateCommand::Find {
            collection: collection.to_string(),
            filters,
            reply,
        })
        .await
    }

    /// Atomically update the first match, returning it as it was before
    pub async fn find_one_and_update(
        &self,
        collection: &str,
        filters: Vec<Filter>,
        update: Update,
    ) -> StateResponse<Option<Document>> {
        debug!(%collection, ?filters, "find_one_and_update: called");
        self.request(|reply| StateCommand::FindOneAndUpdate {
            collection: collection.to_string(),
            filters,
            update,
            reply,
        })
        .await
    }

    pub async fn update_one(&self, collection: &str, filters: Vec<Filter>, update: Update) -> StateResponse<bool> {
        debug!(%collection, ?filters, "update_one: called");
        self.request(|reply| StateCommand::UpdateOne {
            collection: collection.to_string(),
            filters,
            update,
            reply,
        })
        .await
    }

    pub async fn delete_many(&self, collection: &str, filters: Vec<Filter>) -> StateResponse<usize> {
        debug!(%collection, ?filters, "delete_many: called");
        self.request(|reply| StateCommand::DeleteMany {
            collection: collection.to_string(),
            filters,
            reply,
        })
        .await
    }

    // === Typed record helpers ===

    pub(crate) async fn insert_record<R: Record>(&self, record: &R) -> StateResponse<String> {
        let doc = record.to_document()?;
        self.insert(R::collection_name(), doc).await
    }

    pub(crate) async fn insert_records<R: Record>(&self, records: &[R]) -> StateResponse<Vec<String>> {
        let docs = records
            .iter()
            .map(R::to_document)
            .collect::<Result<Vec<_>, _>>()?;
        self.insert_many(R::collection_name(), docs).await
    }

    pub(crate) async fn find_records<R: Record>(&self, filters: Vec<Filter>) -> StateResponse<Vec<R>> {
        self.find(R::collection_name(), filters)
            .await?
            .into_iter()
            .map(|doc| R::from_document(doc).map_err(StateError::from))
            .collect()
    }

    pub(crate) async fn find_record<R: Record>(&self, id: &str) -> StateResponse<Option<R>> {
        Ok(self
            .find_records::<R>(vec![Filter::eq(docstore::ID_FIELD, id)])
            .await?
            .into_iter()
            .next())
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> StateResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// Actor loop that processes commands
fn actor_loop(store: Box<dyn CoordinationStore>, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: called");

    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            StateCommand::Insert { collection, doc, reply } => {
                debug!(%collection, "actor_loop: Insert command");
                let _ = reply.send(store.insert(&collection, doc).map_err(StateError::from));
            }

            StateCommand::InsertMany {
                collection,
                docs,
                reply,
            } => {
                debug!(%collection, count = docs.len(), "actor_loop: InsertMany command");
                let _ = reply.send(store.insert_many(&collection, docs).map_err(StateError::from));
            }

            StateCommand::Find {
                collection,
                filters,
                reply,
            } => {
                debug!(%collection, "actor_loop: Find command");
                let result = store
                    .find(&collection, &filters)
                    .map(|cursor| cursor.collect())
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::FindOneAndUpdate {
                collection,
                filters,
                update,
                reply,
            } => {
                debug!(%collection, "actor_loop: FindOneAndUpdate command");
                let result = store
                    .find_one_and_update(&collection, &filters, &update)
                    .map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::UpdateOne {
                collection,
                filters,
                update,
                reply,
            } => {
                debug!(%collection, "actor_loop: UpdateOne command");
                let result = store.update_one(&collection, &filters, &update).map_err(StateError::from);
                let _ = reply.send(result);
            }

            StateCommand::DeleteMany {
                collection,
                filters,
                reply,
            } => {
                debug!(%collection, "actor_loop: DeleteMany command");
                let _ = reply.send(store.delete_many(&collection, &filters).map_err(StateError::from));
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("actor_loop: exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::MemoryStore;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_state_manager_document_crud() {
        let manager = StateManager::spawn(MemoryStore::new());

        // Insert
        let id = manager
            .insert("workers", doc(json!({"id": "w1", "status": "new"})))
            .await
            .unwrap();
        assert_eq!(id, "w1");

        // Find
        let found = manager.find("workers", vec![Filter::eq("status", "new")]).await.unwrap();
        assert_eq!(found.len(), 1);

        // Update
        let matched = manager
            .update_one("workers", vec![Filter::eq("id", "w1")], Update::new().set("status", "idle"))
            .await
            .unwrap();
        assert!(matched);
        let found = manager.find("workers", vec![Filter::eq("status", "idle")]).await.unwrap();
        assert_eq!(found.len(), 1);

        // Delete
        assert_eq!(manager.delete_many("workers", vec![]).await.unwrap(), 1);
        assert!(manager.find("workers", vec![]).await.unwrap().is_empty());

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_find_one_and_update_returns_previous_state() {
        let manager = StateManager::spawn(MemoryStore::new());
        manager
            .insert("jobs", doc(json!({"id": "a", "status": "unassigned"})))
            .await
            .unwrap();

        let before = manager
            .find_one_and_update(
                "jobs",
                vec![Filter::eq("status", "unassigned")],
                Update::new().set("status", "pending"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before["status"], "unassigned");

        let again = manager
            .find_one_and_update(
                "jobs",
                vec![Filter::eq("status", "unassigned")],
                Update::new().set("status", "pending"),
            )
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_commands_after_shutdown_fail_with_channel_error() {
        let manager = StateManager::spawn(MemoryStore::new());
        manager.shutdown().await.unwrap();

        // the actor drops its receiver once it processes Shutdown
        let mut result = manager.find("jobs", vec![]).await;
        for _ in 0..10 {
            if result.is_err() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            result = manager.find("jobs", vec![]).await;
        }
        assert!(matches!(result, Err(StateError::ChannelError)));
    }
}
