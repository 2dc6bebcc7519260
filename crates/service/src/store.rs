//! Load / update / save cycle over one remote collection blob.
//!
//! The occupancy flag stored in the envelope is advisory. `update` polls
//! until it reads `occupied = false`, then writes `true`, then writes the
//! new collection with `false`. Two clients can both read `false` and both
//! proceed (lost update), and a client that dies between the two writes
//! leaves the flag set for everyone; `release` clears it by hand.

use std::marker::PhantomData;
use std::sync::Arc;

use models::envelope::{self, Snapshot};
use models::{apply_patch, Applied, CollectionItem, CollectionKey, ItemId, Operator, Patch};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::StoreError;
use crate::retry::{retry_while_busy, Attempt, RetryError, RetryPolicy};
use crate::transport::OnoTransport;

pub struct RemoteCollectionStore<T: CollectionItem> {
    transport: Arc<dyn OnoTransport>,
    key: CollectionKey,
    retry: RetryPolicy,
    operator: Operator,
    _item: PhantomData<fn() -> T>,
}

impl<T: CollectionItem> Clone for RemoteCollectionStore<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            key: self.key.clone(),
            retry: self.retry.clone(),
            operator: self.operator.clone(),
            _item: PhantomData,
        }
    }
}

impl<T: CollectionItem> RemoteCollectionStore<T> {
    pub fn new(
        transport: Arc<dyn OnoTransport>,
        key: CollectionKey,
        retry: RetryPolicy,
        operator: Operator,
    ) -> Self {
        Self { transport, key, retry, operator, _item: PhantomData }
    }

    pub fn key(&self) -> &CollectionKey {
        &self.key
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch and decode the collection. Any failure is logged and turned into `None`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use models::{CollectionKey, Group, Operator};
    /// use service::retry::RetryPolicy;
    /// use service::store::RemoteCollectionStore;
    /// use service::transport::mock::{MockOnoTransport, Scripted};
    ///
    /// let key = CollectionKey::new("note_test", "groups");
    /// let mock = Arc::new(MockOnoTransport::new().with_blob(&key, r#"[[{"id":1,"title":"A"}],[{"isOccupied":false}]]"#));
    /// let store = RemoteCollectionStore::<Group>::new(mock.clone(), key, RetryPolicy::default(), Operator::default());
    ///
    /// let snapshot = tokio_test::block_on(store.load()).unwrap();
    /// assert_eq!(snapshot.items[0].title, "A");
    ///
    /// mock.push_get(Scripted::Fail("connection refused".into()));
    /// assert!(tokio_test::block_on(store.load()).is_none());
    /// ```
    pub async fn load(&self) -> Option<Snapshot<T>> {
        match self.try_load().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!(collection = T::KIND, key = %self.key, code = e.code(), error = %e, "error loading collection");
                None
            }
        }
    }

    /// Fetch and decode the collection, surfacing the cause on failure.
    #[instrument(skip(self), fields(collection = T::KIND, key = %self.key))]
    pub async fn try_load(&self) -> Result<Snapshot<T>, StoreError> {
        let raw = self.transport.get_app_data(&self.key).await?;
        let snapshot = envelope::decode::<T>(raw.as_deref())?;
        debug!(items = snapshot.items.len(), occupied = snapshot.occupied, "loaded collection");
        Ok(snapshot)
    }

    /// Overwrite the remote blob with `items` and the given flag.
    #[instrument(skip(self, items), fields(collection = T::KIND, key = %self.key, items = items.len()))]
    pub async fn save(&self, items: &[T], occupied: bool) -> Result<(), StoreError> {
        let data_value = envelope::encode(items, occupied)?;
        self.transport.set_app_data(&self.key, data_value).await.map_err(|e| {
            error!(code = e.code(), error = %e, occupied, "error saving collection");
            e
        })?;
        debug!(occupied, "saved collection");
        Ok(())
    }

    /// Save loosely typed entries: `null` and malformed values are dropped,
    /// the rest are projected onto `T` first.
    pub async fn save_raw(&self, entries: Vec<Value>, occupied: bool) -> Result<(), StoreError> {
        let items = envelope::project_entries::<T>(entries);
        self.save(&items, occupied).await
    }

    /// Upsert one item by id under the occupancy convention.
    ///
    /// Waits while the collection is occupied (bounded by the retry policy),
    /// marks it occupied, then writes the merged collection with the flag
    /// cleared. Returns what was written.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use models::{CollectionKey, Group, ItemId, Operator};
    /// use service::retry::RetryPolicy;
    /// use service::store::RemoteCollectionStore;
    /// use service::transport::mock::MockOnoTransport;
    ///
    /// let key = CollectionKey::new("note_test", "groups");
    /// let mock = Arc::new(MockOnoTransport::new().with_blob(&key, r#"[[{"id":1,"title":"A"}],[{"isOccupied":false}]]"#));
    /// let store = RemoteCollectionStore::<Group>::new(mock.clone(), key, RetryPolicy::default(), Operator::default());
    ///
    /// let patch = serde_json::json!({"id": 1, "title": "B"}).as_object().cloned().unwrap();
    /// let written = tokio_test::block_on(store.update(&ItemId::Number(1), &patch)).unwrap();
    /// assert_eq!(written.items, vec![Group::new(1, "B")]);
    /// assert!(!written.occupied);
    /// ```
    #[instrument(skip(self, id, patch), fields(collection = T::KIND, key = %self.key, id = %id, operator = %self.operator.display_name()))]
    pub async fn update(&self, id: &ItemId, patch: &Patch) -> Result<Snapshot<T>, StoreError> {
        let current = self.wait_until_free().await?;

        let mut items = current.items.clone();
        let applied = apply_patch(&mut items, id, patch)?;

        self.save(&current.items, true).await?;
        if let Err(e) = self.save(&items, false).await {
            warn!(error = %e, "collection left marked occupied; run release to clear it");
            return Err(e);
        }

        match applied {
            Applied::Merged { index } => info!(index, "item updated"),
            Applied::Appended { index } => info!(index, "item appended"),
        }
        Ok(Snapshot::new(items, false))
    }

    /// Typed upsert: the whole item is used as the patch.
    pub async fn upsert(&self, item: &T) -> Result<Snapshot<T>, StoreError> {
        let patch = item.to_patch()?;
        self.update(item.id(), &patch).await
    }

    /// Rewrite the current items with the flag cleared, whatever its state.
    #[instrument(skip(self), fields(collection = T::KIND, key = %self.key, operator = %self.operator.display_name()))]
    pub async fn release(&self) -> Result<Snapshot<T>, StoreError> {
        let current = self.try_load().await.map_err(|e| self.load_failed(e))?;
        if !current.occupied {
            debug!("collection already free");
        }
        self.save(&current.items, false).await?;
        info!(was_occupied = current.occupied, "occupancy released");
        Ok(Snapshot::new(current.items, false))
    }

    async fn wait_until_free(&self) -> Result<Snapshot<T>, StoreError> {
        let res = retry_while_busy(&self.retry, || async {
            let snapshot = self.try_load().await?;
            if snapshot.occupied {
                warn!(collection = T::KIND, key = %self.key, "collection is occupied, retrying");
                return Ok::<_, StoreError>(Attempt::Busy);
            }
            Ok(Attempt::Ready(snapshot))
        })
        .await;

        match res {
            Ok(snapshot) => Ok(snapshot),
            Err(RetryError::Failed(e)) => Err(self.load_failed(e)),
            Err(RetryError::Exhausted { attempts }) => {
                error!(collection = T::KIND, key = %self.key, attempts, "collection stayed occupied");
                Err(StoreError::OccupiedTimeout { collection: T::KIND, attempts })
            }
        }
    }

    fn load_failed(&self, source: StoreError) -> StoreError {
        StoreError::LoadFailed { collection: T::KIND, source: Box::new(source) }
    }
}
