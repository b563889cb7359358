//! Swappable document store with live-subscription semantics.
//!
//! Every trip namespaces one document per collection under the key
//! `{trip_id}_{collection}`; a document is the **whole** collection
//! serialized as JSON (arrays everywhere, a single object for settings).
//! Two interchangeable [`Backend`]s persist those documents: a durable
//! SQLite table ([`LocalBackend`]) and a remote document database
//! ([`RemoteBackend`]). The backend is chosen once at startup and is
//! invisible to callers.
//!
//! [`Store`] layers the subscription contract on top: subscribing to a
//! collection delivers the current snapshot immediately and again after
//! every committed mutation, until the [`Subscription`] is dropped.
//! Subscribers always receive full snapshots, never deltas.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

pub use error::StoreError;
pub use local::LocalBackend;
pub use remote::RemoteBackend;

mod documents;
mod error;
mod local;
mod remote;

pub type StoreResult<T> = Result<T, StoreError>;

/// Reserved key holding the trip directory (not namespaced by trip).
pub const REGISTRY_KEY: &str = "trips_registry";
/// Reserved key remembering the last active trip across restarts.
pub const LAST_TRIP_KEY: &str = "last_trip_id";

/// Per-trip entity collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Settings,
    Itinerary,
    Expenses,
    Users,
    Chat,
    Markers,
}

impl Collection {
    pub const PER_TRIP: [Collection; 6] = [
        Collection::Settings,
        Collection::Itinerary,
        Collection::Expenses,
        Collection::Users,
        Collection::Chat,
        Collection::Markers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Settings => "settings",
            Collection::Itinerary => "itinerary",
            Collection::Expenses => "expenses",
            Collection::Users => "users",
            Collection::Chat => "chat",
            Collection::Markers => "markers",
        }
    }

    /// Snapshot delivered when nothing has been persisted yet.
    pub fn default_value(self) -> Value {
        match self {
            Collection::Settings => Value::Null,
            _ => json!([]),
        }
    }
}

fn storage_key(trip_id: &str, collection: Collection) -> String {
    format!("{trip_id}_{}", collection.as_str())
}

/// Persistence backend contract: whole-document reads and writes.
///
/// Implementations must degrade malformed persisted bytes to `None` rather
/// than erroring; a subscriber must never crash because of bad data.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>>;
    async fn save(&self, key: &str, value: &Value) -> StoreResult<()>;
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

type SnapshotFn = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Channel {
    Collection(Collection),
    Registry,
}

struct Subscriber {
    token: u64,
    callback: SnapshotFn,
}

#[derive(Default)]
struct Inner {
    active_trip: String,
    next_token: u64,
    subscribers: HashMap<Channel, Vec<Subscriber>>,
    /// Last snapshot delivered per channel; the polling change feed uses it
    /// to detect external edits.
    last_seen: HashMap<Channel, Value>,
}

impl Inner {
    fn remove_subscriber(&mut self, channel: Channel, token: u64) {
        if let Some(list) = self.subscribers.get_mut(&channel) {
            list.retain(|s| s.token != token);
        }
    }
}

/// Handle returned by the subscribe operations; dropping it stops all
/// future notifications to that callback. In-flight mutations are not
/// cancelled.
pub struct Subscription {
    inner: Weak<Mutex<Inner>>,
    channel: Channel,
    token: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner).remove_subscriber(self.channel, self.token);
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Document store facade over a [`Backend`].
///
/// Tracks the active trip namespace and fans every committed mutation out to
/// the collection's subscribers. Mutations are serialized by an internal
/// write lock so each subscriber observes snapshots in commit order.
pub struct Store {
    backend: Arc<dyn Backend>,
    inner: Arc<Mutex<Inner>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(Inner::default())),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Restores the active trip persisted by a previous session.
    pub async fn restore_last_trip(&self) {
        let trip = match self.backend.load(LAST_TRIP_KEY).await {
            Ok(Some(Value::String(trip))) => trip,
            Ok(_) => return,
            Err(err) => {
                tracing::warn!("failed to restore last trip: {err}");
                return;
            }
        };
        lock(&self.inner).active_trip = trip;
    }

    pub fn active_trip(&self) -> Option<String> {
        let trip = lock(&self.inner).active_trip.clone();
        if trip.is_empty() { None } else { Some(trip) }
    }

    fn require_trip(&self) -> StoreResult<String> {
        self.active_trip().ok_or(StoreError::NoActiveTrip)
    }

    /// Re-points the namespace and re-fires every active subscription with
    /// the new namespace's current snapshot. Subscriptions are keyed by
    /// collection, not trip, so switching must notify proactively.
    pub async fn switch_trip(&self, trip_id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        lock(&self.inner).active_trip = trip_id.to_string();

        if trip_id.is_empty() {
            self.backend.remove(LAST_TRIP_KEY).await?;
        } else {
            self.backend.save(LAST_TRIP_KEY, &json!(trip_id)).await?;
        }

        for collection in Collection::PER_TRIP {
            let snapshot = self.read_collection(trip_id, collection).await;
            self.notify(Channel::Collection(collection), &snapshot);
        }
        Ok(())
    }

    async fn read_collection(&self, trip_id: &str, collection: Collection) -> Value {
        if trip_id.is_empty() {
            return collection.default_value();
        }
        self.read_key(&storage_key(trip_id, collection), collection.default_value())
            .await
    }

    async fn read_key(&self, key: &str, default: Value) -> Value {
        match self.backend.load(key).await {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                tracing::warn!("failed to read {key}: {err}");
                default
            }
        }
    }

    /// Current snapshot of a collection in the active trip.
    pub async fn snapshot(&self, collection: Collection) -> Value {
        let trip = lock(&self.inner).active_trip.clone();
        self.read_collection(&trip, collection).await
    }

    /// Typed snapshot; malformed data degrades to an empty list.
    pub async fn list<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        decode_list(&self.snapshot(collection).await)
    }

    /// Typed snapshot of a single-object collection (settings).
    pub async fn document<T: DeserializeOwned>(&self, collection: Collection) -> Option<T> {
        decode_document(&self.snapshot(collection).await)
    }

    /// Subscribes to a collection of the active trip.
    ///
    /// The callback is invoked once immediately with the current snapshot
    /// (the default one when nothing is stored) and again after every
    /// committed mutation, until the returned handle is dropped.
    pub async fn subscribe(
        &self,
        collection: Collection,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_channel(Channel::Collection(collection), Arc::new(callback))
            .await
    }

    /// Subscribes to the trip registry.
    pub async fn subscribe_registry(
        &self,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_channel(Channel::Registry, Arc::new(callback))
            .await
    }

    async fn subscribe_channel(&self, channel: Channel, callback: SnapshotFn) -> Subscription {
        // The write lock keeps registration and the initial snapshot
        // atomic with respect to concurrent mutations, so the subscriber's
        // first snapshot is never newer than a later one.
        let _guard = self.write_lock.lock().await;

        let token = {
            let mut inner = lock(&self.inner);
            let token = inner.next_token;
            inner.next_token += 1;
            inner
                .subscribers
                .entry(channel)
                .or_default()
                .push(Subscriber {
                    token,
                    callback: Arc::clone(&callback),
                });
            token
        };

        let snapshot = match channel {
            Channel::Collection(collection) => self.snapshot(collection).await,
            Channel::Registry => self.read_key(REGISTRY_KEY, json!([])).await,
        };
        callback(&snapshot);

        Subscription {
            inner: Arc::downgrade(&self.inner),
            channel,
            token,
        }
    }

    fn notify(&self, channel: Channel, value: &Value) {
        let callbacks: Vec<SnapshotFn> = {
            let mut inner = lock(&self.inner);
            inner.last_seen.insert(channel, value.clone());
            inner
                .subscribers
                .get(&channel)
                .map(|subs| subs.iter().map(|s| Arc::clone(&s.callback)).collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(value);
        }
    }

    /// Adds an item to a collection, assigning it a fresh identifier.
    pub async fn add(&self, collection: Collection, item: Value) -> StoreResult<String> {
        let _guard = self.write_lock.lock().await;
        let trip = self.require_trip()?;
        let key = storage_key(&trip, collection);

        let Value::Object(mut fields) = item else {
            return Err(StoreError::InvalidDocument(
                "collection items must be JSON objects".to_string(),
            ));
        };
        let id = Uuid::new_v4().to_string();
        fields.insert("id".to_string(), json!(id));

        let mut snapshot = self.read_key(&key, json!([])).await;
        let items = as_array(&mut snapshot);
        items.push(Value::Object(fields));

        self.backend.save(&key, &snapshot).await?;
        self.notify(Channel::Collection(collection), &snapshot);
        Ok(id)
    }

    /// Merges partial fields into the record matching `id`; no-op (and no
    /// notification) when the record does not exist.
    pub async fn update(&self, collection: Collection, id: &str, partial: Value) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let trip = self.require_trip()?;
        let key = storage_key(&trip, collection);

        let Value::Object(partial) = partial else {
            return Err(StoreError::InvalidDocument(
                "updates must be JSON objects".to_string(),
            ));
        };

        let mut snapshot = self.read_key(&key, json!([])).await;
        let mut matched = false;
        for item in as_array(&mut snapshot).iter_mut() {
            let Some(fields) = item.as_object_mut() else {
                continue;
            };
            if fields.get("id").and_then(Value::as_str) == Some(id) {
                for (name, value) in &partial {
                    fields.insert(name.clone(), value.clone());
                }
                matched = true;
            }
        }
        if !matched {
            return Ok(());
        }

        self.backend.save(&key, &snapshot).await?;
        self.notify(Channel::Collection(collection), &snapshot);
        Ok(())
    }

    /// Removes the record matching `id`; no-op when it does not exist.
    pub async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let trip = self.require_trip()?;
        let key = storage_key(&trip, collection);

        let mut snapshot = self.read_key(&key, json!([])).await;
        let items = as_array(&mut snapshot);
        let before = items.len();
        items.retain(|item| item.get("id").and_then(Value::as_str) != Some(id));
        if items.len() == before {
            return Ok(());
        }

        self.backend.save(&key, &snapshot).await?;
        self.notify(Channel::Collection(collection), &snapshot);
        Ok(())
    }

    /// Replaces the whole collection document (settings writes, marker
    /// clearing, chat capping, import).
    pub async fn replace(&self, collection: Collection, value: Value) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let trip = self.require_trip()?;
        self.replace_in(&trip, collection, value).await
    }

    /// Replaces a collection document of an explicit trip namespace.
    ///
    /// Import targets a freshly allocated trip before switching to it, so it
    /// cannot go through the active namespace. Only subscribers of the
    /// active trip are notified.
    pub async fn replace_in(
        &self,
        trip_id: &str,
        collection: Collection,
        value: Value,
    ) -> StoreResult<()> {
        self.backend
            .save(&storage_key(trip_id, collection), &value)
            .await?;
        if lock(&self.inner).active_trip == trip_id {
            self.notify(Channel::Collection(collection), &value);
        }
        Ok(())
    }

    /// Current trip directory.
    pub async fn registry(&self) -> Value {
        self.read_key(REGISTRY_KEY, json!([])).await
    }

    pub async fn write_registry(&self, value: Value) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.backend.save(REGISTRY_KEY, &value).await?;
        self.notify(Channel::Registry, &value);
        Ok(())
    }

    /// Deletes every namespaced document of a trip.
    pub async fn remove_trip(&self, trip_id: &str) -> StoreResult<()> {
        for collection in Collection::PER_TRIP {
            self.backend
                .remove(&storage_key(trip_id, collection))
                .await?;
        }
        Ok(())
    }

    /// Spawns the polling change feed.
    ///
    /// Remote documents can change underneath us (another device writing to
    /// the same trip); the feed re-reads every subscribed channel and
    /// notifies when the snapshot differs from the last one delivered.
    /// At-least-once delivery of full snapshots, never deltas.
    pub fn spawn_change_feed(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                store.poll_changes().await;
            }
        })
    }

    async fn poll_changes(&self) {
        let channels: Vec<Channel> = {
            let inner = lock(&self.inner);
            inner
                .subscribers
                .iter()
                .filter(|(_, subs)| !subs.is_empty())
                .map(|(channel, _)| *channel)
                .collect()
        };

        for channel in channels {
            let _guard = self.write_lock.lock().await;
            let snapshot = match channel {
                Channel::Collection(collection) => self.snapshot(collection).await,
                Channel::Registry => self.read_key(REGISTRY_KEY, json!([])).await,
            };
            let changed = lock(&self.inner).last_seen.get(&channel) != Some(&snapshot);
            if changed {
                self.notify(channel, &snapshot);
            }
        }
    }
}

fn as_array(snapshot: &mut Value) -> &mut Vec<Value> {
    if !snapshot.is_array() {
        *snapshot = json!([]);
    }
    match snapshot.as_array_mut() {
        Some(items) => items,
        // Unreachable: the document was just coerced to an array.
        None => unreachable!("document coerced to array"),
    }
}

/// Decodes a collection snapshot, degrading malformed data to empty.
pub fn decode_list<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    match serde_json::from_value(value.clone()) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!("discarding undecodable collection snapshot: {err}");
            Vec::new()
        }
    }
}

/// Decodes a single-object snapshot (settings), degrading to `None`.
pub fn decode_document<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(document) => Some(document),
        Err(err) => {
            tracing::warn!("discarding undecodable document snapshot: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::MigratorTrait;
    use sea_orm::Database;

    async fn local_store() -> Arc<Store> {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let store = Arc::new(Store::new(Arc::new(LocalBackend::new(db))));
        store.switch_trip("trip_test").await.unwrap();
        store
    }

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl Fn(&Value) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &Value| {
            sink.lock().unwrap().push(value.clone());
        })
    }

    #[tokio::test]
    async fn add_then_snapshot_includes_item() {
        let store = local_store().await;
        let id = store
            .add(Collection::Users, json!({"name": "Alice"}))
            .await
            .unwrap();

        let snapshot = store.snapshot(Collection::Users).await;
        let items = snapshot.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], json!(id));
        assert_eq!(items[0]["name"], json!("Alice"));

        store.delete(Collection::Users, &id).await.unwrap();
        assert_eq!(store.snapshot(Collection::Users).await, json!([]));
    }

    #[tokio::test]
    async fn update_merges_fields_and_skips_missing_ids() {
        let store = local_store().await;
        let id = store
            .add(Collection::Itinerary, json!({"activity": "Museum", "day": 1}))
            .await
            .unwrap();

        store
            .update(Collection::Itinerary, &id, json!({"day": 2}))
            .await
            .unwrap();
        let snapshot = store.snapshot(Collection::Itinerary).await;
        assert_eq!(snapshot[0]["activity"], json!("Museum"));
        assert_eq!(snapshot[0]["day"], json!(2));

        // Unknown id: no-op, no error.
        store
            .update(Collection::Itinerary, "missing", json!({"day": 9}))
            .await
            .unwrap();
        assert_eq!(store.snapshot(Collection::Itinerary).await, snapshot);
    }

    #[tokio::test]
    async fn subscribe_delivers_immediately_and_after_mutations() {
        let store = local_store().await;
        let (seen, callback) = recorder();
        let subscription = store.subscribe(Collection::Users, callback).await;

        assert_eq!(seen.lock().unwrap().as_slice(), &[json!([])]);

        store
            .add(Collection::Users, json!({"name": "Bob"}))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);

        subscription.unsubscribe();
        store
            .add(Collection::Users, json!({"name": "Cara"}))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn all_subscribers_are_notified() {
        let store = local_store().await;
        let (first, first_cb) = recorder();
        let (second, second_cb) = recorder();
        let _a = store.subscribe(Collection::Expenses, first_cb).await;
        let _b = store.subscribe(Collection::Expenses, second_cb).await;

        store
            .add(Collection::Expenses, json!({"amount": 10}))
            .await
            .unwrap();

        assert_eq!(first.lock().unwrap().len(), 2);
        assert_eq!(second.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mutations_without_active_trip_fail() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let store = Store::new(Arc::new(LocalBackend::new(db)));

        let err = store
            .add(Collection::Users, json!({"name": "Alice"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoActiveTrip));

        // Reads still deliver defaults.
        assert_eq!(store.snapshot(Collection::Users).await, json!([]));
        assert_eq!(store.snapshot(Collection::Settings).await, Value::Null);
    }

    #[tokio::test]
    async fn switch_trip_refires_subscriptions_with_new_namespace() {
        let store = local_store().await;
        store
            .add(Collection::Users, json!({"name": "Alice"}))
            .await
            .unwrap();

        let (seen, callback) = recorder();
        let _sub = store.subscribe(Collection::Users, callback).await;
        assert_eq!(seen.lock().unwrap().len(), 1);

        store.switch_trip("trip_other").await.unwrap();
        let snapshots = seen.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        // Old namespace had one user, the new one is empty.
        assert_eq!(snapshots[1], json!([]));
    }

    #[tokio::test]
    async fn malformed_persisted_bytes_degrade_to_default() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let backend = LocalBackend::new(db.clone());

        use sea_orm::{ActiveValue, EntityTrait};
        let row = documents::ActiveModel {
            key: ActiveValue::Set("trip_test_users".to_string()),
            value: ActiveValue::Set("{not json".to_string()),
            updated_at: ActiveValue::Set(chrono::Utc::now().fixed_offset()),
        };
        documents::Entity::insert(row).exec(&db).await.unwrap();

        let store = Store::new(Arc::new(backend));
        store.switch_trip("trip_test").await.unwrap();
        assert_eq!(store.snapshot(Collection::Users).await, json!([]));
    }

    #[tokio::test]
    async fn typed_decoding_skips_malformed_snapshots() {
        #[derive(serde::Deserialize)]
        struct Named {
            #[allow(dead_code)]
            name: String,
        }

        let well_formed = json!([{"name": "Alice"}]);
        assert_eq!(decode_list::<Named>(&well_formed).len(), 1);

        let malformed = json!([{"name": 42}]);
        assert!(decode_list::<Named>(&malformed).is_empty());
        assert!(decode_document::<Named>(&Value::Null).is_none());
    }
}
