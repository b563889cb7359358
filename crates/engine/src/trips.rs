//! Trip lifecycle: registry, switching, deletion, export and import.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::{Collection, StoreError, Subscription};
use uuid::Uuid;

use crate::records::{
    ChatMessage, Expense, ItineraryItem, MapMarker, TripMetadata, TripSettings, User,
};
use crate::{Engine, EngineError, ResultEngine};

/// Version tag written into exported documents.
pub const EXPORT_VERSION: &str = "v2";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub id: String,
    pub version: String,
}

/// Serialized snapshot of a whole trip.
///
/// Import tolerates absent top-level keys (treated as "no data for that
/// collection"); anything that is not a JSON object of this rough shape is
/// rejected outright.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TripExport {
    #[serde(default)]
    pub metadata: Option<ExportMetadata>,
    #[serde(default)]
    pub settings: Option<TripSettings>,
    #[serde(default)]
    pub itinerary: Vec<ItineraryItem>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
    #[serde(default)]
    pub markers: Vec<MapMarker>,
}

fn new_trip_id() -> String {
    format!("trip_{}", Uuid::new_v4().simple())
}

impl Engine {
    /// The trip directory, independent of the active trip.
    pub async fn trips(&self) -> Vec<TripMetadata> {
        store::decode_list(&self.store.registry().await)
    }

    /// Subscribes to the trip directory.
    pub async fn subscribe_trips(
        &self,
        callback: impl Fn(Vec<TripMetadata>) + Send + Sync + 'static,
    ) -> Subscription {
        self.store
            .subscribe_registry(move |value| callback(store::decode_list(value)))
            .await
    }

    pub fn active_trip(&self) -> Option<String> {
        self.store.active_trip()
    }

    /// Switches the active namespace to a registered trip. Every active
    /// collection subscription is re-fired with the new namespace's data.
    pub async fn switch_trip(&self, trip_id: &str) -> ResultEngine<()> {
        if !self.trips().await.iter().any(|trip| trip.id == trip_id) {
            return Err(EngineError::KeyNotFound(trip_id.to_string()));
        }
        self.store.switch_trip(trip_id).await?;
        Ok(())
    }

    /// Saves the trip settings, lazily allocating the trip id on the first
    /// save, and upserts the registry entry.
    pub async fn update_settings(&self, settings: &TripSettings) -> ResultEngine<()> {
        let trip_id = match self.store.active_trip() {
            Some(trip_id) => trip_id,
            None => {
                let trip_id = new_trip_id();
                self.store.switch_trip(&trip_id).await?;
                trip_id
            }
        };

        self.store
            .replace(Collection::Settings, serde_json::to_value(settings)?)
            .await?;

        let mut registry = self.trips().await;
        let entry = TripMetadata {
            id: trip_id.clone(),
            destination: settings.destination.clone(),
            start_date: settings.start_date.clone(),
            end_date: settings.end_date.clone(),
        };
        match registry.iter_mut().find(|trip| trip.id == trip_id) {
            Some(slot) => *slot = entry,
            None => registry.push(entry),
        }
        self.store
            .write_registry(serde_json::to_value(registry)?)
            .await?;
        Ok(())
    }

    /// Removes a trip and all its namespaced records. Deleting the active
    /// trip falls back to the first remaining registered trip, or to the
    /// empty state when none is left.
    pub async fn delete_trip(&self, trip_id: &str) -> ResultEngine<()> {
        let mut registry = self.trips().await;
        registry.retain(|trip| trip.id != trip_id);
        self.store
            .write_registry(serde_json::to_value(&registry)?)
            .await?;
        self.store.remove_trip(trip_id).await?;

        if self.store.active_trip().as_deref() == Some(trip_id) {
            match registry.first() {
                Some(next) => self.store.switch_trip(&next.id).await?,
                None => self.store.switch_trip("").await?,
            }
        }
        Ok(())
    }

    /// Serializes the active trip's full snapshot.
    pub async fn export_trip(&self) -> ResultEngine<TripExport> {
        let trip_id = self
            .store
            .active_trip()
            .ok_or(StoreError::NoActiveTrip)?;

        Ok(TripExport {
            metadata: Some(ExportMetadata {
                id: trip_id,
                version: EXPORT_VERSION.to_string(),
            }),
            settings: self.store.document(Collection::Settings).await,
            itinerary: self.store.list(Collection::Itinerary).await,
            expenses: self.store.list(Collection::Expenses).await,
            users: self.store.list(Collection::Users).await,
            chat: self.store.list(Collection::Chat).await,
            markers: self.store.list(Collection::Markers).await,
        })
    }

    /// Imports an exported document into a freshly allocated trip id and
    /// switches to it. Never overwrites an existing trip; a document that
    /// does not parse aborts before anything is written or registered.
    pub async fn import_trip(&self, document: Value) -> ResultEngine<String> {
        let export: TripExport = serde_json::from_value(document)
            .map_err(|err| EngineError::InvalidImport(err.to_string()))?;

        let trip_id = new_trip_id();

        if let Some(settings) = &export.settings {
            self.store
                .replace_in(&trip_id, Collection::Settings, serde_json::to_value(settings)?)
                .await?;
        }
        if !export.itinerary.is_empty() {
            self.store
                .replace_in(
                    &trip_id,
                    Collection::Itinerary,
                    serde_json::to_value(&export.itinerary)?,
                )
                .await?;
        }
        if !export.expenses.is_empty() {
            self.store
                .replace_in(
                    &trip_id,
                    Collection::Expenses,
                    serde_json::to_value(&export.expenses)?,
                )
                .await?;
        }
        if !export.users.is_empty() {
            self.store
                .replace_in(&trip_id, Collection::Users, serde_json::to_value(&export.users)?)
                .await?;
        }
        if !export.chat.is_empty() {
            self.store
                .replace_in(&trip_id, Collection::Chat, serde_json::to_value(&export.chat)?)
                .await?;
        }
        if !export.markers.is_empty() {
            self.store
                .replace_in(
                    &trip_id,
                    Collection::Markers,
                    serde_json::to_value(&export.markers)?,
                )
                .await?;
        }

        if let Some(settings) = &export.settings {
            let mut registry = self.trips().await;
            registry.push(TripMetadata {
                id: trip_id.clone(),
                destination: settings.destination.clone(),
                start_date: settings.start_date.clone(),
                end_date: settings.end_date.clone(),
            });
            self.store
                .write_registry(serde_json::to_value(registry)?)
                .await?;
        }

        self.store.switch_trip(&trip_id).await?;
        tracing::info!("imported trip {trip_id}");
        Ok(trip_id)
    }
}
