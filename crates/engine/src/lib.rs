//! Trip engine: typed operations over the document [`Store`].
//!
//! The engine owns the domain rules (participant name uniqueness, expense
//! defaults, chat capping, settlement) and leaves persistence and
//! fan-out to the store. All collection reads degrade to empty defaults;
//! mutations require an active trip.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{Value, json};
use store::{Collection, Store, Subscription};
use uuid::Uuid;

pub mod assistant;
mod error;
pub mod records;
pub mod settlement;
mod trips;

pub use error::EngineError;
pub use records::{
    ChatMessage, ChatRole, Expense, ItineraryItem, MapMarker, MarkerKind, TripMetadata,
    TripSettings, User, WeatherInfo,
};
pub use settlement::{Balance, Debt, Settlement, compute_settlement};
pub use trips::{EXPORT_VERSION, ExportMetadata, TripExport};

pub type ResultEngine<T> = Result<T, EngineError>;

/// Chat history kept per trip; older messages are discarded on write.
pub const CHAT_HISTORY_LIMIT: usize = 50;

pub struct Engine {
    store: Arc<Store>,
}

impl Engine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Restores the trip that was active in the previous session.
    pub async fn restore(&self) {
        self.store.restore_last_trip().await;
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // ---- participants ----

    pub async fn users(&self) -> Vec<User> {
        self.store.list(Collection::Users).await
    }

    /// Adds a participant. Names are trimmed and must be unique within the
    /// trip (exact match, case sensitive).
    pub async fn add_user(&self, name: &str) -> ResultEngine<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidName(
                "participant name cannot be empty".to_string(),
            ));
        }
        if self.users().await.iter().any(|user| user.name == name) {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        let id = self.store.add(Collection::Users, json!({"name": name})).await?;
        Ok(id)
    }

    /// Renames a participant. Historical expenses keep the old name.
    pub async fn rename_user(&self, id: &str, name: &str) -> ResultEngine<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidName(
                "participant name cannot be empty".to_string(),
            ));
        }
        self.store
            .update(Collection::Users, id, json!({"name": name}))
            .await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> ResultEngine<()> {
        self.store.delete(Collection::Users, id).await?;
        Ok(())
    }

    // ---- expenses ----

    /// Expenses, most recent date first.
    pub async fn expenses(&self) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self.store.list(Collection::Expenses).await;
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        expenses
    }

    /// Records a shared expense. A missing date defaults to now; an empty
    /// `involved` set means the cost is split among all current users.
    pub async fn add_expense(
        &self,
        payer: &str,
        amount: f64,
        description: &str,
        date: Option<String>,
        involved: Vec<String>,
    ) -> ResultEngine<String> {
        let date = date.unwrap_or_else(|| Utc::now().to_rfc3339());
        let id = self
            .store
            .add(
                Collection::Expenses,
                json!({
                    "payer": payer,
                    "amount": amount,
                    "description": description,
                    "date": date,
                    "involved": involved,
                }),
            )
            .await?;
        Ok(id)
    }

    pub async fn delete_expense(&self, id: &str) -> ResultEngine<()> {
        self.store.delete(Collection::Expenses, id).await?;
        Ok(())
    }

    /// Settlement of the active trip's current users and expenses.
    pub async fn settlement(&self) -> Settlement {
        let users = self.users().await;
        let expenses: Vec<Expense> = self.store.list(Collection::Expenses).await;
        compute_settlement(&users, &expenses)
    }

    /// Subscribes to the settlement: the callback receives a freshly
    /// computed [`Settlement`] immediately and after every change to the
    /// user or expense collections, until the watch is dropped.
    pub async fn watch_settlement(
        &self,
        callback: impl Fn(Settlement) + Send + Sync + 'static,
    ) -> SettlementWatch {
        #[derive(Default)]
        struct State {
            users: Vec<User>,
            expenses: Vec<Expense>,
        }

        let state = Arc::new(Mutex::new(State::default()));
        let callback = Arc::new(callback);

        let users_state = Arc::clone(&state);
        let users_callback = Arc::clone(&callback);
        let users = self
            .store
            .subscribe(Collection::Users, move |snapshot: &Value| {
                let settlement = {
                    let mut state = users_state.lock().unwrap_or_else(|e| e.into_inner());
                    state.users = store::decode_list(snapshot);
                    compute_settlement(&state.users, &state.expenses)
                };
                users_callback(settlement);
            })
            .await;

        let expenses_state = Arc::clone(&state);
        let expenses_callback = Arc::clone(&callback);
        let expenses = self
            .store
            .subscribe(Collection::Expenses, move |snapshot: &Value| {
                let settlement = {
                    let mut state = expenses_state.lock().unwrap_or_else(|e| e.into_inner());
                    state.expenses = store::decode_list(snapshot);
                    compute_settlement(&state.users, &state.expenses)
                };
                expenses_callback(settlement);
            })
            .await;

        SettlementWatch {
            _users: users,
            _expenses: expenses,
        }
    }

    // ---- itinerary ----

    /// Itinerary items ordered by day, then time.
    pub async fn itinerary(&self) -> Vec<ItineraryItem> {
        let mut items: Vec<ItineraryItem> = self.store.list(Collection::Itinerary).await;
        items.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.time.cmp(&b.time)));
        items
    }

    pub async fn add_itinerary_item(&self, item: &ItineraryItem) -> ResultEngine<String> {
        let mut document = serde_json::to_value(item)?;
        if let Some(fields) = document.as_object_mut() {
            // The store assigns the identifier.
            fields.remove("id");
        }
        let id = self.store.add(Collection::Itinerary, document).await?;
        Ok(id)
    }

    /// Merges partial fields into an itinerary item; unknown ids are a
    /// silent no-op.
    pub async fn update_itinerary_item(&self, id: &str, partial: Value) -> ResultEngine<()> {
        self.store.update(Collection::Itinerary, id, partial).await?;
        Ok(())
    }

    pub async fn delete_itinerary_item(&self, id: &str) -> ResultEngine<()> {
        self.store.delete(Collection::Itinerary, id).await?;
        Ok(())
    }

    // ---- chat ----

    /// Chat history in chronological order.
    pub async fn chat(&self) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = self.store.list(Collection::Chat).await;
        messages.sort_by_key(|message| message.timestamp);
        messages
    }

    /// Appends a chat message, discarding history beyond
    /// [`CHAT_HISTORY_LIMIT`].
    pub async fn send_chat_message(
        &self,
        role: ChatRole,
        text: &str,
    ) -> ResultEngine<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };

        let mut messages = self.chat().await;
        messages.push(message.clone());
        if messages.len() > CHAT_HISTORY_LIMIT {
            let excess = messages.len() - CHAT_HISTORY_LIMIT;
            messages.drain(..excess);
        }
        self.store
            .replace(Collection::Chat, serde_json::to_value(&messages)?)
            .await?;
        Ok(message)
    }

    // ---- map markers ----

    pub async fn markers(&self) -> Vec<MapMarker> {
        self.store.list(Collection::Markers).await
    }

    pub async fn add_marker(&self, marker: &MapMarker) -> ResultEngine<String> {
        let mut document = serde_json::to_value(marker)?;
        if let Some(fields) = document.as_object_mut() {
            fields.remove("id");
        }
        let id = self.store.add(Collection::Markers, document).await?;
        Ok(id)
    }

    pub async fn delete_marker(&self, id: &str) -> ResultEngine<()> {
        self.store.delete(Collection::Markers, id).await?;
        Ok(())
    }

    pub async fn clear_markers(&self) -> ResultEngine<()> {
        self.store.replace(Collection::Markers, json!([])).await?;
        Ok(())
    }

    // ---- settings ----

    pub async fn settings(&self) -> Option<TripSettings> {
        self.store.document(Collection::Settings).await
    }
}

/// Keeps a settlement subscription alive; dropping it stops updates.
pub struct SettlementWatch {
    _users: Subscription,
    _expenses: Subscription,
}
