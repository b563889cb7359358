//! Durable local backend.
//!
//! Every key maps to one row of the `documents` table; `save` is an upsert
//! so first writes and overwrites go through the same path.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait};
use serde_json::Value;

use crate::documents;
use crate::{Backend, StoreResult};

#[derive(Debug, Clone)]
pub struct LocalBackend {
    db: DatabaseConnection,
}

impl LocalBackend {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl Backend for LocalBackend {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let row = documents::Entity::find_by_id(key).one(&self.db).await?;
        let Some(row) = row else {
            return Ok(None);
        };

        // Corrupt persisted bytes degrade to "no data"; subscribers must
        // never observe a parse failure.
        match serde_json::from_str(&row.value) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!("discarding malformed document {key}: {err}");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, value: &Value) -> StoreResult<()> {
        let model = documents::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(serde_json::to_string(value)?),
            updated_at: ActiveValue::Set(Utc::now().fixed_offset()),
        };

        documents::Entity::insert(model)
            .on_conflict(
                OnConflict::column(documents::Column::Key)
                    .update_columns([documents::Column::Value, documents::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        documents::Entity::delete_by_id(key).exec(&self.db).await?;
        Ok(())
    }
}
