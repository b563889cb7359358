//! Remote document-database backend.
//!
//! Talks to a hosted key-value document API: `GET`/`PUT`/`DELETE` on
//! `{base_url}/{key}.json`, with an optional `auth` query token. The remote
//! service has no push channel here; external edits are picked up by the
//! store's polling change feed.

use serde_json::Value;

use crate::{Backend, StoreResult};

#[derive(Debug, Clone)]
pub struct RemoteBackend {
    http: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

impl RemoteBackend {
    pub fn new(base_url: &str, auth: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn endpoint(&self, key: &str) -> String {
        format!("{}/{}.json", self.base_url, key)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl Backend for RemoteBackend {
    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let response = self
            .authorized(self.http.get(self.endpoint(key)))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;

        match response.json::<Value>().await {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!("discarding malformed remote document {key}: {err}");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.authorized(self.http.put(self.endpoint(key)))
            .json(value)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let response = self
            .authorized(self.http.delete(self.endpoint(key)))
            .send()
            .await?;
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            response.error_for_status()?;
        }
        Ok(())
    }
}
