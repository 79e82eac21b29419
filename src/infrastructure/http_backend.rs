// HTTP adapter for the control backend's REST resources
use crate::application::control_backend::{BackendError, ControlBackend};
use crate::domain::tank::{ConfigPatch, EventLog, TankConfig, TankState};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

const STATE_PATH: &str = "/state/";
const CONFIG_PATH: &str = "/config/";
const EVENTS_PATH: &str = "/events/";

#[derive(Debug, Clone)]
pub struct HttpControlBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpControlBackend {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, BackendError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Unreachable(e.to_string())
            } else {
                BackendError::Decode(e.to_string())
            }
        })
    }
}

#[async_trait]
impl ControlBackend for HttpControlBackend {
    async fn fetch_state(&self) -> Result<TankState, BackendError> {
        self.read(self.client.get(self.url(STATE_PATH))).await
    }

    async fn fetch_config(&self) -> Result<TankConfig, BackendError> {
        self.read(self.client.get(self.url(CONFIG_PATH))).await
    }

    async fn fetch_events(&self, limit: u32) -> Result<Vec<EventLog>, BackendError> {
        let request = self
            .client
            .get(self.url(EVENTS_PATH))
            .query(&[("limit", limit)]);
        self.read(request).await
    }

    async fn patch_config(&self, patch: &ConfigPatch) -> Result<TankConfig, BackendError> {
        tracing::debug!(?patch, "PATCH {}", CONFIG_PATH);
        self.read(self.client.patch(self.url(CONFIG_PATH)).json(patch)).await
    }
}
