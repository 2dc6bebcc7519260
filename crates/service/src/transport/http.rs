use std::time::Duration;

use async_trait::async_trait;
use models::CollectionKey;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::{OnoTransport, GET_ACTION, SET_ACTION};
use crate::errors::StoreError;

const GRPC_METADATA_CONTENT_TYPE: &str = "grpc-metadata-content-type";

#[derive(Serialize)]
struct GetRequest<'a> {
    #[serde(flatten)]
    key: &'a CollectionKey,
}

#[derive(Serialize)]
struct SetRequest<'a> {
    #[serde(flatten)]
    key: &'a CollectionKey,
    #[serde(rename = "dataValue")]
    data_value: &'a str,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    data: Value,
}

/// reqwest-backed client for the ONO gRPC-gateway endpoint.
#[derive(Clone)]
pub struct HttpOnoTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOnoTransport {
    pub fn new(
        base_url: &str,
        auth_token: Option<&str>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(GRPC_METADATA_CONTENT_TYPE),
            HeaderValue::from_static("application/grpc"),
        );
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| setup_error(format!("invalid auth token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| setup_error(e.to_string()))?;

        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { client, base_url })
    }

    pub fn from_config(cfg: &configs::OnoConfig) -> Result<Self, StoreError> {
        Self::new(
            &cfg.base_url,
            cfg.auth_token.as_deref(),
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}{}", self.base_url, action)
    }

    async fn post(&self, action: &'static str, body: &impl Serialize) -> Result<reqwest::Response, StoreError> {
        let res = self
            .client
            .post(self.endpoint(action))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(action, error = %e, "ONO request failed");
                StoreError::Transport { action, message: e.to_string() }
            })?;

        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            error!(action, status, %body, "ONO request rejected");
            Err(StoreError::Http { action, status, body })
        }
    }
}

fn setup_error(message: String) -> StoreError {
    StoreError::Transport { action: "client setup", message }
}

#[async_trait]
impl OnoTransport for HttpOnoTransport {
    #[instrument(skip(self, key), fields(key = %key))]
    async fn get_app_data(&self, key: &CollectionKey) -> Result<Option<String>, StoreError> {
        let res = self.post(GET_ACTION, &GetRequest { key }).await?;
        let payload: GetResponse = res
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("{GET_ACTION} response: {e}")))?;

        // The gateway normally returns the blob as a string; tolerate an inlined JSON value.
        let data = match payload.data {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        };
        debug!(bytes = data.as_ref().map(String::len).unwrap_or(0), "fetched app data");
        Ok(data)
    }

    #[instrument(skip(self, key, data_value), fields(key = %key, bytes = data_value.len()))]
    async fn set_app_data(&self, key: &CollectionKey, data_value: String) -> Result<(), StoreError> {
        self.post(SET_ACTION, &SetRequest { key, data_value: &data_value }).await?;
        debug!("stored app data");
        Ok(())
    }
}
