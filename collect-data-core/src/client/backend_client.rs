use crate::client::{ClientError, DataClient};
use crate::models::{Configuration, FlowData, PayloadData, StepPatch};
use crate::reporter::StepUpdater;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the backend API
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    api_key: Option<String>,
    client: Client,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ClientError::InvalidConfiguration(format!("backend URL {}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidConfiguration(format!(
                "backend URL {} cannot carry a path",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    pub fn from_configuration(config: &Configuration) -> Result<Self, ClientError> {
        Self::new(
            &config.backend_url,
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    /// Append `segments` to the base URL, each percent-encoded as one segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(ClientError::InvalidIdentifier(bad.to_string()));
        }

        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidConfiguration(format!(
                    "backend URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, key),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        request
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(e.to_string()))
    }

    async fn error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body = body.trim();
        if body.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, body)
        }
    }

    /// Map a lookup response onto a record or a typed failure
    async fn read_record<T: DeserializeOwned>(
        response: reqwest::Response,
        kind: &'static str,
        id: &str,
    ) -> Result<T, ClientError> {
        match response.status() {
            status if status.is_success() => {
                let body = response
                    .json::<Value>()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                serde_json::from_value(unwrap_result(body))
                    .map_err(|e| ClientError::Decode(e.to_string()))
            }
            StatusCode::NOT_FOUND => Err(ClientError::NotFound {
                kind,
                id: id.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ClientError::Unauthorized(Self::error_body(response).await))
            }
            _ => Err(ClientError::Unreachable(Self::error_body(response).await)),
        }
    }
}

/// The backend wraps most records as `{"result": ...}`
fn unwrap_result(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl DataClient for BackendClient {
    async fn fetch_flow(&self, flow_id: &str, execution_id: &str) -> Result<FlowData, ClientError> {
        tracing::debug!(flow_id, execution_id, "Fetching flow data");
        let url = self.endpoint(&["api", "v1", "flows", flow_id])?;
        let request = self
            .client
            .get(url)
            .query(&[("execution_id", execution_id)]);

        let response = Self::send(self.authorize(request)).await?;
        Self::read_record(response, "Flow", flow_id).await
    }

    async fn fetch_payload(&self, payload_id: &str) -> Result<PayloadData, ClientError> {
        tracing::debug!(payload_id, "Fetching payload data");
        let url = self.endpoint(&["api", "v1", "payloads", payload_id])?;
        let request = self.client.get(url);

        let response = Self::send(self.authorize(request)).await?;
        Self::read_record(response, "Payload", payload_id).await
    }
}

#[async_trait]
impl StepUpdater for BackendClient {
    async fn update_step(&self, execution_id: &str, patch: &StepPatch) -> Result<(), ClientError> {
        let url = self.endpoint(&[
            "api",
            "v1",
            "executions",
            execution_id,
            "steps",
            &patch.id,
        ])?;
        let request = self.client.put(url).json(patch);

        let response = Self::send(self.authorize(request)).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ClientError::InvalidStep(Self::error_body(response).await))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ClientError::Unauthorized(Self::error_body(response).await))
            }
            _ => Err(ClientError::Unreachable(Self::error_body(response).await)),
        }
    }
}
