use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::error::{HostError, Result};
use crate::traits::WorkloadHost;
use crate::types::{HostSession, Invocation, InvokeResponse, OpenSessionRequest, OpenSessionResponse};

/// Workload host reached through a JSON automation bridge.
pub struct HttpWorkloadHost {
    base_url: String,
    client: Client,
}

impl HttpWorkloadHost {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn with_connect_timeout(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        session_id: &str,
    ) -> Result<T> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(HostError::SessionLost(session_id.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::Call(format!("Status {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| HostError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl WorkloadHost for HttpWorkloadHost {
    async fn open(&self, target: &str) -> Result<HostSession> {
        let request = OpenSessionRequest {
            target: target.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/sessions", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    HostError::Unreachable(format!("{}: {}", self.base_url, e))
                } else {
                    HostError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::Unreachable(format!("Status {}: {}", status, body)));
        }

        let opened: OpenSessionResponse = response
            .json()
            .await
            .map_err(|e| HostError::InvalidResponse(e.to_string()))?;

        debug!(session_id = %opened.id, target = %target, "Host session opened");

        Ok(HostSession {
            id: opened.id,
            target: target.to_string(),
        })
    }

    async fn invoke(&self, session: &HostSession, call: &Invocation) -> Result<f64> {
        let response = self
            .client
            .post(format!("{}/sessions/{}/invoke", self.base_url, session.id))
            .json(call)
            .send()
            .await
            .map_err(|e| {
                // the bridge dropping the connection means the session died with it
                if e.is_connect() || e.is_request() {
                    HostError::SessionLost(format!("{}: {}", session.id, e))
                } else {
                    HostError::Request(e)
                }
            })?;

        let result: InvokeResponse = self.handle_response(response, &session.id).await?;
        Ok(result.value)
    }

    async fn close(&self, session: &HostSession) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/sessions/{}", self.base_url, session.id))
            .send()
            .await?;

        let status = response.status();
        // already gone is as good as closed
        if status.is_success() || status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            debug!(session_id = %session.id, "Host session closed");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(HostError::InvalidResponse(format!("Status {}: {}", status, body)))
    }
}
