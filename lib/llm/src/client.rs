// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Engine client
//!
//! Thin wrappers over the engine's HTTP routes plus the entry points for streaming inference.
//! Every call is bounded by a single deadline measured from issuance: `request_timeout` for
//! request/response calls and `stream_timeout` for streams.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use openllm_runtime::config::ClientConfig;
use openllm_runtime::transports::{
    EngineTransport, HttpTransport, TransportError, TransportRequest, encode_path_segment,
};
use openllm_runtime::utils::{Instant, until_deadline_or_cancelled};
use openllm_runtime::{CancellationToken, ErrorContext};
use serde::de::DeserializeOwned;

use crate::catalog::MemoryCatalog;
use crate::error::{InferenceError, classify_rejection};
use crate::protocols::{
    HealthResponse, InferenceRequest, InferenceResponse, LoadModelRequest, ModelActionResponse,
    ModelDescriptor, ModelListResponse, RegisterModelRequest, RegisterModelResponse,
};
use crate::stream::{StreamEvent, StreamObserver, StreamState, TokenStreamController, spawn_events};

const HEALTH_PATH: &str = "/health";
const MODELS_PATH: &str = "/v1/models";
const REGISTER_PATH: &str = "/v1/models/register";
const LOAD_PATH: &str = "/v1/models/load";
const UNLOAD_PATH: &str = "/v1/models/unload";
const INFERENCE_PATH: &str = "/v1/inference";

/// Client for one inference engine. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct EngineClient {
    transport: Arc<dyn EngineTransport>,
    request_timeout: Duration,
    stream_timeout: Duration,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("transport", &self.transport.transport_name())
            .field("request_timeout", &self.request_timeout)
            .field("stream_timeout", &self.stream_timeout)
            .finish()
    }
}

impl EngineClient {
    /// HTTP client for the engine described by `config`
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            config.request_timeout(),
            config.stream_timeout(),
        ))
    }

    /// Client configured from files and `OPENLLM_CLIENT_*` environment variables
    pub fn from_settings() -> anyhow::Result<Self> {
        let config = ClientConfig::from_settings()?;
        let client = Self::new(&config).context("failed to create engine client")?;
        tracing::debug!(%config, "engine client configured");
        Ok(client)
    }

    pub fn with_transport(
        transport: Arc<dyn EngineTransport>,
        request_timeout: Duration,
        stream_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            request_timeout,
            stream_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn stream_timeout(&self) -> Duration {
        self.stream_timeout
    }

    pub async fn health(&self) -> Result<HealthResponse, InferenceError> {
        self.call(TransportRequest::get(HEALTH_PATH), "").await
    }

    /// Models in the engine's registry, in the engine's order
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>, InferenceError> {
        let list: ModelListResponse = self.call(TransportRequest::get(MODELS_PATH), "").await?;
        Ok(list.models)
    }

    pub async fn register_model(
        &self,
        request: &RegisterModelRequest,
    ) -> Result<RegisterModelResponse, InferenceError> {
        let http = TransportRequest::post_json(REGISTER_PATH, request)?;
        self.call(http, &request.id).await
    }

    pub async fn load_model(&self, model_id: &str) -> Result<ModelActionResponse, InferenceError> {
        let body = LoadModelRequest {
            model_id: model_id.to_string(),
        };
        let http = TransportRequest::post_json(LOAD_PATH, &body)?;
        self.call(http, model_id).await
    }

    pub async fn unload_model(
        &self,
        model_id: &str,
    ) -> Result<ModelActionResponse, InferenceError> {
        let segment = encode_path_segment(model_id)?;
        let http = TransportRequest::post(format!("{UNLOAD_PATH}/{segment}"));
        self.call(http, model_id).await
    }

    /// Request/response inference
    pub async fn infer(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        self.infer_with_cancel(request, &CancellationToken::new())
            .await
    }

    pub async fn infer_with_cancel(
        &self,
        request: &InferenceRequest,
        cancel: &CancellationToken,
    ) -> Result<InferenceResponse, InferenceError> {
        let http = TransportRequest::post_json(INFERENCE_PATH, request)?;
        self.call_with_cancel(http, &request.model_id, cancel).await
    }

    /// Controller for a streaming call, not yet started
    pub fn stream_controller(&self, request: InferenceRequest) -> TokenStreamController {
        TokenStreamController::new(self.transport.clone(), request, self.stream_timeout)
    }

    /// Stream tokens into `observer`; returns the terminal state
    pub async fn stream<O: StreamObserver + ?Sized>(
        &self,
        request: InferenceRequest,
        observer: &mut O,
    ) -> StreamState {
        self.stream_controller(request).run(observer).await
    }

    pub async fn stream_with_cancel<O: StreamObserver + ?Sized>(
        &self,
        request: InferenceRequest,
        observer: &mut O,
        cancel: CancellationToken,
    ) -> StreamState {
        self.stream_controller(request)
            .with_cancellation(cancel)
            .run(observer)
            .await
    }

    /// Stream as a sequence of [`StreamEvent`]s driven by a spawned task
    ///
    /// Must be called from within a tokio runtime.
    pub fn stream_events(
        &self,
        request: InferenceRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = StreamEvent> + use<> {
        spawn_events(self.stream_controller(request).with_cancellation(cancel))
    }

    /// Replace the contents of `catalog` with the engine's registry; returns the model count
    pub async fn sync_catalog(&self, catalog: &MemoryCatalog) -> Result<usize, InferenceError> {
        let models = self.list_models().await?;
        let count = models.len();
        catalog.replace_all(models);
        tracing::debug!(models = count, "catalog synchronized with engine");
        Ok(count)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: TransportRequest,
        model_id: &str,
    ) -> Result<T, InferenceError> {
        self.call_with_cancel(request, model_id, &CancellationToken::new())
            .await
    }

    async fn call_with_cancel<T: DeserializeOwned>(
        &self,
        request: TransportRequest,
        model_id: &str,
        cancel: &CancellationToken,
    ) -> Result<T, InferenceError> {
        let deadline = Instant::now() + self.request_timeout;
        let path = request.path.clone();

        let exchange = async {
            let response = self.transport.open(request).await?;
            let status = response.status;
            let body = response.collect_body().await?;
            Ok::<_, TransportError>((status, body))
        };
        let (status, body) = until_deadline_or_cancelled(exchange, deadline, cancel)
            .await
            .map_err(|interrupt| InferenceError::from_interrupt(interrupt, self.request_timeout))??;

        if !(200..300).contains(&status) {
            let error = classify_rejection(status, &body, model_id);
            tracing::debug!(path = %path, status, error = %error, "engine rejected request");
            return Err(error);
        }

        serde_json::from_slice(&body)
            .map_err(|e| InferenceError::InvalidResponse(format!("{path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config() {
        let config = ClientConfig::builder()
            .engine_url("http://127.0.0.1:9")
            .request_timeout_secs(7)
            .stream_timeout_secs(70)
            .build()
            .unwrap();
        let client = EngineClient::new(&config).unwrap();
        assert_eq!(client.request_timeout(), Duration::from_secs(7));
        assert_eq!(client.stream_timeout(), Duration::from_secs(70));
        assert!(format!("{client:?}").contains("http"));
    }
}
