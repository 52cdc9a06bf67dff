// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Request router
//!
//! Resolves the model for a request, either the one it names or the first catalog entry that
//! satisfies its criteria, then issues an ordinary inference call. Resolution failures are
//! returned before the engine is contacted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::ModelCatalog;
use crate::client::EngineClient;
use crate::error::InferenceError;
use crate::protocols::{InferenceRequest, InferenceResponse, ModelDescriptor};
use crate::selector::{SelectionCriteria, select_from};
use crate::stream::{StreamObserver, StreamState};

/// Inference request that may leave the model choice to the router
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingRequest {
    pub prompt: String,

    /// Takes precedence over `criteria` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(default)]
    pub criteria: SelectionCriteria,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl RoutingRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_criteria(mut self, criteria: SelectionCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

pub struct RequestRouter {
    client: EngineClient,
    catalog: Arc<dyn ModelCatalog>,
}

impl RequestRouter {
    pub fn new(client: EngineClient, catalog: Arc<dyn ModelCatalog>) -> Self {
        Self { client, catalog }
    }

    pub fn client(&self) -> &EngineClient {
        &self.client
    }

    /// Pick the model that should serve `request`
    pub fn resolve(&self, request: &RoutingRequest) -> Result<ModelDescriptor, InferenceError> {
        if let Some(model_id) = &request.model_id {
            return self
                .catalog
                .get(model_id)
                .ok_or_else(|| InferenceError::UnknownModel {
                    model_id: model_id.clone(),
                });
        }

        select_from(self.catalog.as_ref(), &request.criteria).ok_or_else(|| {
            InferenceError::NoMatchingModel {
                criteria: request.criteria.clone(),
            }
        })
    }

    /// Resolve and build the engine request without sending it
    pub fn prepare(&self, request: &RoutingRequest) -> Result<InferenceRequest, InferenceError> {
        let model = self.resolve(request)?;
        tracing::debug!(
            model_id = %model.id,
            explicit = request.model_id.is_some(),
            "routed request"
        );
        Ok(InferenceRequest {
            model_id: model.id,
            prompt: request.prompt.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        })
    }

    /// Resolve the model, then run a request/response inference call
    pub async fn route(
        &self,
        request: &RoutingRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        let inference = self.prepare(request)?;
        self.client.infer(&inference).await
    }

    /// Resolve the model, then stream into `observer`
    ///
    /// A resolution failure is returned without touching the observer.
    pub async fn route_stream<O: StreamObserver + ?Sized>(
        &self,
        request: &RoutingRequest,
        observer: &mut O,
    ) -> Result<StreamState, InferenceError> {
        let inference = self.prepare(request)?;
        Ok(self.client.stream(inference, observer).await)
    }
}
