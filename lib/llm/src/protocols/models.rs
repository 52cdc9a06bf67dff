// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model_type::{InferenceBackend, LatencyProfile, ModelCapabilities};

/// Size the engine assumes for a model registered without one
pub const DEFAULT_MODEL_SIZE_BYTES: u64 = 4_000_000_000;

fn default_size_bytes() -> u64 {
    DEFAULT_MODEL_SIZE_BYTES
}

/// A model as the engine's registry describes it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub inference: InferenceBackend,
    /// Context window, in tokens
    pub context: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quant: Option<String>,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyProfile>,
    #[serde(default = "default_size_bytes")]
    pub size_bytes: u64,
    #[serde(default)]
    pub loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, inference: InferenceBackend, context: u32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            inference,
            context,
            quant: None,
            capabilities: ModelCapabilities::empty(),
            latency: None,
            size_bytes: DEFAULT_MODEL_SIZE_BYTES,
            loaded: false,
            loaded_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: ModelCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_quant(mut self, quant: impl Into<String>) -> Self {
        self.quant = Some(quant.into());
        self
    }
}

/// Body of `POST /v1/models/register`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterModelRequest {
    pub id: String,
    pub name: String,
    pub inference: InferenceBackend,
    pub context: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quant: Option<String>,
    pub capabilities: ModelCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl From<&ModelDescriptor> for RegisterModelRequest {
    fn from(model: &ModelDescriptor) -> Self {
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            inference: model.inference,
            context: model.context,
            quant: model.quant.clone(),
            capabilities: model.capabilities,
            latency: model.latency,
            size_bytes: Some(model.size_bytes),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterModelResponse {
    pub success: bool,
    pub model: ModelDescriptor,
    pub message: String,
}

/// Body of `POST /v1/models/load`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadModelRequest {
    pub model_id: String,
}

/// Response of the load and unload endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelActionResponse {
    pub success: bool,
    pub model_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelListResponse {
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub models_loaded: usize,
}
