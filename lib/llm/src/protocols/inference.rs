// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use strum::Display;

use super::TokenIdType;

/// Inference call against a single model
///
/// `max_tokens` and `temperature` are left off the wire when unset so the engine applies its
/// own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceRequest {
    pub model_id: String,
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl InferenceRequest {
    pub fn new(model_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
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

/// Why generation stopped
#[derive(Debug, Clone, Copy, Display, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FinishReason {
    /// The model finished on its own
    #[default]
    Stop,
    /// The `max_tokens` bound was reached
    Length,
    /// A reason this client does not know about
    #[serde(other)]
    Other,
}

/// Response of the non-streaming inference endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceResponse {
    pub model_id: String,
    pub text: String,
    pub tokens_generated: u32,
    pub finish_reason: FinishReason,
}

/// One record of the streaming endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamToken {
    /// Text fragment
    pub token: String,
    pub token_id: TokenIdType,
    /// Set on the last token of the stream
    #[serde(default)]
    pub complete: bool,
}

/// Final result of a completed stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateInferenceResult {
    pub model_id: String,
    /// Every token fragment, concatenated in arrival order
    pub text: String,
    /// Number of tokens delivered, including the completion token
    pub tokens_generated: u32,
    pub finish_reason: FinishReason,
}

impl From<AggregateInferenceResult> for InferenceResponse {
    fn from(result: AggregateInferenceResult) -> Self {
        Self {
            model_id: result.model_id,
            text: result.text,
            tokens_generated: result.tokens_generated,
            finish_reason: result.finish_reason,
        }
    }
}
