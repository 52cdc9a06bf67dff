// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use openllm_runtime::transports::TransportError;
use openllm_runtime::utils::Interrupt;
use serde_json::Value;
use strum::Display;

use crate::selector::SelectionCriteria;

/// Coarse classification of an [`InferenceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    DeadlineExceeded,
    Cancelled,
    ModelNotFound,
    ModelNotLoaded,
    /// Any other non-2xx answer from the engine
    Upstream,
    UnexpectedTermination,
    /// No model could be resolved; raised before the engine is contacted
    NoMatch,
    Transport,
    InvalidResponse,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("deadline of {timeout:?} exceeded")]
    DeadlineExceeded { timeout: Duration },

    #[error("request cancelled")]
    Cancelled,

    #[error("model '{model_id}' not found")]
    ModelNotFound { model_id: String },

    #[error("model '{model_id}' is not loaded")]
    ModelNotLoaded { model_id: String },

    #[error("engine rejected request with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("stream ended without a completion token after {tokens_received} tokens")]
    UnexpectedTermination { tokens_received: u32 },

    #[error("model '{model_id}' is not in the catalog")]
    UnknownModel { model_id: String },

    #[error("no model satisfies {criteria}")]
    NoMatchingModel { criteria: SelectionCriteria },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid response from engine: {0}")]
    InvalidResponse(String),
}

impl InferenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferenceError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            InferenceError::Cancelled => ErrorKind::Cancelled,
            InferenceError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            InferenceError::ModelNotLoaded { .. } => ErrorKind::ModelNotLoaded,
            InferenceError::Upstream { .. } => ErrorKind::Upstream,
            InferenceError::UnexpectedTermination { .. } => ErrorKind::UnexpectedTermination,
            InferenceError::UnknownModel { .. } | InferenceError::NoMatchingModel { .. } => {
                ErrorKind::NoMatch
            }
            InferenceError::Transport(_) => ErrorKind::Transport,
            InferenceError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }

    /// True for failures where issuing the same call again may succeed.
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DeadlineExceeded | ErrorKind::Transport
        )
    }

    /// Map a deadline/cancel interrupt; `timeout` is the budget that was exceeded
    pub fn from_interrupt(interrupt: Interrupt, timeout: Duration) -> Self {
        match interrupt {
            Interrupt::DeadlineExceeded => InferenceError::DeadlineExceeded { timeout },
            Interrupt::Cancelled => InferenceError::Cancelled,
        }
    }
}

const KIND_MODEL_NOT_FOUND: &str = "model_not_found";
const KIND_MODEL_NOT_LOADED: &str = "model_not_loaded";

/// Classify a non-2xx engine response
///
/// A structured `{kind, model_id}` payload (top level or under `error`) wins. Otherwise the
/// message text is matched against the requested model id, which only recognizes the wording
/// the engine uses today.
pub fn classify_rejection(status: u16, body: &[u8], requested_model: &str) -> InferenceError {
    let json = serde_json::from_slice::<Value>(body).ok();

    if let Some(err) = json.as_ref().and_then(|v| classify_structured(v, requested_model)) {
        return err;
    }

    let message = json
        .as_ref()
        .and_then(extract_message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    let references_model = !requested_model.is_empty()
        && (mentions_model(&message, requested_model)
            || json
                .as_ref()
                .and_then(|v| v.get("model_id"))
                .and_then(Value::as_str)
                == Some(requested_model));

    if references_model {
        let lower = message.to_lowercase();
        if lower.contains("not found") {
            return InferenceError::ModelNotFound {
                model_id: requested_model.to_string(),
            };
        }
        if lower.contains("not loaded") {
            return InferenceError::ModelNotLoaded {
                model_id: requested_model.to_string(),
            };
        }
    }

    InferenceError::Upstream { status, message }
}

/// The message names `model_id` quoted, or as a whole token
fn mentions_model(message: &str, model_id: &str) -> bool {
    if message.contains(&format!("'{model_id}'")) || message.contains(&format!("\"{model_id}\"")) {
        return true;
    }
    message.match_indices(model_id).any(|(start, _)| {
        let before = message[..start].chars().next_back();
        let after = message[start + model_id.len()..].chars().next();
        !before.is_some_and(is_id_char) && !after.is_some_and(is_id_char)
    })
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/')
}

fn classify_structured(value: &Value, requested_model: &str) -> Option<InferenceError> {
    let payload = match value.get("error") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };
    let kind = payload.get("kind")?.as_str()?;
    let model_id = payload
        .get("model_id")
        .and_then(Value::as_str)
        .unwrap_or(requested_model)
        .to_string();
    match kind {
        KIND_MODEL_NOT_FOUND => Some(InferenceError::ModelNotFound { model_id }),
        KIND_MODEL_NOT_LOADED => Some(InferenceError::ModelNotLoaded { model_id }),
        _ => None,
    }
}

fn extract_message(value: &Value) -> Option<String> {
    let from = |v: &Value| {
        v.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    if let Some(message) = from(value) {
        return Some(message);
    }
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        inner => from(inner),
    }
}
