// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! In-process inference engine speaking the same HTTP surface as the real one

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use chrono::Utc;
use futures::{StreamExt, stream};
use openllm_llm::protocols::{
    HealthResponse, InferenceRequest, InferenceResponse, LoadModelRequest, ModelActionResponse,
    ModelDescriptor, ModelListResponse, RegisterModelRequest, RegisterModelResponse, StreamToken,
};
use openllm_llm::protocols::{FinishReason, models::DEFAULT_MODEL_SIZE_BYTES};
use tokio::sync::Mutex;

/// Prompt that makes the streaming route send two tokens and then stall
pub const STALL_PROMPT: &str = "__stall__";

#[derive(Clone, Default)]
pub struct EngineState {
    pub models: Arc<Mutex<Vec<ModelDescriptor>>>,
    pub requests: Arc<AtomicUsize>,
}

impl EngineState {
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub struct FakeEngine {
    pub url: String,
    pub state: EngineState,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl FakeEngine {
    pub async fn start() -> Self {
        let state = EngineState::default();
        let app = Router::new()
            .route("/health", get(health))
            .route("/v1/models", get(list_models))
            .route("/v1/models/register", post(register_model))
            .route("/v1/models/load", post(load_model))
            .route("/v1/models/unload/{model_id}", post(unload_model))
            .route("/v1/inference", post(inference))
            .route("/v1/inference/stream", post(inference_stream))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}"),
            state,
            handle,
        }
    }
}

fn generate(prompt: &str, max_tokens: u32) -> Vec<String> {
    prompt
        .split_whitespace()
        .take(max_tokens as usize)
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {word}") })
        .collect()
}

async fn check_loaded(state: &EngineState, model_id: &str) -> Result<(), (StatusCode, String)> {
    let models = state.models.lock().await;
    let model = models.iter().find(|m| m.id == model_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Model '{model_id}' not found or not loaded. Please register and load it first."),
        )
    })?;
    if !model.loaded {
        return Err((
            StatusCode::PRECONDITION_FAILED,
            format!("Model '{model_id}' is not loaded. Load it first."),
        ));
    }
    Ok(())
}

async fn health(State(state): State<EngineState>) -> Json<HealthResponse> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let models = state.models.lock().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        models_loaded: models.len(),
    })
}

async fn list_models(State(state): State<EngineState>) -> Json<ModelListResponse> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let models = state.models.lock().await.clone();
    Json(ModelListResponse { models })
}

async fn register_model(
    State(state): State<EngineState>,
    Json(req): Json<RegisterModelRequest>,
) -> (StatusCode, Json<RegisterModelResponse>) {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let mut models = state.models.lock().await;
    let model = ModelDescriptor {
        id: req.id.clone(),
        name: req.name,
        inference: req.inference,
        context: req.context,
        quant: req.quant,
        capabilities: req.capabilities,
        latency: req.latency,
        size_bytes: req.size_bytes.unwrap_or(DEFAULT_MODEL_SIZE_BYTES),
        loaded: false,
        loaded_at: None,
    };

    if models.iter().any(|m| m.id == req.id) {
        return (
            StatusCode::CONFLICT,
            Json(RegisterModelResponse {
                success: false,
                model,
                message: "Model with this ID already registered".to_string(),
            }),
        );
    }

    models.push(model.clone());
    (
        StatusCode::CREATED,
        Json(RegisterModelResponse {
            success: true,
            model,
            message: "Model registered successfully".to_string(),
        }),
    )
}

fn action(status: StatusCode, success: bool, model_id: String, message: &str) -> Response {
    (
        status,
        Json(ModelActionResponse {
            success,
            model_id,
            message: message.to_string(),
        }),
    )
        .into_response()
}

async fn load_model(
    State(state): State<EngineState>,
    Json(req): Json<LoadModelRequest>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let mut models = state.models.lock().await;
    match models.iter_mut().find(|m| m.id == req.model_id) {
        Some(model) if model.loaded => {
            action(StatusCode::CONFLICT, false, req.model_id, "Model already loaded")
        }
        Some(model) => {
            model.loaded = true;
            model.loaded_at = Some(Utc::now());
            action(StatusCode::OK, true, req.model_id, "Model loaded successfully")
        }
        None => action(
            StatusCode::NOT_FOUND,
            false,
            req.model_id,
            "Model not found in registry",
        ),
    }
}

async fn unload_model(State(state): State<EngineState>, Path(model_id): Path<String>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let mut models = state.models.lock().await;
    match models.iter_mut().find(|m| m.id == model_id) {
        Some(model) => {
            model.loaded = false;
            model.loaded_at = None;
            action(StatusCode::OK, true, model_id, "Model unloaded successfully")
        }
        None => action(
            StatusCode::NOT_FOUND,
            false,
            model_id,
            "Model not found in registry",
        ),
    }
}

async fn inference(
    State(state): State<EngineState>,
    Json(req): Json<InferenceRequest>,
) -> Result<Json<InferenceResponse>, (StatusCode, String)> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    check_loaded(&state, &req.model_id).await?;
    let tokens = generate(&req.prompt, req.max_tokens.unwrap_or(100));
    Ok(Json(InferenceResponse {
        model_id: req.model_id,
        tokens_generated: tokens.len() as u32,
        text: tokens.concat(),
        finish_reason: FinishReason::Stop,
    }))
}

async fn inference_stream(
    State(state): State<EngineState>,
    Json(req): Json<InferenceRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    check_loaded(&state, &req.model_id).await?;

    let stall = req.prompt == STALL_PROMPT;
    let tokens = if stall {
        vec!["one".to_string(), " two".to_string()]
    } else {
        generate(&req.prompt, req.max_tokens.unwrap_or(100))
    };
    let last = tokens.len().saturating_sub(1);

    let events = tokens.into_iter().enumerate().map(move |(i, token)| {
        let token = StreamToken {
            token,
            token_id: i as u32,
            complete: !stall && i == last,
        };
        let data = serde_json::to_string(&token).unwrap();
        Ok::<_, Infallible>(Event::default().event("token").data(data))
    });

    let body = if stall {
        stream::iter(events).chain(stream::pending()).boxed()
    } else {
        stream::iter(events).boxed()
    };
    Ok(Sse::new(body))
}
