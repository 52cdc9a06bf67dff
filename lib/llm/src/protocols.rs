// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # OpenLLM Engine Protocols
//!
//! Message formats exchanged with the inference engine over its HTTP API: model lifecycle
//! messages, request/response inference and the token records carried by the streaming
//! endpoint.

pub mod inference;
pub mod models;

/// The token ID type
pub type TokenIdType = u32;

pub use inference::{
    AggregateInferenceResult, FinishReason, InferenceRequest, InferenceResponse, StreamToken,
};
pub use models::{
    HealthResponse, LoadModelRequest, ModelActionResponse, ModelDescriptor, ModelListResponse,
    RegisterModelRequest, RegisterModelResponse,
};
