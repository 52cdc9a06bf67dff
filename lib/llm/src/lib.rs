// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # OpenLLM engine client
//!
//! Client side of the OpenLLM inference engine: model lifecycle calls, request/response
//! inference, token streaming and capability based routing.

pub mod catalog;
pub mod client;
pub mod codec;
pub mod error;
pub mod model_type;
pub mod protocols;
pub mod router;
pub mod selector;
pub mod stream;

pub use catalog::{CatalogError, MemoryCatalog, ModelCatalog};
pub use client::EngineClient;
pub use error::{ErrorKind, InferenceError};
pub use router::{RequestRouter, RoutingRequest};
pub use selector::{SelectionCriteria, select};
pub use stream::{StreamCallbacks, StreamEvent, StreamObserver, StreamState, TokenStreamController};
