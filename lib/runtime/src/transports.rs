// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Transports used to reach the inference engine.
//!
//! [`EngineTransport`] opens exactly one request per call and hands back the status code
//! together with a lazily-read body. Deadlines and cancellation are applied by the caller
//! around `open` and around the body stream; a transport never retries.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

pub mod http;

pub use http::HttpTransport;
pub use reqwest::Method;

/// Type alias for request headers
pub type Headers = HashMap<String, String>;

/// Response body as it arrives from the engine
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Header carrying the per-call request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid engine address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to connect to engine: {0}")]
    Connect(String),

    #[error("request to engine failed: {0}")]
    Request(String),

    #[error("failed reading response body: {0}")]
    Body(String),

    #[error("failed to encode request body: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// A single request against the engine
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Path relative to the engine base address, starting with `/`
    pub path: String,
    /// JSON encoded body
    pub body: Option<Bytes>,
    pub headers: Headers,
}

impl TransportRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            headers: Headers::new(),
        }
    }

    /// POST with a JSON body
    pub fn post_json<T: Serialize + ?Sized>(
        path: impl Into<String>,
        body: &T,
    ) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(body).map_err(|e| TransportError::Encode(e.to_string()))?;
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(Bytes::from(body)),
            headers: Headers::new(),
        })
    }

    /// POST without a body
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(path)
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Percent-encode `segment` so it travels as exactly one path segment
pub fn encode_path_segment(segment: &str) -> Result<String, TransportError> {
    const BASE: &str = "http://engine/";
    let mut url = reqwest::Url::parse(BASE).map_err(|e| TransportError::InvalidAddress {
        address: BASE.to_string(),
        reason: e.to_string(),
    })?;
    url.path_segments_mut()
        .map_err(|_| TransportError::Encode(format!("cannot encode path segment '{segment}'")))?
        .clear()
        .push(segment);
    Ok(url.path().trim_start_matches('/').to_string())
}

/// Status plus a body that has not been read yet
pub struct TransportResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self { status, body }
    }

    /// Response whose body is already in memory, delivered in the given chunks
    pub fn from_chunks<I>(status: u16, chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        Self {
            status,
            body: Box::pin(stream::iter(chunks.into_iter().map(Ok))),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body
    pub async fn collect_body(self) -> Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Interface for reaching the engine
///
/// Implementations issue the request and return as soon as the response status is known.
/// Dropping the returned body closes the connection.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn open(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Get the transport name for logging/debugging
    fn transport_name(&self) -> &'static str;
}
