// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport to the inference engine

use super::{
    EngineTransport, REQUEST_ID_HEADER, TransportError, TransportRequest, TransportResponse,
};
use crate::config::ClientConfig;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use uuid::Uuid;

/// HTTP/1.1 engine transport over a pooled `reqwest` client
///
/// No total request timeout is configured on the client; callers bound each call with their
/// own deadline so a long-lived stream is not cut off by a per-request timer.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport from the client configuration
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let base_url = config.engine_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| TransportError::InvalidAddress {
            address: config.engine_url.clone(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Create a transport for `engine_url` with otherwise default settings
    pub fn for_url(engine_url: impl Into<String>) -> Result<Self, TransportError> {
        let config = ClientConfig {
            engine_url: engine_url.into(),
            ..ClientConfig::default()
        };
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn open(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.url_for(&request.path);
        let mut req = self.client.request(request.method.clone(), &url);

        if let Some(body) = request.body {
            req = req.header(CONTENT_TYPE, "application/json").body(body);
        }

        let has_request_id = request
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case(REQUEST_ID_HEADER));
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }
        if !has_request_id {
            req = req.header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        }

        tracing::trace!(method = %request.method, url = %url, "opening engine request");
        let response = req.send().await?;
        let status = response.status().as_u16();
        tracing::debug!(method = %request.method, url = %url, status, "engine responded");

        let body = response.bytes_stream().map_err(TransportError::from);
        Ok(TransportResponse::new(status, Box::pin(body)))
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}
