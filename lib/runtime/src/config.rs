// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use derive_builder::Builder;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use validator::Validate;

pub mod environment_names;

/// Default address of the inference engine
const DEFAULT_ENGINE_URL: &str = "http://localhost:8080";

/// Default deadline for request/response calls (health, models, inference)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default deadline for a whole streaming call, measured from request issuance
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 300;

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 16;
const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Engine client configuration
///
/// Every deadline is a single budget applied from the moment a call is issued; there is no
/// separate read or idle timeout.
#[derive(Serialize, Deserialize, Validate, Debug, Builder, Clone, PartialEq)]
#[builder(build_fn(private, name = "build_internal"), derive(Debug, Serialize))]
pub struct ClientConfig {
    /// Base URL of the inference engine
    /// Set this at runtime with environment variable OPENLLM_CLIENT_ENGINE_URL
    #[validate(url)]
    #[builder(default = "DEFAULT_ENGINE_URL.to_string()", setter(into))]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub engine_url: String,

    /// Deadline for non-streaming calls, in seconds
    /// Set this at runtime with environment variable OPENLLM_CLIENT_REQUEST_TIMEOUT
    #[validate(range(min = 1))]
    #[builder(default = "DEFAULT_REQUEST_TIMEOUT_SECS")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub request_timeout_secs: u64,

    /// Deadline for streaming calls, in seconds
    /// Set this at runtime with environment variable OPENLLM_CLIENT_STREAM_TIMEOUT
    #[validate(range(min = 1))]
    #[builder(default = "DEFAULT_STREAM_TIMEOUT_SECS")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub stream_timeout_secs: u64,

    /// TCP connect timeout, in seconds
    /// Set this at runtime with environment variable OPENLLM_CLIENT_CONNECT_TIMEOUT
    #[validate(range(min = 1))]
    #[builder(default = "DEFAULT_CONNECT_TIMEOUT_SECS")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub connect_timeout_secs: u64,

    /// Set this at runtime with environment variable OPENLLM_CLIENT_POOL_MAX_IDLE_PER_HOST
    #[builder(default = "DEFAULT_POOL_MAX_IDLE_PER_HOST")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub pool_max_idle_per_host: usize,

    /// Set this at runtime with environment variable OPENLLM_CLIENT_POOL_IDLE_TIMEOUT
    #[builder(default = "DEFAULT_POOL_IDLE_TIMEOUT_SECS")]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub pool_idle_timeout_secs: u64,

    /// User agent sent with every request
    /// Set this at runtime with environment variable OPENLLM_CLIENT_USER_AGENT
    #[builder(default = "default_user_agent()", setter(into))]
    #[builder_field_attr(serde(skip_serializing_if = "Option::is_none"))]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("openllm-client/{}", env!("CARGO_PKG_VERSION"))
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine_url={}, ", self.engine_url)?;
        write!(f, "request_timeout_secs={}, ", self.request_timeout_secs)?;
        write!(f, "stream_timeout_secs={}, ", self.stream_timeout_secs)?;
        write!(f, "connect_timeout_secs={}, ", self.connect_timeout_secs)?;
        write!(f, "pool_max_idle_per_host={}, ", self.pool_max_idle_per_host)?;
        write!(f, "pool_idle_timeout_secs={}", self.pool_idle_timeout_secs)
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub(crate) fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(ClientConfig::default()))
            .merge(Toml::file("/opt/openllm/defaults/client.toml"))
            .merge(Toml::file("/opt/openllm/etc/client.toml"))
            .merge(
                Env::prefixed(environment_names::client::PREFIX).filter_map(|k| {
                    let full_key = format!("{}{}", environment_names::client::PREFIX, k.as_str());
                    // filters out empty environment variables
                    match std::env::var(&full_key) {
                        Ok(v) if !v.is_empty() => {
                            // Map OPENLLM_CLIENT_* to the correct field names
                            let mapped_key = match k.as_str() {
                                "REQUEST_TIMEOUT" => "request_timeout_secs",
                                "STREAM_TIMEOUT" => "stream_timeout_secs",
                                "CONNECT_TIMEOUT" => "connect_timeout_secs",
                                "POOL_IDLE_TIMEOUT" => "pool_idle_timeout_secs",
                                _ => k.as_str(),
                            };
                            Some(mapped_key.into())
                        }
                        _ => None,
                    }
                }),
            )
    }

    /// Load the client configuration from the environment and configuration files
    /// Configuration is prioritized in the following order, where the last has the lowest priority:
    /// 1. Environment variables prefixed with `OPENLLM_CLIENT_` (top priority)
    /// 2. /opt/openllm/etc/client.toml
    /// 3. /opt/openllm/defaults/client.toml (lowest priority)
    pub fn from_settings() -> Result<ClientConfig> {
        let config: ClientConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stream_timeout_secs: DEFAULT_STREAM_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout_secs: DEFAULT_POOL_IDLE_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfigBuilder {
    /// Build and validate the client configuration
    pub fn build(&self) -> Result<ClientConfig> {
        let config = self.build_internal()?;
        config.validate()?;
        Ok(config)
    }
}

/// Check if a string is truthy
/// This will be used to evaluate environment variables or any other subjective
/// configuration parameters that can be set by the user that should be evaluated
/// as a boolean value.
pub fn is_truthy(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// Check if a string is falsey (opposite of [`is_truthy`]).
pub fn is_falsey(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "0" | "false" | "off" | "no")
}

pub fn parse_bool(val: &str) -> anyhow::Result<bool> {
    if is_truthy(val) {
        Ok(true)
    } else if is_falsey(val) {
        Ok(false)
    } else {
        anyhow::bail!(
            "Invalid boolean value: '{}'. Expected one of: true/false, 1/0, on/off, yes/no",
            val
        )
    }
}

/// Check if an environment variable is truthy
pub fn env_is_truthy(env: &str) -> bool {
    match std::env::var(env) {
        Ok(val) => is_truthy(val.as_str()),
        Err(_) => false,
    }
}

/// Check if an environment variable is falsey
pub fn env_is_falsey(env: &str) -> bool {
    match std::env::var(env) {
        Ok(val) => is_falsey(val.as_str()),
        Err(_) => false,
    }
}

/// Check whether JSONL logging enabled
/// Set the `OPENLLM_LOGGING_JSONL` environment variable a [`is_truthy`] value
pub fn jsonl_logging_enabled() -> bool {
    env_is_truthy(environment_names::logging::OPENLLM_LOGGING_JSONL)
}

/// Check whether logging with ANSI terminal escape codes and colors is disabled.
pub fn disable_ansi_logging() -> bool {
    env_is_truthy(environment_names::logging::OPENLLM_SDK_DISABLE_ANSI_LOGGING)
}

/// Check whether to use local timezone for logging timestamps (default is UTC)
pub fn use_local_timezone() -> bool {
    env_is_truthy(environment_names::logging::OPENLLM_LOG_USE_LOCAL_TZ)
}
