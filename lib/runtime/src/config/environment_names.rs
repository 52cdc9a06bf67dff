// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable name constants for centralized management across the codebase
//!
//! ## Organization
//!
//! Environment variables are organized by functional area:
//! - **Logging**: Log level, configuration file and output format
//! - **Client**: Engine address, deadlines and connection pool

/// Logging environment variables
pub mod logging {
    /// Log level and filter directives (e.g., "debug", "openllm_llm=trace")
    pub const OPENLLM_LOG: &str = "OPENLLM_LOG";

    /// Path to logging configuration file
    pub const OPENLLM_LOGGING_CONFIG_PATH: &str = "OPENLLM_LOGGING_CONFIG_PATH";

    /// Enable JSONL logging format
    pub const OPENLLM_LOGGING_JSONL: &str = "OPENLLM_LOGGING_JSONL";

    /// Disable ANSI terminal colors in logs
    pub const OPENLLM_SDK_DISABLE_ANSI_LOGGING: &str = "OPENLLM_SDK_DISABLE_ANSI_LOGGING";

    /// Use local timezone for logging timestamps (default is UTC)
    pub const OPENLLM_LOG_USE_LOCAL_TZ: &str = "OPENLLM_LOG_USE_LOCAL_TZ";
}

/// Engine client environment variables
///
/// All of them are read through [`crate::config::ClientConfig::from_settings`].
pub mod client {
    /// Prefix shared by every client setting
    pub const PREFIX: &str = "OPENLLM_CLIENT_";

    /// Base URL of the inference engine (e.g., "http://localhost:8080")
    pub const OPENLLM_CLIENT_ENGINE_URL: &str = "OPENLLM_CLIENT_ENGINE_URL";

    /// Deadline in seconds for request/response calls
    pub const OPENLLM_CLIENT_REQUEST_TIMEOUT: &str = "OPENLLM_CLIENT_REQUEST_TIMEOUT";

    /// Deadline in seconds for a whole streaming call
    pub const OPENLLM_CLIENT_STREAM_TIMEOUT: &str = "OPENLLM_CLIENT_STREAM_TIMEOUT";

    /// TCP connect timeout in seconds
    pub const OPENLLM_CLIENT_CONNECT_TIMEOUT: &str = "OPENLLM_CLIENT_CONNECT_TIMEOUT";

    /// Maximum idle connections kept per host
    pub const OPENLLM_CLIENT_POOL_MAX_IDLE_PER_HOST: &str = "OPENLLM_CLIENT_POOL_MAX_IDLE_PER_HOST";

    /// Idle connection lifetime in seconds
    pub const OPENLLM_CLIENT_POOL_IDLE_TIMEOUT: &str = "OPENLLM_CLIENT_POOL_IDLE_TIMEOUT";

    /// User agent sent with every request
    pub const OPENLLM_CLIENT_USER_AGENT: &str = "OPENLLM_CLIENT_USER_AGENT";
}

