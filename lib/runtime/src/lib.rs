// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! OpenLLM client runtime
//!
//! Configuration, logging, deadline/cancellation guards and the transport used to reach the
//! inference engine.

pub use anyhow::{
    Context as ErrorContext, Error, Ok as OK, Result, anyhow as error, bail as raise,
};

pub mod config;
pub use config::{ClientConfig, ClientConfigBuilder};

pub mod logging;
pub mod transports;
pub mod utils;

pub use tokio_util::sync::CancellationToken;
