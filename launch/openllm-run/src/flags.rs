// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use openllm_llm::SelectionCriteria;
use openllm_llm::model_type::{InferenceBackend, LatencyProfile, ModelCapabilities};
use openllm_llm::protocols::{InferenceRequest, ModelDescriptor, RegisterModelRequest};
use openllm_runtime::ClientConfig;

use crate::opt::Output;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Command line client for an OpenLLM inference engine")]
pub struct Flags {
    /// Engine base URL. Overrides OPENLLM_CLIENT_ENGINE_URL and the config files.
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Deadline for the whole call, e.g. `30s` or `5m`.
    /// Replaces both the request and the stream timeout.
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Output format: json or text
    #[arg(long, global = true, default_value_t = Output::Json)]
    pub output: Output,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check that the engine is up
    Health,

    /// List the models registered with the engine
    Models,

    /// Register a model with the engine
    Register(RegisterArgs),

    /// Load a registered model into memory
    Load { model_id: String },

    /// Unload a model, keeping it registered
    Unload { model_id: String },

    /// Run a request/response inference
    Infer(InferArgs),

    /// Stream tokens to stdout as they are generated. Ctrl-C cancels.
    Stream(InferArgs),

    /// Pick a model from the engine's registry, then run inference on it
    Route(RouteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    pub id: String,

    /// Display name, defaults to the id
    #[arg(long)]
    pub name: Option<String>,

    /// ollama, llama, huggingface or openai
    #[arg(long)]
    pub backend: InferenceBackend,

    /// Context window in tokens
    #[arg(long)]
    pub context: u32,

    /// Comma separated capabilities, e.g. `chat,vision`
    #[arg(long, default_value = "chat")]
    pub capabilities: ModelCapabilities,

    /// extreme, fast or slow
    #[arg(long)]
    pub latency: Option<LatencyProfile>,

    #[arg(long)]
    pub quant: Option<String>,

    #[arg(long)]
    pub size_bytes: Option<u64>,
}

impl RegisterArgs {
    pub fn request(&self) -> RegisterModelRequest {
        let mut model = ModelDescriptor::new(self.id.clone(), self.backend, self.context)
            .with_capabilities(self.capabilities);
        if let Some(name) = &self.name {
            model = model.with_name(name.clone());
        }
        if let Some(latency) = self.latency {
            model = model.with_latency(latency);
        }
        if let Some(quant) = &self.quant {
            model = model.with_quant(quant.clone());
        }

        let mut request = RegisterModelRequest::from(&model);
        request.size_bytes = self.size_bytes;
        request
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerationArgs {
    /// Upper bound on generated tokens, engine default when unset
    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f32>,
}

#[derive(Args, Debug, Clone)]
pub struct InferArgs {
    #[arg(long)]
    pub model: String,

    pub prompt: String,

    #[command(flatten)]
    pub generation: GenerationArgs,
}

impl InferArgs {
    pub fn request(&self) -> InferenceRequest {
        InferenceRequest {
            model_id: self.model.clone(),
            prompt: self.prompt.clone(),
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    pub prompt: String,

    /// Use this model instead of selecting one
    #[arg(long)]
    pub model: Option<String>,

    /// Required capabilities, comma separated
    #[arg(long)]
    pub capability: Option<ModelCapabilities>,

    #[arg(long)]
    pub latency: Option<LatencyProfile>,

    #[arg(long)]
    pub backend: Option<InferenceBackend>,

    /// Smallest acceptable context window
    #[arg(long)]
    pub min_context: Option<u32>,

    /// Stream the answer instead of waiting for it
    #[arg(long)]
    pub stream: bool,

    #[command(flatten)]
    pub generation: GenerationArgs,
}

impl RouteArgs {
    pub fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria {
            capability: self.capability,
            latency: self.latency,
            backend: self.backend,
            min_context: self.min_context,
        }
    }
}

impl Flags {
    /// Apply command line overrides on top of the loaded settings
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.url {
            config.engine_url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            // whole seconds for the config; the exact value is applied by the caller
            let secs = timeout.as_secs().max(1);
            config.request_timeout_secs = secs;
            config.stream_timeout_secs = secs;
        }
    }
}
