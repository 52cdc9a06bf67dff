// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context as _;
use openllm_llm::protocols::{AggregateInferenceResult, ModelDescriptor, StreamToken};
use openllm_llm::{
    EngineClient, InferenceError, MemoryCatalog, RequestRouter, RoutingRequest, StreamObserver,
};
use openllm_runtime::transports::HttpTransport;
use openllm_runtime::{CancellationToken, ClientConfig};
use serde::Serialize;

mod flags;
pub use flags::{Command, Flags};
mod opt;
pub use opt::Output;

pub async fn run(flags: Flags, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_settings()?;
    flags.apply(&mut config);
    let client = client_for(&config, &flags)?;
    tracing::debug!(%config, "engine client ready");

    let out = flags.output;
    match &flags.command {
        Command::Health => print(out, &client.health().await?, |h| {
            format!("{} ({} models loaded)", h.status, h.models_loaded)
        }),
        Command::Models => {
            let models = client.list_models().await?;
            print(out, &models, |models| {
                models.iter().map(model_line).collect::<Vec<_>>().join("\n")
            })
        }
        Command::Register(args) => {
            let response = client.register_model(&args.request()).await?;
            print(out, &response, |r| r.message.clone())
        }
        Command::Load { model_id } => {
            let response = client.load_model(model_id).await?;
            print(out, &response, |r| r.message.clone())
        }
        Command::Unload { model_id } => {
            let response = client.unload_model(model_id).await?;
            print(out, &response, |r| r.message.clone())
        }
        Command::Infer(args) => {
            let response = client.infer_with_cancel(&args.request(), &cancel).await?;
            print(out, &response, |r| r.text.clone())
        }
        Command::Stream(args) => {
            let mut printer = Printer::new(out);
            client
                .stream_with_cancel(args.request(), &mut printer, cancel)
                .await;
            printer.finish()
        }
        Command::Route(args) => {
            let catalog = Arc::new(MemoryCatalog::new());
            client
                .sync_catalog(&catalog)
                .await
                .context("failed to read the engine's model registry")?;

            let mut request =
                RoutingRequest::new(args.prompt.clone()).with_criteria(args.criteria());
            request.model_id = args.model.clone();
            request.max_tokens = args.generation.max_tokens;
            request.temperature = args.generation.temperature;

            let router = RequestRouter::new(client, catalog);
            if args.stream {
                let mut printer = Printer::new(out);
                let inference = router.prepare(&request)?;
                router
                    .client()
                    .stream_with_cancel(inference, &mut printer, cancel)
                    .await;
                printer.finish()
            } else {
                let response = router.route(&request).await?;
                print(out, &response, |r| r.text.clone())
            }
        }
    }
}

fn client_for(config: &ClientConfig, flags: &Flags) -> anyhow::Result<EngineClient> {
    match flags.timeout {
        // keep sub-second precision the config cannot express
        Some(timeout) => {
            let transport = HttpTransport::new(config)?;
            Ok(EngineClient::with_transport(
                Arc::new(transport),
                timeout,
                timeout,
            ))
        }
        None => Ok(EngineClient::new(config)?),
    }
}

fn model_line(model: &ModelDescriptor) -> String {
    format!(
        "{}\t{}\t{}\t[{}]\t{}",
        model.id,
        model.inference,
        model.context,
        model.capabilities,
        if model.loaded { "loaded" } else { "-" }
    )
}

fn print<T: Serialize>(
    out: Output,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match out {
        Output::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Output::Text => println!("{}", text(value)),
    }
    Ok(())
}

/// Writes tokens to stdout as they arrive
struct Printer {
    out: Output,
    result: Option<AggregateInferenceResult>,
    error: Option<InferenceError>,
}

impl Printer {
    fn new(out: Output) -> Self {
        Self {
            out,
            result: None,
            error: None,
        }
    }

    fn finish(self) -> anyhow::Result<()> {
        if let Some(error) = self.error {
            if self.out == Output::Text {
                println!();
            }
            return Err(error.into());
        }
        match (self.out, self.result) {
            (Output::Json, Some(result)) => {
                println!("{}", serde_json::to_string_pretty(&result)?)
            }
            (Output::Text, Some(_)) => println!(),
            (_, None) => anyhow::bail!("stream ended without a result"),
        }
        Ok(())
    }
}

impl StreamObserver for Printer {
    fn on_token(&mut self, token: &StreamToken) {
        if self.out == Output::Text {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "{}", token.token);
            let _ = stdout.flush();
        }
    }

    fn on_complete(&mut self, result: AggregateInferenceResult) {
        self.result = Some(result);
    }

    fn on_error(&mut self, error: InferenceError) {
        self.error = Some(error);
    }
}
