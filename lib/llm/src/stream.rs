// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Token stream controller
//!
//! Owns one streaming inference call from request issuance to a terminal state:
//!
//! ```text
//! Idle -> Connecting -> Streaming -> Completed
//!              |            |------> Failed
//!              |------------+------> TimedOut
//!              |------------+------> Cancelled
//!              \-------------------> Failed (engine rejected the request)
//! ```
//!
//! Every stream invocation ends in exactly one of [`StreamObserver::on_complete`] or
//! [`StreamObserver::on_error`]. Tokens already delivered are never retracted.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt, TryStreamExt};
use openllm_runtime::CancellationToken;
use openllm_runtime::transports::{EngineTransport, TransportError, TransportRequest};
use openllm_runtime::utils::{Instant, Interrupt, until_deadline, until_deadline_or_cancelled};
use strum::Display;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::codec::{SseCodec, SseRecord};
use crate::error::{InferenceError, classify_rejection};
use crate::protocols::{
    AggregateInferenceResult, FinishReason, InferenceRequest, StreamToken, TokenIdType,
};

/// Engine route serving token streams
pub const STREAM_PATH: &str = "/v1/inference/stream";

/// Lifecycle of a single stream. The last four states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed
                | StreamState::Failed
                | StreamState::TimedOut
                | StreamState::Cancelled
        )
    }
}

/// Receives the outcome of a stream, in order, on the task driving it
pub trait StreamObserver: Send {
    /// Called once per token, after the running text and count include it
    fn on_token(&mut self, token: &StreamToken);

    fn on_complete(&mut self, result: AggregateInferenceResult);

    fn on_error(&mut self, error: InferenceError);
}

/// [`StreamObserver`] built from three closures
pub struct StreamCallbacks<T, C, E> {
    on_token: T,
    on_complete: C,
    on_error: E,
}

impl<T, C, E> StreamCallbacks<T, C, E>
where
    T: FnMut(&StreamToken) + Send,
    C: FnMut(AggregateInferenceResult) + Send,
    E: FnMut(InferenceError) + Send,
{
    pub fn new(on_token: T, on_complete: C, on_error: E) -> Self {
        Self {
            on_token,
            on_complete,
            on_error,
        }
    }
}

impl<T, C, E> StreamObserver for StreamCallbacks<T, C, E>
where
    T: FnMut(&StreamToken) + Send,
    C: FnMut(AggregateInferenceResult) + Send,
    E: FnMut(InferenceError) + Send,
{
    fn on_token(&mut self, token: &StreamToken) {
        (self.on_token)(token)
    }

    fn on_complete(&mut self, result: AggregateInferenceResult) {
        (self.on_complete)(result)
    }

    fn on_error(&mut self, error: InferenceError) {
        (self.on_error)(error)
    }
}

/// Stream outcome as a value, for consumers that prefer pulling
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(StreamToken),
    Completed(AggregateInferenceResult),
    Failed(InferenceError),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Token(_))
    }
}

/// Forwards callbacks into a channel; cancels the stream once the receiver is gone
struct ChannelObserver {
    tx: mpsc::UnboundedSender<StreamEvent>,
    cancel: CancellationToken,
}

impl ChannelObserver {
    fn send(&mut self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            self.cancel.cancel();
        }
    }
}

impl StreamObserver for ChannelObserver {
    fn on_token(&mut self, token: &StreamToken) {
        self.send(StreamEvent::Token(token.clone()));
    }

    fn on_complete(&mut self, result: AggregateInferenceResult) {
        self.send(StreamEvent::Completed(result));
    }

    fn on_error(&mut self, error: InferenceError) {
        self.send(StreamEvent::Failed(error));
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    text: String,
    tokens: u32,
    last_token_id: Option<TokenIdType>,
}

/// State machine for one streaming call
///
/// Each controller owns its connection, decoder buffer and accumulator; nothing is shared
/// between concurrent streams.
pub struct TokenStreamController {
    transport: Arc<dyn EngineTransport>,
    request: InferenceRequest,
    timeout: Duration,
    cancel: CancellationToken,
    codec: SseCodec,
    state: StreamState,
    acc: Accumulator,
    malformed_frames: u32,
}

impl TokenStreamController {
    /// `timeout` bounds the whole call, measured from when [`Self::run`] issues the request
    pub fn new(
        transport: Arc<dyn EngineTransport>,
        request: InferenceRequest,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            request,
            timeout,
            cancel: CancellationToken::new(),
            codec: SseCodec::new(),
            state: StreamState::Idle,
            acc: Accumulator::default(),
            malformed_frames: 0,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_codec(mut self, codec: SseCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive the stream to a terminal state, reporting to `observer` as it goes
    #[tracing::instrument(level = "debug", skip_all, fields(model_id = %self.request.model_id))]
    pub async fn run<O: StreamObserver + ?Sized>(mut self, observer: &mut O) -> StreamState {
        let deadline = Instant::now() + self.timeout;
        self.transition(StreamState::Connecting);

        let request = match TransportRequest::post_json(STREAM_PATH, &self.request) {
            Ok(request) => request.with_header("accept", "text/event-stream"),
            Err(e) => return self.fail(observer, e.into()),
        };

        let opened =
            until_deadline_or_cancelled(self.transport.open(request), deadline, &self.cancel).await;
        let response = match opened {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return self.fail(observer, e.into()),
            Err(interrupt) => return self.interrupted(observer, interrupt),
        };

        if !response.is_success() {
            let status = response.status;
            let body =
                until_deadline_or_cancelled(response.collect_body(), deadline, &self.cancel).await;
            let error = match body {
                Ok(Ok(body)) => classify_rejection(status, &body, &self.request.model_id),
                Ok(Err(e)) => e.into(),
                Err(interrupt) => return self.interrupted(observer, interrupt),
            };
            return self.fail(observer, error);
        }

        self.transition(StreamState::Streaming);

        let reader = StreamReader::new(response.body.map_err(io::Error::other));
        let frames = FramedRead::new(reader, self.codec.clone());
        let mut frames = until_deadline(frames, deadline, &self.cancel);

        while let Some(item) = frames.next().await {
            let record = match item {
                Ok(Ok(record)) => record,
                Ok(Err(e)) => return self.fail(observer, read_error(e).into()),
                Err(interrupt) => return self.interrupted(observer, interrupt),
            };

            let payload = match record {
                SseRecord::Data(payload) => payload,
                SseRecord::Event(name) => {
                    tracing::trace!(event = %name, "event line");
                    continue;
                }
                SseRecord::Ignored => continue,
            };

            let token = match serde_json::from_slice::<StreamToken>(&payload) {
                Ok(token) => token,
                Err(e) => {
                    self.malformed_frames += 1;
                    tracing::warn!(
                        error = %e,
                        payload = %String::from_utf8_lossy(&payload),
                        "skipping malformed stream record"
                    );
                    continue;
                }
            };

            if let Some(last) = self.acc.last_token_id
                && token.token_id <= last
            {
                self.malformed_frames += 1;
                tracing::warn!(
                    token_id = token.token_id,
                    last_token_id = last,
                    "skipping out of order stream token"
                );
                continue;
            }

            self.acc.last_token_id = Some(token.token_id);
            self.acc.text.push_str(&token.token);
            self.acc.tokens += 1;
            observer.on_token(&token);

            if token.complete {
                let result = self.aggregate();
                self.transition(StreamState::Completed);
                tracing::debug!(
                    tokens = result.tokens_generated,
                    finish_reason = %result.finish_reason,
                    malformed_frames = self.malformed_frames,
                    "stream completed"
                );
                observer.on_complete(result);
                return self.state;
            }
        }

        let error = InferenceError::UnexpectedTermination {
            tokens_received: self.acc.tokens,
        };
        self.fail(observer, error)
    }

    fn aggregate(&mut self) -> AggregateInferenceResult {
        let finish_reason = match self.request.max_tokens {
            Some(max) if self.acc.tokens >= max => FinishReason::Length,
            _ => FinishReason::Stop,
        };
        AggregateInferenceResult {
            model_id: self.request.model_id.clone(),
            text: std::mem::take(&mut self.acc.text),
            tokens_generated: self.acc.tokens,
            finish_reason,
        }
    }

    fn transition(&mut self, next: StreamState) {
        tracing::debug!(from = %self.state, to = %next, "stream state");
        self.state = next;
    }

    fn fail<O: StreamObserver + ?Sized>(
        &mut self,
        observer: &mut O,
        error: InferenceError,
    ) -> StreamState {
        let next = match error {
            InferenceError::DeadlineExceeded { .. } => StreamState::TimedOut,
            InferenceError::Cancelled => StreamState::Cancelled,
            _ => StreamState::Failed,
        };
        self.transition(next);
        tracing::debug!(
            error = %error,
            tokens = self.acc.tokens,
            malformed_frames = self.malformed_frames,
            "stream ended with error"
        );
        observer.on_error(error);
        self.state
    }

    fn interrupted<O: StreamObserver + ?Sized>(
        &mut self,
        observer: &mut O,
        interrupt: Interrupt,
    ) -> StreamState {
        let error = InferenceError::from_interrupt(interrupt, self.timeout);
        self.fail(observer, error)
    }
}

/// Recover the transport error behind a body read failure
fn read_error(err: io::Error) -> TransportError {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<TransportError>())
        .cloned()
        .unwrap_or_else(|| TransportError::Body(err.to_string()))
}

/// Run `controller` on a spawned task and expose its outcome as a stream of events
///
/// The event stream ends right after its terminal event. Dropping it cancels the call and
/// releases the connection without waiting for the next token.
pub fn spawn_events(controller: TokenStreamController) -> impl Stream<Item = StreamEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let receiver_gone = tx.clone();
    let cancel = controller.cancellation_token();
    let mut observer = ChannelObserver {
        tx,
        cancel: cancel.clone(),
    };
    tokio::spawn(async move {
        tokio::select! {
            _ = controller.run(&mut observer) => {}
            _ = receiver_gone.closed() => {
                tracing::debug!("event stream dropped, abandoning inference stream");
                cancel.cancel();
            }
        }
    });
    UnboundedReceiverStream::new(rx)
}
