// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use openllm_llm::protocols::{AggregateInferenceResult, FinishReason, InferenceRequest, StreamToken};
use openllm_llm::{
    EngineClient, InferenceError, StreamCallbacks, StreamEvent, StreamObserver, StreamState,
    TokenStreamController,
};
use openllm_runtime::CancellationToken;
use openllm_runtime::transports::{
    EngineTransport, TransportError, TransportRequest, TransportResponse,
};

#[derive(Clone, Copy)]
enum Step {
    Send(&'static str),
    Wait(Duration),
}

/// Transport that plays back a fixed script of body chunks and pauses
struct ScriptedTransport {
    connect_delay: Duration,
    steps: Vec<Step>,
    hang_after_script: bool,
    opened: AtomicUsize,
    body_released: Arc<AtomicBool>,
}

/// Raises its flag when the response body is dropped
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            connect_delay: Duration::ZERO,
            steps,
            hang_after_script: false,
            opened: AtomicUsize::new(0),
            body_released: Arc::new(AtomicBool::new(false)),
        }
    }

    fn hanging(mut self) -> Self {
        self.hang_after_script = true;
        self
    }

    fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }
}

#[async_trait]
impl EngineTransport for ScriptedTransport {
    async fn open(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        assert_eq!(request.path, "/v1/inference/stream");
        assert_eq!(
            request.headers.get("accept").map(String::as_str),
            Some("text/event-stream")
        );
        self.opened.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.connect_delay).await;

        let steps = self.steps.clone();
        let hang = self.hang_after_script;
        let released = ReleaseFlag(self.body_released.clone());
        let body = stream! {
            let _released = released;
            for step in steps {
                match step {
                    Step::Send(chunk) => {
                        yield Ok::<_, TransportError>(Bytes::from_static(chunk.as_bytes()))
                    }
                    Step::Wait(delay) => tokio::time::sleep(delay).await,
                }
            }
            if hang {
                futures::future::pending::<()>().await;
            }
        };
        Ok(TransportResponse::new(200, Box::pin(body)))
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Default)]
struct Recorder {
    tokens: Vec<StreamToken>,
    completed: Vec<AggregateInferenceResult>,
    errors: Vec<InferenceError>,
}

impl StreamObserver for Recorder {
    fn on_token(&mut self, token: &StreamToken) {
        self.tokens.push(token.clone());
    }

    fn on_complete(&mut self, result: AggregateInferenceResult) {
        self.completed.push(result);
    }

    fn on_error(&mut self, error: InferenceError) {
        self.errors.push(error);
    }
}

fn controller(transport: ScriptedTransport, timeout: Duration) -> TokenStreamController {
    TokenStreamController::new(
        Arc::new(transport),
        InferenceRequest::new("llama3", "say hi"),
        timeout,
    )
}

#[tokio::test]
async fn test_tokens_then_completion() {
    let transport = ScriptedTransport::new(vec![
        Step::Send("data: {\"token\":\"Hi\",\"token_id\":0,\"complete\":false}\n"),
        Step::Send("data: {\"token\":\"!\",\"token_id\":1,\"complete\":true}\n"),
    ]);

    let mut tokens = Vec::new();
    let mut completed = Vec::new();
    let mut errors = Vec::new();
    let mut callbacks = StreamCallbacks::new(
        |t: &StreamToken| tokens.push(t.token.clone()),
        |r: AggregateInferenceResult| completed.push(r),
        |e: InferenceError| errors.push(e),
    );

    let state = controller(transport, Duration::from_secs(5))
        .run(&mut callbacks)
        .await;
    drop(callbacks);

    assert_eq!(state, StreamState::Completed);
    assert_eq!(tokens, vec!["Hi", "!"]);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].text, "Hi!");
    assert_eq!(completed[0].tokens_generated, 2);
    assert_eq!(completed[0].model_id, "llama3");
    assert_eq!(completed[0].finish_reason, FinishReason::Stop);
    assert!(errors.is_empty());
}

#[tokio::test]
async fn test_records_split_across_chunks() {
    let transport = ScriptedTransport::new(vec![
        Step::Send(": keep-alive\r\n\r\nevent: tok"),
        Step::Send("en\r\ndata: {\"token\":\"He\",\"tok"),
        Step::Send("en_id\":0}\r\n\r\nevent: token\ndata: {\"token\":\"llo\",\"token_id\":1,"),
        Step::Send("\"complete\":true}\n\n"),
    ]);
    let mut recorder = Recorder::default();
    let state = controller(transport, Duration::from_secs(5))
        .run(&mut recorder)
        .await;

    assert_eq!(state, StreamState::Completed);
    assert_eq!(recorder.tokens.len(), 2);
    assert!(!recorder.tokens[0].complete);
    assert_eq!(recorder.completed[0].text, "Hello");
}

#[tokio::test]
async fn test_close_without_completion_token() {
    let transport = ScriptedTransport::new(vec![Step::Send(
        "data: {\"token\":\"Hi\",\"token_id\":0,\"complete\":false}\n",
    )]);
    let mut recorder = Recorder::default();
    let state = controller(transport, Duration::from_secs(5))
        .run(&mut recorder)
        .await;

    assert_eq!(state, StreamState::Failed);
    assert_eq!(recorder.tokens.len(), 1);
    assert!(recorder.completed.is_empty());
    assert_eq!(
        recorder.errors,
        vec![InferenceError::UnexpectedTermination { tokens_received: 1 }]
    );
}

#[tokio::test]
async fn test_invalid_json_record_is_skipped() {
    let transport = ScriptedTransport::new(vec![
        Step::Send("data: {\"token\":\"a\",\"token_id\":0,\"complete\":false}\n"),
        Step::Send("data: {not json\n"),
        Step::Send("data: {\"token\":\"b\",\"token_id\":1,\"complete\":true}\n"),
    ]);
    let mut recorder = Recorder::default();
    let state = controller(transport, Duration::from_secs(5))
        .run(&mut recorder)
        .await;

    assert_eq!(state, StreamState::Completed);
    assert_eq!(recorder.completed[0].text, "ab");
    assert_eq!(recorder.completed[0].tokens_generated, 2);
    assert!(recorder.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_mid_stream_keeps_delivered_tokens() {
    let transport = ScriptedTransport::new(vec![
        Step::Send("data: {\"token\":\"one\",\"token_id\":0,\"complete\":false}\n"),
        Step::Wait(Duration::from_millis(200)),
        Step::Send("data: {\"token\":\" two\",\"token_id\":1,\"complete\":false}\n"),
    ])
    .hanging();

    let mut recorder = Recorder::default();
    let state = controller(transport, Duration::from_secs(1))
        .run(&mut recorder)
        .await;

    assert_eq!(state, StreamState::TimedOut);
    assert_eq!(recorder.tokens.len(), 2);
    assert!(recorder.completed.is_empty());
    assert_eq!(
        recorder.errors,
        vec![InferenceError::DeadlineExceeded {
            timeout: Duration::from_secs(1)
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_covers_connect() {
    let transport = ScriptedTransport::new(vec![Step::Send(
        "data: {\"token\":\"late\",\"token_id\":0,\"complete\":true}\n",
    )])
    .with_connect_delay(Duration::from_secs(10));

    let mut recorder = Recorder::default();
    let state = controller(transport, Duration::from_secs(1))
        .run(&mut recorder)
        .await;

    assert_eq!(state, StreamState::TimedOut);
    assert!(recorder.tokens.is_empty());
    assert_eq!(recorder.errors.len(), 1);
    assert!(recorder.errors[0].is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_stream() {
    let transport = ScriptedTransport::new(vec![
        Step::Send("data: {\"token\":\"one\",\"token_id\":0,\"complete\":false}\n"),
        Step::Wait(Duration::from_secs(10)),
        Step::Send("data: {\"token\":\" two\",\"token_id\":1,\"complete\":true}\n"),
    ]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let mut recorder = Recorder::default();
    let state = controller(transport, Duration::from_secs(60))
        .with_cancellation(cancel)
        .run(&mut recorder)
        .await;

    assert_eq!(state, StreamState::Cancelled);
    assert_eq!(recorder.tokens.len(), 1);
    assert!(recorder.completed.is_empty());
    assert_eq!(recorder.errors, vec![InferenceError::Cancelled]);
}

#[tokio::test]
async fn test_cancelled_before_start_never_delivers() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::Send(
        "data: {\"token\":\"x\",\"token_id\":0,\"complete\":true}\n",
    )]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut recorder = Recorder::default();
    let state = TokenStreamController::new(
        transport.clone(),
        InferenceRequest::new("llama3", "p"),
        Duration::from_secs(5),
    )
    .with_cancellation(cancel)
    .run(&mut recorder)
    .await;

    assert_eq!(state, StreamState::Cancelled);
    assert!(recorder.tokens.is_empty());
    assert_eq!(recorder.errors, vec![InferenceError::Cancelled]);
}

#[tokio::test]
async fn test_concurrent_streams_are_independent() {
    let left = ScriptedTransport::new(vec![
        Step::Send("data: {\"token\":\"left\",\"token_id\":0,\"complete\":false}\n"),
        Step::Send("data: {\"token\":\"!\",\"token_id\":1,\"complete\":true}\n"),
    ]);
    let right = ScriptedTransport::new(vec![Step::Send(
        "data: {\"token\":\"right\",\"token_id\":7,\"complete\":true}\n",
    )]);

    let mut left_recorder = Recorder::default();
    let mut right_recorder = Recorder::default();
    let (left_state, right_state) = tokio::join!(
        controller(left, Duration::from_secs(5)).run(&mut left_recorder),
        controller(right, Duration::from_secs(5)).run(&mut right_recorder),
    );

    assert_eq!(left_state, StreamState::Completed);
    assert_eq!(right_state, StreamState::Completed);
    assert_eq!(left_recorder.completed[0].text, "left!");
    assert_eq!(right_recorder.completed[0].text, "right");
    assert_eq!(right_recorder.completed[0].tokens_generated, 1);
}

#[tokio::test]
async fn test_client_stream_events() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::Send("event: token\ndata: {\"token\":\"Hi\",\"token_id\":0}\n\n"),
        Step::Send("event: token\ndata: {\"token\":\"!\",\"token_id\":1,\"complete\":true}\n\n"),
    ]));
    let client = EngineClient::with_transport(
        transport.clone(),
        Duration::from_secs(5),
        Duration::from_secs(5),
    );

    let events: Vec<StreamEvent> = client
        .stream_events(
            InferenceRequest::new("llama3", "say hi"),
            CancellationToken::new(),
        )
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[1], StreamEvent::Token(t) if t.token == "!" && t.complete));
    match &events[2] {
        StreamEvent::Completed(result) => assert_eq!(result.text, "Hi!"),
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(transport.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_event_stream_releases_connection() {
    let transport = Arc::new(
        ScriptedTransport::new(vec![Step::Send(
            "data: {\"token\":\"one\",\"token_id\":0,\"complete\":false}\n",
        )])
        .hanging(),
    );
    let released = transport.body_released.clone();
    let client = EngineClient::with_transport(
        transport.clone(),
        Duration::from_secs(5),
        Duration::from_secs(300),
    );
    let cancel = CancellationToken::new();
    let started = tokio::time::Instant::now();

    let mut events = Box::pin(client.stream_events(
        InferenceRequest::new("llama3", "say hi"),
        cancel.clone(),
    ));
    assert!(matches!(events.next().await, Some(StreamEvent::Token(t)) if t.token == "one"));
    assert!(!released.load(Ordering::SeqCst));

    drop(events);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(released.load(Ordering::SeqCst));
    assert!(cancel.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(1));
}
