// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Deadline and cancellation guards for futures and streams.
//!
//! A deadline and a [`CancellationToken`] are raced against the guarded work. Cancellation is
//! checked before the deadline, so a caller cancel that races an expiring deadline is reported
//! as [`Interrupt::Cancelled`].

use futures::stream::{Stream, StreamExt};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::time::{Instant, Sleep, sleep_until};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Why guarded work stopped before it finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupt {
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("cancelled")]
    Cancelled,
}

/// Run `fut` until it completes, the deadline passes or `cancel` fires.
pub async fn until_deadline_or_cancelled<F: Future>(
    fut: F,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<F::Output, Interrupt> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        _ = sleep_until(deadline) => Err(Interrupt::DeadlineExceeded),
        out = fut => Ok(out),
    }
}

/// Stream adapter that ends with a single `Err(Interrupt)` when the deadline passes or the
/// token is cancelled. Items already yielded are unaffected.
pub struct DeadlineStream<S> {
    stream: S,
    sleep: Pin<Box<Sleep>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    done: bool,
}

impl<S: Stream + Unpin> Stream for DeadlineStream<S> {
    type Item = Result<S::Item, Interrupt>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        if self.cancelled.as_mut().poll(cx).is_ready() {
            self.done = true;
            tracing::trace!("DeadlineStream: cancelled");
            return Poll::Ready(Some(Err(Interrupt::Cancelled)));
        }

        if self.sleep.as_mut().poll(cx).is_ready() {
            self.done = true;
            tracing::trace!("DeadlineStream: deadline exceeded");
            return Poll::Ready(Some(Err(Interrupt::DeadlineExceeded)));
        }

        let val = self.stream.poll_next_unpin(cx);
        match &val {
            Poll::Ready(Some(_)) => tracing::trace!("DeadlineStream: received item"),
            Poll::Ready(None) => {
                self.done = true;
                tracing::trace!("DeadlineStream: underlying stream ended");
            }
            Poll::Pending => {}
        }
        val.map(|item| item.map(Ok))
    }
}

/// Guard `stream` with an absolute deadline and a cancellation token.
pub fn until_deadline<S: Stream + Unpin>(
    stream: S,
    deadline: Instant,
    cancel: &CancellationToken,
) -> DeadlineStream<S> {
    DeadlineStream {
        stream,
        sleep: Box::pin(sleep_until(deadline)),
        cancelled: Box::pin(cancel.clone().cancelled_owned()),
        done: false,
    }
}
