// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Server-sent event line decoder
//!
//! Splits an incrementally arriving byte stream into newline terminated records. Bytes after
//! the last newline stay buffered until the next chunk completes them, so the decoded
//! sequence does not depend on where the transport split the body.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Largest record accepted before the stream is treated as corrupt (1 MiB)
pub const DEFAULT_MAX_RECORD_LEN: usize = 1024 * 1024;

const DATA_FIELD: &[u8] = b"data:";
const EVENT_FIELD: &[u8] = b"event:";

/// One decoded line of the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseRecord {
    /// Payload of a `data:` line, marker and one leading space removed
    Data(Bytes),
    /// Name from an `event:` line
    Event(String),
    /// Blank lines, `:` comments, `id:`, `retry:` and unknown fields
    Ignored,
}

impl SseRecord {
    fn parse(line: Bytes) -> Self {
        if line.is_empty() || line[0] == b':' {
            return SseRecord::Ignored;
        }
        if line.starts_with(DATA_FIELD) {
            return SseRecord::Data(field_value(line, DATA_FIELD.len()));
        }
        if line.starts_with(EVENT_FIELD) {
            let value = field_value(line, EVENT_FIELD.len());
            return SseRecord::Event(String::from_utf8_lossy(&value).into_owned());
        }
        SseRecord::Ignored
    }
}

fn field_value(line: Bytes, marker_len: usize) -> Bytes {
    let mut value = line.slice(marker_len..);
    if value.first() == Some(&b' ') {
        value = value.slice(1..);
    }
    value
}

/// [`Decoder`] for `text/event-stream` bodies
#[derive(Debug, Clone)]
pub struct SseCodec {
    max_record_len: usize,
    /// Where to resume the newline scan; bytes before it are known not to contain one
    next_index: usize,
}

impl SseCodec {
    pub fn new() -> Self {
        Self::with_max_record_len(DEFAULT_MAX_RECORD_LEN)
    }

    pub fn with_max_record_len(max_record_len: usize) -> Self {
        Self {
            max_record_len,
            next_index: 0,
        }
    }

    pub fn max_record_len(&self) -> usize {
        self.max_record_len
    }

    fn too_long(&self, len: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "event stream record too large: {} bytes (max: {} bytes)",
                len, self.max_record_len
            ),
        )
    }
}

impl Default for SseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for SseCodec {
    type Item = SseRecord;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            if src.len() > self.max_record_len {
                return Err(self.too_long(src.len()));
            }
            self.next_index = src.len();
            return Ok(None);
        };

        let newline = self.next_index + offset;
        self.next_index = 0;
        if newline > self.max_record_len {
            return Err(self.too_long(newline));
        }

        let mut line = src.split_to(newline + 1);
        line.truncate(newline);
        if line.last() == Some(&b'\r') {
            line.truncate(newline - 1);
        }

        let record = SseRecord::parse(line.freeze());
        tracing::trace!(?record, "decoded event stream record");
        Ok(Some(record))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        if !src.is_empty() {
            tracing::debug!(
                bytes = src.len(),
                "dropping unterminated record at end of event stream"
            );
            src.clear();
        }
        self.next_index = 0;
        Ok(None)
    }
}
