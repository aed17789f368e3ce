//! Output capture
//!
//! Reader tasks own the child's pipes and forward raw chunks as
//! [`ProcessEvent`]s onto the handle's single ordered channel. Decoding happens
//! on the consuming side in [`TextBuffer`], which tolerates multi-byte
//! sequences split across chunk boundaries.

use std::fmt;
use std::io;
use std::process::ExitStatus;

use futures::StreamExt;
use tokio::io::{AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Which pipe a chunk was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Lifecycle and output notifications, applied serially by the handle
#[derive(Debug)]
pub(crate) enum ProcessEvent {
    Output { stream: StreamKind, data: Vec<u8> },
    Exited(ExitStatus),
    Failed(io::Error),
}

/// Forward every chunk of `reader` until EOF or a read error
pub(crate) async fn forward_stream<R>(
    pid: u32,
    stream: StreamKind,
    reader: R,
    tx: UnboundedSender<ProcessEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut chunks = ReaderStream::new(BufReader::new(reader));
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => {
                let event = ProcessEvent::Output {
                    stream,
                    data: bytes.to_vec(),
                };
                if tx.send(event).is_err() {
                    // Handle dropped
                    return;
                }
            }
            Err(e) => {
                warn!(pid = %pid, %stream, error = %e, "Failed to read process output");
                return;
            }
        }
    }
    debug!(pid = %pid, %stream, "Output stream closed");
}

/// Append-only text accumulated from the child's output streams
///
/// Each stream keeps its own undecoded remainder, so a sequence split on one
/// pipe is never completed by bytes from the other.
#[derive(Debug, Default)]
pub(crate) struct TextBuffer {
    text: String,
    /// Trailing bytes of an incomplete UTF-8 sequence, per stream
    pending: [Vec<u8>; 2],
}

impl TextBuffer {
    fn slot(stream: StreamKind) -> usize {
        match stream {
            StreamKind::Stdout => 0,
            StreamKind::Stderr => 1,
        }
    }

    pub(crate) fn push(&mut self, stream: StreamKind, chunk: &[u8]) {
        let slot = Self::slot(stream);
        let mut bytes = std::mem::take(&mut self.pending[slot]);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending[slot] = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush incomplete trailing sequences once no more bytes will arrive
    pub(crate) fn finish(&mut self) {
        for pending in &mut self.pending {
            if !pending.is_empty() {
                pending.clear();
                self.text.push(char::REPLACEMENT_CHARACTER);
            }
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    /// Text appended after the first `offset` bytes
    ///
    /// Offsets past the end, or inside a character, yield nothing.
    pub(crate) fn since(&self, offset: usize) -> &str {
        self.text.get(offset..).unwrap_or_default()
    }
}
