use std::collections::VecDeque;
use std::future::Future;

use agent_provider::CancelSignal;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::client::await_or_cancel;
use crate::error::ChatApiError;
use crate::lines::LineDecoder;
use crate::records::{classify_line, Record};

/// Pull-based source of classified records for one streamed response.
///
/// `None` means the source is exhausted. A cancelled source yields
/// `Err(ChatApiError::Cancelled)` once and is exhausted afterwards.
pub trait RecordSource {
    fn next_record(
        &mut self,
    ) -> impl Future<Output = Option<Result<Record, ChatApiError>>> + Send;
}

/// Frame decoder read loop over a chunked byte stream.
///
/// Every line of a chunk that has already been read is classified and handed
/// out before the cancel signal is consulted again; the signal is checked
/// before each read and while a read is pending.
pub struct RecordStream {
    chunks: Option<BoxStream<'static, Result<Vec<u8>, ChatApiError>>>,
    decoder: LineDecoder,
    pending: VecDeque<Record>,
    cancel: CancelSignal,
    reads: usize,
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("pending", &self.pending.len())
            .field("reads", &self.reads)
            .finish_non_exhaustive()
    }
}

impl RecordStream {
    pub fn new<S, B>(chunks: S, cancel: CancelSignal) -> Self
    where
        S: Stream<Item = Result<B, ChatApiError>> + Send + 'static,
        B: Into<Vec<u8>>,
    {
        Self {
            chunks: Some(chunks.map(|chunk| chunk.map(Into::into)).boxed()),
            decoder: LineDecoder::default(),
            pending: VecDeque::new(),
            cancel,
            reads: 0,
        }
    }

    /// Number of chunk reads issued against the underlying stream.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// True once the underlying byte stream has been dropped.
    pub fn is_released(&self) -> bool {
        self.chunks.is_none()
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    fn release(&mut self) {
        if self.chunks.take().is_some() {
            let discarded = self.decoder.finish();
            if discarded > 0 {
                debug!(discarded, "discarded incomplete trailing line");
            }
        }
    }

    pub async fn next_record(&mut self) -> Option<Result<Record, ChatApiError>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }

            if let Some(reason) = self.cancel.reason() {
                if self.is_released() {
                    return None;
                }
                self.release();
                return Some(Err(ChatApiError::Cancelled(reason)));
            }

            let chunks = self.chunks.as_mut()?;
            self.reads += 1;
            let next = await_or_cancel(chunks.next(), Some(&self.cancel)).await;

            match next {
                Ok(Some(Ok(chunk))) => {
                    let lines = self.decoder.feed(&chunk);
                    self.pending.extend(lines.iter().map(|line| classify_line(line)));
                }
                Ok(None) => {
                    self.release();
                    return None;
                }
                Ok(Some(Err(error))) | Err(error) => {
                    self.release();
                    return Some(Err(error));
                }
            }
        }
    }
}

impl RecordSource for RecordStream {
    fn next_record(
        &mut self,
    ) -> impl Future<Output = Option<Result<Record, ChatApiError>>> + Send {
        RecordStream::next_record(self)
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.release();
    }
}
