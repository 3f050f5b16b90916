//! Transport primitives for the agent chat stream.
//!
//! This crate owns framing, record classification and the HTTP clients for
//! the streaming chat endpoint and the instance lifecycle API. It carries no
//! transcript state; folding records into messages happens in the caller.
//!
//! The stream is newline-delimited JSON. Lines starting with `:` are
//! keepalives and never reach the classifier.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod instance;
pub mod lines;
pub mod payload;
pub mod records;
pub mod retry;
pub mod stream;
pub mod url;

pub use client::{await_or_cancel, ChatApiClient};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use instance::InstanceClient;
pub use lines::{encode_line, LineDecoder, KEEPALIVE_LINE};
pub use payload::ChatRequest;
pub use records::{classify_line, ErrorCategory, Record};
pub use stream::{RecordSource, RecordStream};
pub use url::normalize_chat_url;
