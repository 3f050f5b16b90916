//! Console client: sends each line to a computer-use agent and prints its
//! progress as it streams.
//!
//! `AGENT_CHAT_PROVIDER` selects the backend (`mock`, the default, or `http`).
//! The http backend reads its settings from the JSON file named by
//! `AGENT_CHAT_CONFIG_PATH`. Logs go to stderr, filtered by `AGENT_CHAT_LOG`.

pub mod app;
pub mod backend;
pub mod commands;
pub mod config;
pub mod logging;
pub mod progress;
