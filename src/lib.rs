//! question-relay: a single-endpoint prompt relay.
//!
//! Accepts `{"prompt": "..."}` over HTTP, forwards it as the user turn of a
//! one-shot chat to an OpenAI-compatible completion API, and returns
//! `{"content": "..."}` or `{"error": "..."}`.

pub mod config;
pub mod provider;
pub mod relay;
pub mod server;
