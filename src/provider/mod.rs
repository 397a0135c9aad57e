//! LLM Provider layer
//!
//! `ChatModel` is the seam agents depend on. `ProviderClient` implements it for
//! any API implementing the OpenAI chat completions spec.

mod client;
mod config;
mod model;

pub use client::*;
pub use config::*;
pub use model::*;
