//! Adapter for the OpenAI assistants API (v2)

mod client;
mod gateway;
pub mod stream;
pub mod types;

pub use client::OpenAIClient;
pub use gateway::AssistantGateway;
