pub mod app;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handler;
pub mod state;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use client::{ChatRequest, ChatResponse, ChatTransport, ChatbotClient, HealthStatus};
pub use config::Config;
pub use conversation::{Conversation, Submission, FALLBACK_REPLY};
pub use error::TransportError;
pub use state::{ChatMessage, ChatRole};
