//! # codex-mcp - code-intelligence tools over MCP
//!
//! Exposes a fixed set of tools (generate, review, test, convert,
//! architect) to an orchestrating agent and fulfils each call through a
//! Responses-style completion endpoint.
//!
//! ## Architecture
//!
//! - **`config`**: immutable [`ClientConfig`] loaded once from the environment
//! - **`request`**: outbound request body built from config and per-call [`RequestOptions`]
//! - **`client`**: [`CodexClient`], a single-attempt HTTP client with a per-call deadline
//! - **`sse`**: chunk-boundary-safe decoding of streamed text deltas
//! - **`response`**: response envelope and text extraction
//! - **`structured`**: JSON guard with raw-text fallback
//! - **`tools`** / **`format`**: tool registry and markdown rendering
//! - **`dispatch`**: per-tool orchestration that never fails outward
//! - **`server`**: `rmcp` handler serving the tools over stdio
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use codex_mcp::{ClientConfig, CodexClient, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("https://api.example.com/v1", "your-api-key");
//!     let client = CodexClient::new(Arc::new(config))?;
//!
//!     let options = RequestOptions::new("You are a helpful engineer.", "Write hello world in Rust.");
//!     let text = client.generate(&options).await?;
//!     println!("{}", text);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod format;
pub mod http;
pub mod request;
pub mod response;
pub mod server;
pub mod sse;
pub mod structured;
pub mod tools;

// Re-exports for convenience
pub use client::{CodexClient, CodexError, Completion};
pub use config::{ClientConfig, ConfigError, ReasoningEffort};
pub use dispatch::{Dispatcher, OutputKind, ToolReply};
pub use request::{OutputSchema, RequestOptions};
pub use response::ResponseEnvelope;
pub use server::CodexServer;
pub use sse::StreamEvent;
