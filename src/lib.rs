//! Laer - Study Assistant with Capabilities and Artifacts
//!
//! A local-first CLI tool for studying with an LLM assistant that can call
//! capabilities and generate side artifacts (quizzes, study plans).
//!
//! The name "Laer" comes from the Norwegian word "lære," meaning "learn."
//!
//! # Overview
//!
//! Laer allows you to:
//! - Chat with a study assistant that routes requests to capabilities
//! - Generate quizzes and week-by-week study plans as side documents
//! - Keep every generated artifact as an append-only version history
//! - Serve the same assistant over HTTP with a streaming event protocol
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt template management
//! - `capability` - Capability units, input schemas and the registry
//! - `artifact` - Artifact events, channel, reducer and versioned store
//! - `model` - Chat backend seam over the OpenAI API
//! - `orchestrator` - The bounded dispatch loop driving each turn
//! - `cli` - Command-line interface and the HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use laer::artifact::open_store;
//! use laer::capability::standard_registry;
//! use laer::config::{Prompts, Settings};
//! use laer::orchestrator::{ChatMessage, Orchestrator, TurnOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::default();
//!     let registry = Arc::new(standard_registry(&settings, &prompts)?);
//!     let store = open_store(&settings)?;
//!
//!     let orchestrator = Arc::new(Orchestrator::new(
//!         &settings,
//!         prompts,
//!         registry,
//!         Some(store),
//!     ));
//!
//!     let conversation = vec![ChatMessage::user("Quiz me on Rust ownership")];
//!     let mut stream = orchestrator.stream_turn(conversation, TurnOptions::default());
//!
//!     use futures::StreamExt;
//!     while let Some(event) = stream.next().await {
//!         println!("{:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod capability;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod openai;
pub mod orchestrator;

pub use error::{LaerError, Result};
