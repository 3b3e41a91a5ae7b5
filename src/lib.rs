#![deny(missing_docs)]

//! Core library for the retrieval-augmented chat server.

/// HTTP routing and REST handlers.
pub mod api;
/// Conversational retrieval pipeline.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Language model abstraction and the Groq adapter.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Session-scoped conversation memory.
pub mod memory;
/// Vector store abstraction and the MongoDB Atlas adapter.
pub mod vector_store;
