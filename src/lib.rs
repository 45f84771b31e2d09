//! # docchat
//!
//! Session-scoped retrieval-augmented chat over uploaded documents.
//!
//! A user uploads a file; docchat converts it into overlapping text chunks,
//! builds a per-document vector index in SQLite, and answers questions
//! against that index using locally-hosted Ollama models. Questions about
//! code route to a code-specialized model; everything else goes to the
//! general chat model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────┐
//! │  Reader   │──▶│ Chunk + Embed │──▶│   SQLite    │
//! │ PDF/DOCX │   │   (Ollama)    │   │ per-doc idx │
//! │ /text    │   └───────────────┘   └──────┬──────┘
//! └──────────┘                              │
//!        ┌──────────────┐   ┌───────────────┤
//!        │ ChatManager  │──▶│ QueryPipeline │
//!        │  (sessions)  │   │ route+retrieve│
//!        └──────────────┘   │  +summarize   │
//!                           └───────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`reader`] | File-to-document conversion (PDF, DOCX, plain text) |
//! | [`chunk`] | Overlapping fixed-window chunking |
//! | [`index`] | Per-document vector index store |
//! | [`llm`] | Ollama generation/embedding client |
//! | [`router`] | Keyword-based model routing |
//! | [`pipeline`] | Retrieval + tree-style answer synthesis |
//! | [`ingest`] | Index construction for an uploaded file |
//! | [`session`] | Session/message persistence |
//! | [`chat`] | Session orchestrator |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod router;
pub mod session;
