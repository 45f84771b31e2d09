//! Core data types that flow through the ingestion and query pipeline.

use serde::{Deserialize, Serialize};

/// A unit of text produced by the document reader. Immutable once produced;
/// consumed by the chunker during index construction.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A bounded window of a document's text, ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// Persistent record binding one uploaded document to its conversation.
/// Timestamps are unix seconds (UTC).
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub filename: String,
    pub file_path: String,
    pub created_at: i64,
    pub last_accessed: i64,
    pub message_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> MessageRole {
        match s {
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }
}

/// One chat message. Append-only; ordered by `created_at` within a session.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Display marker shown next to the message, if any.
    pub avatar: Option<String>,
    pub created_at: i64,
}

/// A chunk returned from similarity search, highest-scoring first.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk_index: i64,
    pub text: String,
    pub score: f64,
}
