//! Session orchestration: the top-level façade the UI talks to.
//!
//! [`ChatManager`] owns the single active session, drives index
//! construction at session creation, and routes each question through the
//! query pipeline while keeping persisted history and access metadata in
//! step.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::index::IndexStore;
use crate::ingest;
use crate::llm::{LanguageModel, OllamaClient};
use crate::models::{Message, MessageRole, SessionRecord};
use crate::pipeline::QueryPipeline;
use crate::router::ModelRouter;
use crate::session::{SessionStore, SqliteSessionStore};

const USER_AVATAR: &str = "🧑‍💻";
const ASSISTANT_AVATAR: &str = "🤖";
const ERROR_AVATAR: &str = "⚠️";

/// In-memory state of the active session: its id plus replayed history.
#[derive(Debug)]
pub struct CurrentSession {
    pub session_id: String,
    pub messages: Vec<Message>,
}

pub struct ChatManager {
    config: Config,
    store: Arc<dyn SessionStore>,
    index: Arc<IndexStore>,
    router: ModelRouter,
    llm: Arc<dyn LanguageModel>,
    pipeline: QueryPipeline,
    current_session: Option<CurrentSession>,
}

impl ChatManager {
    /// Wire the orchestrator against a live Ollama service.
    pub fn new(config: Config, pool: SqlitePool) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(OllamaClient::new(&config.models)?);
        Ok(Self::with_model(config, pool, llm))
    }

    /// Wire the orchestrator with an injected model service. Used by tests.
    pub fn with_model(config: Config, pool: SqlitePool, llm: Arc<dyn LanguageModel>) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(pool.clone()));
        let index = Arc::new(IndexStore::new(pool));
        let router = ModelRouter::new(&config.models);
        let pipeline = QueryPipeline::new(
            index.clone(),
            router.clone(),
            llm.clone(),
            &config.retrieval,
            &config.models,
        );

        Self {
            config,
            store,
            index,
            router,
            llm,
            pipeline,
            current_session: None,
        }
    }

    /// Create a session for an uploaded file and make it current.
    ///
    /// The index is built before the session row is inserted, so a session
    /// record never references an index that failed to build.
    pub async fn create_session(&mut self, filename: &str, file_path: &str) -> Result<String> {
        let session_id = Uuid::new_v4().to_string();

        ingest::build_index(
            &self.config,
            self.llm.as_ref(),
            self.router.embedding_model(),
            &self.index,
            &session_id,
            Path::new(file_path),
        )
        .await?;

        self.store
            .create_session(&session_id, filename, file_path)
            .await?;

        info!(session_id, filename, "session created");

        self.current_session = Some(CurrentSession {
            session_id: session_id.clone(),
            messages: Vec::new(),
        });

        Ok(session_id)
    }

    /// Make an existing session current, replaying its persisted history.
    /// Returns false for an unknown id.
    pub async fn load_session(&mut self, session_id: &str) -> Result<bool> {
        if self.store.get_session(session_id).await?.is_none() {
            return Ok(false);
        }

        let messages = self.store.get_history(session_id).await?;
        self.current_session = Some(CurrentSession {
            session_id: session_id.to_string(),
            messages,
        });

        Ok(true)
    }

    pub fn current_session(&self) -> Option<&CurrentSession> {
        self.current_session.as_ref()
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.store.list_sessions().await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        self.store.get_session(session_id).await
    }

    pub async fn get_history(&self, session_id: &str) -> Result<Vec<Message>> {
        self.store.get_history(session_id).await
    }

    /// Answer a question against a session's document, persist the
    /// question/answer pair, and bump access metadata.
    ///
    /// An unknown session id fails with `InvalidInput` and persists
    /// nothing.
    pub async fn query(&self, session_id: &str, question: &str) -> Result<String> {
        if self.store.get_session(session_id).await?.is_none() {
            return Err(ChatError::InvalidInput("invalid session ID".to_string()));
        }

        let answer = self.pipeline.answer(session_id, question).await?;

        let now = Utc::now().timestamp();
        self.store
            .append_message_pair(
                session_id,
                &Message {
                    role: MessageRole::User,
                    content: question.to_string(),
                    avatar: None,
                    created_at: now,
                },
                &Message {
                    role: MessageRole::Assistant,
                    content: answer.clone(),
                    avatar: None,
                    created_at: now,
                },
            )
            .await?;
        self.store.touch_session(session_id).await?;

        Ok(answer)
    }

    /// Convenience wrapper for the active session: appends the user
    /// message, attempts `query`, appends the assistant message (or a
    /// formatted error message), and always returns a string.
    pub async fn get_response(&mut self, user_message: &str) -> Result<String> {
        let session_id = self
            .current_session
            .as_ref()
            .map(|s| s.session_id.clone())
            .ok_or_else(|| ChatError::InvalidInput("no active session".to_string()))?;

        self.push_current(MessageRole::User, user_message, USER_AVATAR);

        match self.query(&session_id, user_message).await {
            Ok(answer) => {
                self.push_current(MessageRole::Assistant, &answer, ASSISTANT_AVATAR);
                Ok(answer)
            }
            Err(e) => {
                warn!(session_id, error = %e, "query failed; answering with error message");
                let error_message = format!("Error generating response: {e}");
                self.push_current(MessageRole::Assistant, &error_message, ERROR_AVATAR);
                Ok(error_message)
            }
        }
    }

    fn push_current(&mut self, role: MessageRole, content: &str, avatar: &str) {
        if let Some(current) = self.current_session.as_mut() {
            current.messages.push(Message {
                role,
                content: content.to_string(),
                avatar: Some(avatar.to_string()),
                created_at: Utc::now().timestamp(),
            });
        }
    }
}
