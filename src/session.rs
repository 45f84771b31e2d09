//! Persistence collaborator for sessions and chat history.
//!
//! The orchestrator depends only on the [`SessionStore`] contract, not on a
//! specific storage engine. [`SqliteSessionStore`] is the shipped
//! implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::models::{Message, MessageRole, SessionRecord};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session with a zeroed message counter.
    ///
    /// The caller supplies the id: the orchestrator builds the document
    /// index under that id before the row exists, so a persisted session
    /// always references a buildable index.
    async fn create_session(&self, session_id: &str, filename: &str, file_path: &str)
        -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// All sessions, most recently accessed first.
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>>;

    /// Update last-access time and increment the message counter.
    async fn touch_session(&self, session_id: &str) -> Result<()>;

    /// Append a user question and the assistant answer as one pair.
    async fn append_message_pair(
        &self,
        session_id: &str,
        question: &Message,
        answer: &Message,
    ) -> Result<()>;

    /// Message history for a session, ordered by timestamp.
    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>>;
}

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_message(&self, session_id: &str, message: &Message) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (session_id, role, content, avatar, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(&message.avatar)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create_session(
        &self,
        session_id: &str,
        filename: &str,
        file_path: &str,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, filename, file_path, created_at, last_accessed, message_count)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(session_id)
        .bind(filename)
        .bind(file_path)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let row = sqlx::query(
            "SELECT session_id, filename, file_path, created_at, last_accessed, message_count \
             FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| SessionRecord {
            session_id: row.get("session_id"),
            filename: row.get("filename"),
            file_path: row.get("file_path"),
            created_at: row.get("created_at"),
            last_accessed: row.get("last_accessed"),
            message_count: row.get("message_count"),
        }))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let rows = sqlx::query(
            "SELECT session_id, filename, file_path, created_at, last_accessed, message_count \
             FROM sessions ORDER BY last_accessed DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SessionRecord {
                session_id: row.get("session_id"),
                filename: row.get("filename"),
                file_path: row.get("file_path"),
                created_at: row.get("created_at"),
                last_accessed: row.get("last_accessed"),
                message_count: row.get("message_count"),
            })
            .collect())
    }

    async fn touch_session(&self, session_id: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        sqlx::query(
            "UPDATE sessions SET last_accessed = ?, message_count = message_count + 1 \
             WHERE session_id = ?",
        )
        .bind(now)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_message_pair(
        &self,
        session_id: &str,
        question: &Message,
        answer: &Message,
    ) -> Result<()> {
        self.insert_message(session_id, question).await?;
        self.insert_message(session_id, answer).await?;
        Ok(())
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT role, content, avatar, created_at FROM messages \
             WHERE session_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let role: String = row.get("role");
                Message {
                    role: MessageRole::parse(&role),
                    content: row.get("content"),
                    avatar: row.get("avatar"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrate;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteSessionStore) {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("chat.sqlite")).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        (tmp, SqliteSessionStore::new(pool))
    }

    fn message(role: MessageRole, content: &str, ts: i64) -> Message {
        Message {
            role,
            content: content.to_string(),
            avatar: None,
            created_at: ts,
        }
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let (_tmp, store) = store().await;
        let id = "session-1";
        store.create_session(id, "notes.txt", "/tmp/notes.txt").await.unwrap();

        let record = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(record.filename, "notes.txt");
        assert_eq!(record.file_path, "/tmp/notes.txt");
        assert_eq!(record.message_count, 0);
        assert_eq!(record.created_at, record.last_accessed);
    }

    #[tokio::test]
    async fn unknown_session_is_none() {
        let (_tmp, store) = store().await;
        assert!(store.get_session("no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_increments_counter() {
        let (_tmp, store) = store().await;
        let id = "session-1";
        store.create_session(id, "notes.txt", "/tmp/notes.txt").await.unwrap();

        store.touch_session(id).await.unwrap();
        store.touch_session(id).await.unwrap();

        let record = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(record.message_count, 2);
    }

    #[tokio::test]
    async fn history_preserves_timestamp_order() {
        let (_tmp, store) = store().await;
        let id = "session-1";
        store.create_session(id, "notes.txt", "/tmp/notes.txt").await.unwrap();

        store
            .append_message_pair(
                id,
                &message(MessageRole::User, "first question", 100),
                &message(MessageRole::Assistant, "first answer", 100),
            )
            .await
            .unwrap();
        store
            .append_message_pair(
                id,
                &message(MessageRole::User, "second question", 200),
                &message(MessageRole::Assistant, "second answer", 200),
            )
            .await
            .unwrap();

        let history = store.get_history(id).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["first question", "first answer", "second question", "second answer"]
        );
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn sessions_listed_by_recency() {
        let (_tmp, store) = store().await;
        store.create_session("session-a", "a.txt", "/tmp/a.txt").await.unwrap();
        store.create_session("session-b", "b.txt", "/tmp/b.txt").await.unwrap();

        // Force a's last_accessed ahead of b's.
        sqlx::query("UPDATE sessions SET last_accessed = last_accessed + 60 WHERE session_id = ?")
            .bind("session-a")
            .execute(&store.pool)
            .await
            .unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions[0].session_id, "session-a");
        assert_eq!(sessions[1].session_id, "session-b");
    }
}
