use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

/// One persisted chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub language: String,
    pub audio_file: Option<String>,
    pub source: String,
    pub timestamp: String,
}

/// A past (user message, bot response) pair used as read-only prompt context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user_message: String,
    pub bot_response: String,
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: &Path) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to connect to history db: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                conversation_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                user_message TEXT NOT NULL,
                bot_response TEXT NOT NULL,
                language TEXT NOT NULL DEFAULT 'en',
                audio_file TEXT,
                source TEXT NOT NULL DEFAULT 'engine',
                timestamp TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                FOREIGN KEY(conversation_id) REFERENCES conversations(conversation_id)
                    ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
             ON messages(conversation_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn create_conversation(&self, user_id: &str) -> Result<String, ApiError> {
        let conversation_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO conversations (conversation_id, user_id, timestamp) VALUES (?, ?, ?)",
        )
        .bind(&conversation_id)
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(conversation_id)
    }

    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<String>, ApiError> {
        let rows = sqlx::query(
            "SELECT conversation_id FROM conversations WHERE user_id = ? ORDER BY timestamp ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("conversation_id"))
            .collect())
    }

    /// Removes a conversation and, via cascade, its messages. Returns how
    /// many messages were deleted.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<usize, ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        let messages = sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM conversations WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(messages.rows_affected() as usize)
    }

    pub async fn save_turn(
        &self,
        user_id: &str,
        conversation_id: &str,
        user_message: &str,
        bot_response: &str,
        language: &str,
        audio_file: Option<&str>,
        source: &str,
    ) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT OR IGNORE INTO conversations (conversation_id, user_id, timestamp)
             VALUES (?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT INTO messages
                (conversation_id, user_message, bot_response, language, audio_file, source, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(user_message)
        .bind(bot_response)
        .bind(language)
        .bind(audio_file)
        .bind(source)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    /// Full history of a conversation, oldest first.
    pub async fn get_history(&self, conversation_id: &str) -> Result<Vec<StoredMessage>, ApiError> {
        let rows = sqlx::query(
            "SELECT conversation_id, user_message, bot_response, language, audio_file, source, timestamp
             FROM messages
             WHERE conversation_id = ?
             ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .iter()
            .map(|row| StoredMessage {
                conversation_id: row.get("conversation_id"),
                user_message: row.get("user_message"),
                bot_response: row.get("bot_response"),
                language: row.get("language"),
                audio_file: row.get("audio_file"),
                source: row.get("source"),
                timestamp: row.get("timestamp"),
            })
            .collect())
    }

    /// The most recent `limit` turns, returned oldest first for prompt
    /// transcripts.
    pub async fn recent_turns(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, ApiError> {
        let rows = sqlx::query(
            "SELECT user_message, bot_response FROM
                (SELECT id, user_message, bot_response FROM messages
                 WHERE conversation_id = ? ORDER BY id DESC LIMIT ?)
             ORDER BY id ASC",
        )
        .bind(conversation_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .iter()
            .map(|row| ConversationTurn {
                user_message: row.get("user_message"),
                bot_response: row.get("bot_response"),
            })
            .collect())
    }
}
