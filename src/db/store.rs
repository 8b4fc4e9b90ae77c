use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::error::AppResult;

/// One row of a user's feedback history
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRecord {
    pub user_input: String,
    pub movie_title: String,
    pub is_selected: bool,
    pub is_disliked: bool,
    pub created_at: String,
}

/// Persistence collaborator for users, interactions, recommendation logs,
/// feedback and dislikes.
///
/// The engine calls these as side effects after each branch; their failure
/// must never block conversational response delivery, so every engine-side
/// call site logs and continues on error.
#[async_trait::async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Resolves a user name to its id, creating the user on first contact
    async fn get_or_create_user(&self, user_name: &str) -> AppResult<i64>;

    /// Records one raw user input, returning the interaction id
    async fn record_interaction(&self, user_id: i64, user_input: &str) -> AppResult<i64>;

    /// Records the titles produced by one recommendation call
    async fn log_recommendations(&self, interaction_id: i64, titles: &[String]) -> AppResult<()>;

    /// Records selection or dislike feedback for one title
    async fn record_feedback(
        &self,
        interaction_id: i64,
        title: &str,
        selected: bool,
        disliked: bool,
    ) -> AppResult<()>;

    /// Records a disliked element (a title, an actor, a genre token, …)
    async fn add_dislike(&self, user_id: i64, category: &str, value: &str) -> AppResult<()>;

    /// Every title ever recommended to this user, across sessions
    async fn previous_titles(&self, user_id: i64) -> AppResult<Vec<String>>;

    /// All (category, value) dislike pairs for this user
    async fn dislikes(&self, user_id: i64) -> AppResult<Vec<(String, String)>>;

    /// The user's feedback history, oldest first
    async fn feedback_history(&self, user_id: i64) -> AppResult<Vec<FeedbackRecord>>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_name TEXT UNIQUE NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS user_interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    user_input TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS user_feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    interaction_id INTEGER NOT NULL,
    movie_title TEXT NOT NULL,
    is_selected BOOLEAN DEFAULT 0,
    is_disliked BOOLEAN DEFAULT 0,
    feedback_text TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (interaction_id) REFERENCES user_interactions(id)
);

CREATE TABLE IF NOT EXISTS user_dislikes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS recommendation_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    interaction_id INTEGER NOT NULL,
    movie_title TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (interaction_id) REFERENCES user_interactions(id)
);
"#;

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to the database and ensures the schema exists
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl PersistenceStore for SqliteStore {
    async fn get_or_create_user(&self, user_name: &str) -> AppResult<i64> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE user_name = ?")
                .bind(user_name)
                .fetch_optional(&self.pool)
                .await?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let result = sqlx::query("INSERT INTO users (user_name) VALUES (?)")
            .bind(user_name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn record_interaction(&self, user_id: i64, user_input: &str) -> AppResult<i64> {
        let result =
            sqlx::query("INSERT INTO user_interactions (user_id, user_input) VALUES (?, ?)")
                .bind(user_id)
                .bind(user_input)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    async fn log_recommendations(&self, interaction_id: i64, titles: &[String]) -> AppResult<()> {
        for title in titles {
            sqlx::query(
                "INSERT INTO recommendation_logs (interaction_id, movie_title) VALUES (?, ?)",
            )
            .bind(interaction_id)
            .bind(title)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn record_feedback(
        &self,
        interaction_id: i64,
        title: &str,
        selected: bool,
        disliked: bool,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_feedback (interaction_id, movie_title, is_selected, is_disliked) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(interaction_id)
        .bind(title)
        .bind(selected)
        .bind(disliked)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_dislike(&self, user_id: i64, category: &str, value: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO user_dislikes (user_id, category, value) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(category)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn previous_titles(&self, user_id: i64) -> AppResult<Vec<String>> {
        let titles = sqlx::query_scalar(
            "SELECT rl.movie_title \
             FROM recommendation_logs rl \
             JOIN user_interactions ui ON rl.interaction_id = ui.id \
             WHERE ui.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    async fn dislikes(&self, user_id: i64) -> AppResult<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT category, value FROM user_dislikes WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| Ok((row.try_get("category")?, row.try_get("value")?)))
            .collect()
    }

    async fn feedback_history(&self, user_id: i64) -> AppResult<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            "SELECT ui.user_input, uf.movie_title, uf.is_selected, uf.is_disliked, uf.created_at \
             FROM user_feedback uf \
             JOIN user_interactions ui ON uf.interaction_id = ui.id \
             WHERE ui.user_id = ? \
             ORDER BY uf.id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(FeedbackRecord {
                    user_input: row.try_get("user_input")?,
                    movie_title: row.try_get("movie_title")?,
                    is_selected: row.try_get("is_selected")?,
                    is_disliked: row.try_get("is_disliked")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
