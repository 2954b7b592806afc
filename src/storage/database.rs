//! SQLite Database
//!
//! Embedded database for persistent storage using rusqlite with r2d2 connection pooling.

use std::path::Path;

use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};

use crate::models::{
    AskedQuestion, Client, ClientStatus, Conversation, ConversationStatus, Criterion,
    DossierCategory, DossierEntry, Message, MessageRole, NewQuestion, Question, QuestionAnswer,
    RedFlag, RedFlagDetection, RedFlagSeverity,
};
use crate::utils::error::{AppError, AppResult};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) a database file and initialize the schema.
    pub fn new(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::database(format!("Failed to create data dir: {}", e)))?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// Uses an in-memory SQLite database with the same schema as the
    /// production database. Useful for integration and unit tests.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Get the connection pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        // Create settings table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        // Create clients table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                overall_score REAL NOT NULL DEFAULT 0.0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Create questions table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_text TEXT NOT NULL,
                category TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                is_required INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Create conversations table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                total_messages INTEGER NOT NULL DEFAULT 0,
                current_question_id INTEGER,
                waiting_for_additional_info INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (client_id) REFERENCES clients(id)
            )",
            [],
        )?;

        // Create messages table; row ids double as transcript order
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id)",
            [],
        )?;

        // Create question_answers table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS question_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                answer TEXT NOT NULL,
                additional_info TEXT,
                answered_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id),
                FOREIGN KEY (question_id) REFERENCES questions(id)
            )",
            [],
        )?;

        // Create asked_questions ledger for the free-form interviewer
        conn.execute(
            "CREATE TABLE IF NOT EXISTS asked_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                asked_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES conversations(id),
                FOREIGN KEY (question_id) REFERENCES questions(id)
            )",
            [],
        )?;

        // Create dossier_entries table; one fact per (client, category, key)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS dossier_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id INTEGER NOT NULL,
                category TEXT NOT NULL,
                key_name TEXT NOT NULL,
                value TEXT NOT NULL,
                confidence_score REAL NOT NULL DEFAULT 0.0,
                source_message_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (client_id, category, key_name),
                FOREIGN KEY (client_id) REFERENCES clients(id)
            )",
            [],
        )?;

        // Create red_flags catalog table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS red_flags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                severity TEXT NOT NULL DEFAULT 'medium',
                is_active INTEGER NOT NULL DEFAULT 1,
                detection_keywords TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Create red_flag_detections table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS red_flag_detections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id INTEGER NOT NULL,
                red_flag_id INTEGER NOT NULL,
                message_id INTEGER,
                detection_reason TEXT,
                confidence_score REAL NOT NULL DEFAULT 0.0,
                detected_at TEXT NOT NULL,
                FOREIGN KEY (client_id) REFERENCES clients(id),
                FOREIGN KEY (red_flag_id) REFERENCES red_flags(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_detections_client ON red_flag_detections(client_id)",
            [],
        )?;

        // Create criteria table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS criteria (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT,
                weight REAL NOT NULL DEFAULT 1.0,
                is_active INTEGER NOT NULL DEFAULT 1,
                evaluation_prompt TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    // ========================================================================
    // Settings Operations
    // ========================================================================

    /// Get a setting value by key
    pub fn get_setting(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Set a setting value
    pub fn set_setting(&self, key: &str, value: &str, description: Option<&str>) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO settings (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?4",
            params![key, value, description, now()],
        )?;
        Ok(())
    }

    /// Count the settings rows; zero means a virgin database
    pub fn settings_count(&self) -> AppResult<i64> {
        let conn = self.get_connection()?;
        let count = conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
        Ok(count)
    }

    // ========================================================================
    // Client Operations
    // ========================================================================

    /// Create a new client in pending status
    pub fn create_client(
        &self,
        email: &str,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<Client> {
        let conn = self.get_connection()?;
        let ts = now();
        conn.execute(
            "INSERT INTO clients (email, username, first_name, last_name, status, overall_score, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', 0.0, ?5, ?5)",
            params![email, username, first_name, last_name, ts],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_client(id)?
            .ok_or_else(|| AppError::ClientNotFound(id))
    }

    /// Get a client by id
    pub fn get_client(&self, id: i64) -> AppResult<Option<Client>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, email, username, first_name, last_name, status, overall_score, created_at, updated_at
             FROM clients WHERE id = ?1",
            params![id],
            map_client,
        );

        match result {
            Ok(client) => Ok(Some(client)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Get a client by email address
    pub fn get_client_by_email(&self, email: &str) -> AppResult<Option<Client>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, email, username, first_name, last_name, status, overall_score, created_at, updated_at
             FROM clients WHERE email = ?1",
            params![email],
            map_client,
        );

        match result {
            Ok(client) => Ok(Some(client)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// List all clients, newest first
    pub fn list_clients(&self) -> AppResult<Vec<Client>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, username, first_name, last_name, status, overall_score, created_at, updated_at
             FROM clients ORDER BY id DESC",
        )?;
        let clients = stmt
            .query_map([], map_client)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clients)
    }

    /// Update a client's vetting status
    pub fn update_client_status(&self, id: i64, status: ClientStatus) -> AppResult<()> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "UPDATE clients SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now()],
        )?;
        if changed == 0 {
            return Err(AppError::ClientNotFound(id));
        }
        Ok(())
    }

    /// Overwrite a client's profile fields; callers decide the merge policy
    pub fn update_client_profile(
        &self,
        id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "UPDATE clients SET username = ?2, first_name = ?3, last_name = ?4, updated_at = ?5 WHERE id = ?1",
            params![id, username, first_name, last_name, now()],
        )?;
        if changed == 0 {
            return Err(AppError::ClientNotFound(id));
        }
        Ok(())
    }

    /// Update a client's overall score
    pub fn update_client_score(&self, id: i64, score: f64) -> AppResult<()> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "UPDATE clients SET overall_score = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, score, now()],
        )?;
        if changed == 0 {
            return Err(AppError::ClientNotFound(id));
        }
        Ok(())
    }

    // ========================================================================
    // Question Operations
    // ========================================================================

    /// Insert a question into the catalog
    pub fn create_question(&self, question: &NewQuestion) -> AppResult<Question> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO questions (question_text, category, priority, is_required, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                question.question_text,
                question.category,
                question.priority,
                question.is_required,
                question.is_active,
                now()
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_question(id)?
            .ok_or_else(|| AppError::not_found(format!("question {}", id)))
    }

    /// Get a question by id
    pub fn get_question(&self, id: i64) -> AppResult<Option<Question>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, question_text, category, priority, is_required, is_active, created_at
             FROM questions WHERE id = ?1",
            params![id],
            map_question,
        );

        match result {
            Ok(question) => Ok(Some(question)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// List active questions in selection order (priority desc, id asc)
    pub fn list_active_questions(&self) -> AppResult<Vec<Question>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, question_text, category, priority, is_required, is_active, created_at
             FROM questions WHERE is_active = 1 ORDER BY priority DESC, id ASC",
        )?;
        let questions = stmt
            .query_map([], map_question)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    /// First question of a fresh structured interview
    pub fn first_active_question(&self) -> AppResult<Option<Question>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, question_text, category, priority, is_required, is_active, created_at
             FROM questions WHERE is_active = 1 ORDER BY priority DESC, id ASC LIMIT 1",
            [],
            map_question,
        );

        match result {
            Ok(question) => Ok(Some(question)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Next active question without an answer in this conversation.
    ///
    /// Drives the structured flow; answered questions never come back even
    /// if they are edited afterwards.
    pub fn next_unanswered_question(&self, conversation_id: i64) -> AppResult<Option<Question>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT q.id, q.question_text, q.category, q.priority, q.is_required, q.is_active, q.created_at
             FROM questions q
             WHERE q.is_active = 1
               AND q.id NOT IN (SELECT question_id FROM question_answers WHERE conversation_id = ?1)
             ORDER BY q.priority DESC, q.id ASC LIMIT 1",
            params![conversation_id],
            map_question,
        );

        match result {
            Ok(question) => Ok(Some(question)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Next active question the free-form interviewer has not asked yet.
    ///
    /// Required questions come first; within each class priority desc, id asc.
    pub fn next_unasked_question(&self, conversation_id: i64) -> AppResult<Option<Question>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT q.id, q.question_text, q.category, q.priority, q.is_required, q.is_active, q.created_at
             FROM questions q
             WHERE q.is_active = 1
               AND q.id NOT IN (SELECT question_id FROM asked_questions WHERE conversation_id = ?1)
             ORDER BY q.is_required DESC, q.priority DESC, q.id ASC LIMIT 1",
            params![conversation_id],
            map_question,
        );

        match result {
            Ok(question) => Ok(Some(question)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// True while at least one active required question has not been asked
    pub fn has_unasked_required_questions(&self, conversation_id: i64) -> AppResult<bool> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM questions q
             WHERE q.is_active = 1 AND q.is_required = 1
               AND q.id NOT IN (SELECT question_id FROM asked_questions WHERE conversation_id = ?1)",
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record that a bank question was woven into a free-form conversation
    pub fn record_asked_question(&self, conversation_id: i64, question_id: i64) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO asked_questions (conversation_id, question_id, asked_at) VALUES (?1, ?2, ?3)",
            params![conversation_id, question_id, now()],
        )?;
        Ok(())
    }

    /// The asked-question ledger of a conversation, in asking order
    pub fn asked_questions_for_conversation(
        &self,
        conversation_id: i64,
    ) -> AppResult<Vec<AskedQuestion>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, question_id, asked_at
             FROM asked_questions WHERE conversation_id = ?1 ORDER BY id ASC",
        )?;
        let asked = stmt
            .query_map(params![conversation_id], |row| {
                Ok(AskedQuestion {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    question_id: row.get(2)?,
                    asked_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(asked)
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Start a new conversation for a client
    pub fn create_conversation(&self, client_id: i64) -> AppResult<Conversation> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO conversations (client_id, started_at, status, total_messages, waiting_for_additional_info)
             VALUES (?1, ?2, 'active', 0, 0)",
            params![client_id, now()],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_conversation(id)?
            .ok_or_else(|| AppError::ConversationNotFound(id))
    }

    /// Get a conversation by id
    pub fn get_conversation(&self, id: i64) -> AppResult<Option<Conversation>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, client_id, started_at, ended_at, status, total_messages, current_question_id, waiting_for_additional_info
             FROM conversations WHERE id = ?1",
            params![id],
            map_conversation,
        );

        match result {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Most recent conversation for a client, any status
    pub fn latest_conversation_for_client(&self, client_id: i64) -> AppResult<Option<Conversation>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, client_id, started_at, ended_at, status, total_messages, current_question_id, waiting_for_additional_info
             FROM conversations WHERE client_id = ?1 ORDER BY id DESC LIMIT 1",
            params![client_id],
            map_conversation,
        );

        match result {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// List a client's conversations, most recent first
    pub fn list_conversations_for_client(&self, client_id: i64) -> AppResult<Vec<Conversation>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, client_id, started_at, ended_at, status, total_messages, current_question_id, waiting_for_additional_info
             FROM conversations WHERE client_id = ?1 ORDER BY id DESC",
        )?;
        let conversations = stmt
            .query_map(params![client_id], map_conversation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conversations)
    }

    /// Point the structured flow at its next question (or none)
    pub fn set_current_question(
        &self,
        conversation_id: i64,
        question_id: Option<i64>,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE conversations SET current_question_id = ?2 WHERE id = ?1",
            params![conversation_id, question_id],
        )?;
        Ok(())
    }

    /// Flip the additional-info sub-dialog flag
    pub fn set_waiting_for_additional_info(
        &self,
        conversation_id: i64,
        waiting: bool,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE conversations SET waiting_for_additional_info = ?2 WHERE id = ?1",
            params![conversation_id, waiting],
        )?;
        Ok(())
    }

    /// Mark a conversation completed and stamp its end time
    pub fn complete_conversation(&self, conversation_id: i64) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE conversations SET status = 'completed', ended_at = ?2, current_question_id = NULL,
             waiting_for_additional_info = 0 WHERE id = ?1",
            params![conversation_id, now()],
        )?;
        Ok(())
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    /// Persist a message and bump the conversation's message counter.
    ///
    /// Insert and increment happen in one transaction so `total_messages`
    /// always matches the transcript length.
    pub fn record_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> AppResult<Message> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let ts = now();
        tx.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, role.as_str(), content, ts],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE conversations SET total_messages = total_messages + 1 WHERE id = ?1",
            params![conversation_id],
        )?;
        tx.commit()?;

        Ok(Message {
            id,
            conversation_id,
            role,
            content: content.to_string(),
            created_at: ts,
        })
    }

    /// Full transcript in creation order
    pub fn messages_for_conversation(&self, conversation_id: i64) -> AppResult<Vec<Message>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY id ASC",
        )?;
        let messages = stmt
            .query_map(params![conversation_id], map_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Last `limit` messages of a conversation, in chronological order
    pub fn recent_messages(&self, conversation_id: i64, limit: i64) -> AppResult<Vec<Message>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, created_at FROM (
                 SELECT id, conversation_id, role, content, created_at
                 FROM messages WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )?;
        let messages = stmt
            .query_map(params![conversation_id, limit], map_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Every message a client has sent or received, across conversations
    pub fn messages_for_client(&self, client_id: i64) -> AppResult<Vec<Message>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT m.id, m.conversation_id, m.role, m.content, m.created_at
             FROM messages m
             JOIN conversations c ON c.id = m.conversation_id
             WHERE c.client_id = ?1 ORDER BY m.id ASC",
        )?;
        let messages = stmt
            .query_map(params![client_id], map_message)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Id of the newest message in a conversation
    pub fn latest_message_id(&self, conversation_id: i64) -> AppResult<Option<i64>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id FROM messages WHERE conversation_id = ?1 ORDER BY id DESC LIMIT 1",
            params![conversation_id],
            |row| row.get(0),
        );

        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    // ========================================================================
    // Answer Operations
    // ========================================================================

    /// Record a primary answer to a question
    pub fn record_answer(
        &self,
        conversation_id: i64,
        question_id: i64,
        answer: &str,
    ) -> AppResult<i64> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO question_answers (conversation_id, question_id, answer, answered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, question_id, answer, now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Attach (or clear) additional info on a recorded answer
    pub fn set_additional_info(&self, answer_id: i64, info: Option<&str>) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE question_answers SET additional_info = ?2 WHERE id = ?1",
            params![answer_id, info],
        )?;
        Ok(())
    }

    /// Latest recorded answer for a question in a conversation
    pub fn latest_answer_for_question(
        &self,
        conversation_id: i64,
        question_id: i64,
    ) -> AppResult<Option<QuestionAnswer>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, conversation_id, question_id, answer, additional_info, answered_at
             FROM question_answers WHERE conversation_id = ?1 AND question_id = ?2
             ORDER BY id DESC LIMIT 1",
            params![conversation_id, question_id],
            map_answer,
        );

        match result {
            Ok(answer) => Ok(Some(answer)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Answers of a conversation joined with their questions, oldest first
    pub fn answers_for_conversation(
        &self,
        conversation_id: i64,
    ) -> AppResult<Vec<(QuestionAnswer, Question)>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.conversation_id, a.question_id, a.answer, a.additional_info, a.answered_at,
                    q.id, q.question_text, q.category, q.priority, q.is_required, q.is_active, q.created_at
             FROM question_answers a
             JOIN questions q ON q.id = a.question_id
             WHERE a.conversation_id = ?1 ORDER BY a.id ASC",
        )?;
        let rows = stmt
            .query_map(params![conversation_id], |row| {
                let answer = QuestionAnswer {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    question_id: row.get(2)?,
                    answer: row.get(3)?,
                    additional_info: row.get(4)?,
                    answered_at: row.get(5)?,
                };
                let question = Question {
                    id: row.get(6)?,
                    question_text: row.get(7)?,
                    category: row.get(8)?,
                    priority: row.get(9)?,
                    is_required: row.get(10)?,
                    is_active: row.get(11)?,
                    created_at: row.get(12)?,
                };
                Ok((answer, question))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ========================================================================
    // Dossier Operations
    // ========================================================================

    /// Find a dossier entry by its natural key
    pub fn find_dossier_entry(
        &self,
        client_id: i64,
        category: DossierCategory,
        key_name: &str,
    ) -> AppResult<Option<DossierEntry>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, client_id, category, key_name, value, confidence_score, source_message_id, created_at, updated_at
             FROM dossier_entries WHERE client_id = ?1 AND category = ?2 AND key_name = ?3",
            params![client_id, category.as_str(), key_name],
            map_dossier_entry,
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Insert a new dossier entry
    pub fn insert_dossier_entry(
        &self,
        client_id: i64,
        category: DossierCategory,
        key_name: &str,
        value: &str,
        confidence_score: f64,
        source_message_id: Option<i64>,
    ) -> AppResult<i64> {
        let conn = self.get_connection()?;
        let ts = now();
        conn.execute(
            "INSERT INTO dossier_entries (client_id, category, key_name, value, confidence_score, source_message_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                client_id,
                category.as_str(),
                key_name,
                value,
                confidence_score,
                source_message_id,
                ts
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrite an existing dossier entry's value and provenance
    pub fn update_dossier_entry(
        &self,
        id: i64,
        value: &str,
        confidence_score: f64,
        source_message_id: Option<i64>,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE dossier_entries SET value = ?2, confidence_score = ?3, source_message_id = ?4, updated_at = ?5
             WHERE id = ?1",
            params![id, value, confidence_score, source_message_id, now()],
        )?;
        Ok(())
    }

    /// Full dossier for a client, grouped by category then key
    pub fn dossier_for_client(&self, client_id: i64) -> AppResult<Vec<DossierEntry>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, client_id, category, key_name, value, confidence_score, source_message_id, created_at, updated_at
             FROM dossier_entries WHERE client_id = ?1 ORDER BY category ASC, key_name ASC",
        )?;
        let entries = stmt
            .query_map(params![client_id], map_dossier_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ========================================================================
    // Red Flag Operations
    // ========================================================================

    /// Insert a red flag definition into the catalog
    pub fn create_red_flag(
        &self,
        name: &str,
        description: Option<&str>,
        severity: RedFlagSeverity,
        detection_keywords: Option<&str>,
    ) -> AppResult<i64> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO red_flags (name, description, severity, is_active, detection_keywords, created_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5)",
            params![name, description, severity.as_str(), detection_keywords, now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List active red flags in catalog order
    pub fn list_active_red_flags(&self) -> AppResult<Vec<RedFlag>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, severity, is_active, detection_keywords, created_at
             FROM red_flags WHERE is_active = 1 ORDER BY id ASC",
        )?;
        let flags = stmt
            .query_map([], map_red_flag)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(flags)
    }

    /// True if the flag has already been recorded against the client
    pub fn has_detection(&self, client_id: i64, red_flag_id: i64) -> AppResult<bool> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM red_flag_detections WHERE client_id = ?1 AND red_flag_id = ?2",
            params![client_id, red_flag_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record a detection against a client
    pub fn insert_detection(
        &self,
        client_id: i64,
        red_flag_id: i64,
        message_id: Option<i64>,
        reason: Option<&str>,
        confidence_score: f64,
    ) -> AppResult<i64> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO red_flag_detections (client_id, red_flag_id, message_id, detection_reason, confidence_score, detected_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![client_id, red_flag_id, message_id, reason, confidence_score, now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Number of distinct detections against a client
    pub fn detection_count(&self, client_id: i64) -> AppResult<i64> {
        let conn = self.get_connection()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM red_flag_detections WHERE client_id = ?1",
            params![client_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All detections recorded against a client
    pub fn detections_for_client(&self, client_id: i64) -> AppResult<Vec<RedFlagDetection>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, client_id, red_flag_id, message_id, detection_reason, confidence_score, detected_at
             FROM red_flag_detections WHERE client_id = ?1 ORDER BY id ASC",
        )?;
        let detections = stmt
            .query_map(params![client_id], map_detection)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(detections)
    }

    // ========================================================================
    // Criteria Operations
    // ========================================================================

    /// Insert an evaluation criterion
    pub fn create_criterion(
        &self,
        name: &str,
        description: Option<&str>,
        category: Option<&str>,
        weight: f64,
        evaluation_prompt: Option<&str>,
    ) -> AppResult<i64> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO criteria (name, description, category, weight, is_active, evaluation_prompt, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
            params![name, description, category, weight, evaluation_prompt, now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List active criteria in catalog order
    pub fn list_active_criteria(&self) -> AppResult<Vec<Criterion>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, category, weight, is_active, evaluation_prompt, created_at
             FROM criteria WHERE is_active = 1 ORDER BY id ASC",
        )?;
        let criteria = stmt
            .query_map([], map_criterion)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(criteria)
    }
}

// ============================================================================
// Row mappers
// ============================================================================

fn map_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        status: ClientStatus::parse(&row.get::<_, String>(5)?),
        overall_score: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        question_text: row.get(1)?,
        category: row.get(2)?,
        priority: row.get(3)?,
        is_required: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        client_id: row.get(1)?,
        started_at: row.get(2)?,
        ended_at: row.get(3)?,
        status: ConversationStatus::parse(&row.get::<_, String>(4)?),
        total_messages: row.get(5)?,
        current_question_id: row.get(6)?,
        waiting_for_additional_info: row.get(7)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: MessageRole::parse(&row.get::<_, String>(2)?),
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_answer(row: &Row<'_>) -> rusqlite::Result<QuestionAnswer> {
    Ok(QuestionAnswer {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        question_id: row.get(2)?,
        answer: row.get(3)?,
        additional_info: row.get(4)?,
        answered_at: row.get(5)?,
    })
}

fn map_dossier_entry(row: &Row<'_>) -> rusqlite::Result<DossierEntry> {
    Ok(DossierEntry {
        id: row.get(0)?,
        client_id: row.get(1)?,
        category: DossierCategory::parse(&row.get::<_, String>(2)?),
        key_name: row.get(3)?,
        value: row.get(4)?,
        confidence_score: row.get(5)?,
        source_message_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_red_flag(row: &Row<'_>) -> rusqlite::Result<RedFlag> {
    Ok(RedFlag {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        severity: RedFlagSeverity::parse(&row.get::<_, String>(3)?),
        is_active: row.get(4)?,
        detection_keywords: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_detection(row: &Row<'_>) -> rusqlite::Result<RedFlagDetection> {
    Ok(RedFlagDetection {
        id: row.get(0)?,
        client_id: row.get(1)?,
        red_flag_id: row.get(2)?,
        message_id: row.get(3)?,
        detection_reason: row.get(4)?,
        confidence_score: row.get(5)?,
        detected_at: row.get(6)?,
    })
}

fn map_criterion(row: &Row<'_>) -> rusqlite::Result<Criterion> {
    Ok(Criterion {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        weight: row.get(4)?,
        is_active: row.get(5)?,
        evaluation_prompt: row.get(6)?,
        created_at: row.get(7)?,
    })
}
