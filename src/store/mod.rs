//! SQLite-backed persistence for users, generated projects and advisor chat.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::wire::{GenerationResult, ProductPlan, UIDesignPlan};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
    pub profession: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub otp_secret: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
    pub profession: Option<String>,
    pub password_hash: String,
    pub otp_secret: String,
    pub otp_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub idea: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub product_plan: Option<ProductPlan>,
    pub design_plan: Option<UIDesignPlan>,
    pub generated_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    age INTEGER,
    profession TEXT,
    password_hash TEXT NOT NULL,
    is_verified INTEGER NOT NULL DEFAULT 0,
    otp_secret TEXT,
    otp_expires_at TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES users(id),
    idea TEXT NOT NULL,
    title TEXT,
    created_at TEXT NOT NULL,
    product_plan TEXT,
    design_plan TEXT,
    generated_code TEXT
);
CREATE INDEX IF NOT EXISTS projects_owner ON projects(owner_id);
CREATE TABLE IF NOT EXISTS chat_messages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL REFERENCES users(id),
    sender TEXT NOT NULL,
    text TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS chat_user ON chat_messages(user_id);
"#;

/// Single connection guarded by a mutex; every method holds the lock for one
/// short statement batch and never across an `.await`.
pub struct Store {
    conn: Mutex<Connection>,
}

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {s:?}: {e}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(s: Option<String>) -> StoreResult<Option<T>> {
    s.map(|text| serde_json::from_str(&text).map_err(|e| StoreError::Corrupt(e.to_string())))
        .transpose()
}

fn to_json<T: Serialize>(v: &T) -> StoreResult<String> {
    serde_json::to_string(v).map_err(|e| StoreError::Corrupt(e.to_string()))
}

const USER_COLS: &str =
    "id, name, email, age, profession, password_hash, is_verified, otp_secret, otp_expires_at, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(User, Option<String>, String)> {
    Ok((
        User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            age: row.get(3)?,
            profession: row.get(4)?,
            password_hash: row.get(5)?,
            is_verified: row.get(6)?,
            otp_secret: row.get(7)?,
            otp_expires_at: None,
            created_at: Utc::now(),
        },
        row.get(8)?,
        row.get(9)?,
    ))
}

fn finish_user((mut user, otp_expires, created): (User, Option<String>, String)) -> StoreResult<User> {
    user.otp_expires_at = otp_expires.as_deref().map(parse_ts).transpose()?;
    user.created_at = parse_ts(&created)?;
    Ok(user)
}

const PROJECT_COLS: &str =
    "id, owner_id, idea, title, created_at, product_plan, design_plan, generated_code";

type ProjectRow = (String, String, String, Option<String>, String, Option<String>, Option<String>, Option<String>);

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn finish_project(r: ProjectRow) -> StoreResult<Project> {
    Ok(Project {
        id: r.0,
        owner_id: r.1,
        idea: r.2,
        title: r.3,
        created_at: parse_ts(&r.4)?,
        product_plan: parse_json(r.5)?,
        design_plan: parse_json(r.6)?,
        generated_code: r.7,
    })
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // ---------- users ----------

    pub fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            age: new.age,
            profession: new.profession,
            password_hash: new.password_hash,
            is_verified: false,
            otp_secret: Some(new.otp_secret),
            otp_expires_at: Some(new.otp_expires_at),
            created_at: Utc::now(),
        };
        let conn = self.conn.lock();
        let res = conn.execute(
            &format!("INSERT INTO users ({USER_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                user.id,
                user.name,
                user.email,
                user.age,
                user.profession,
                user.password_hash,
                user.is_verified,
                user.otp_secret,
                user.otp_expires_at.as_ref().map(ts),
                ts(&user.created_at),
            ],
        );
        match res {
            Ok(_) => Ok(user),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?;
        row.map(finish_user).transpose()
    }

    pub fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        row.map(finish_user).transpose()
    }

    pub fn set_otp(&self, user_id: &str, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.conn.lock().execute(
            "UPDATE users SET otp_secret = ?2, otp_expires_at = ?3 WHERE id = ?1",
            params![user_id, otp, ts(&expires_at)],
        )?;
        Ok(())
    }

    /// Marks the user verified and clears the pending OTP.
    pub fn mark_verified(&self, user_id: &str) -> StoreResult<()> {
        self.conn.lock().execute(
            "UPDATE users SET is_verified = 1, otp_secret = NULL, otp_expires_at = NULL WHERE id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    // ---------- projects ----------

    pub fn insert_project(
        &self,
        owner_id: &str,
        idea: &str,
        title: Option<&str>,
        result: &GenerationResult,
    ) -> StoreResult<Project> {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            idea: idea.to_string(),
            title: title.map(String::from),
            created_at: Utc::now(),
            product_plan: Some(result.product_plan.clone()),
            design_plan: Some(result.design_plan.clone()),
            generated_code: Some(result.generated_source.clone()),
        };
        self.conn.lock().execute(
            &format!("INSERT INTO projects ({PROJECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                project.id,
                project.owner_id,
                project.idea,
                project.title,
                ts(&project.created_at),
                to_json(&result.product_plan)?,
                to_json(&result.design_plan)?,
                project.generated_code,
            ],
        )?;
        Ok(project)
    }

    /// Newest first.
    pub fn list_projects(&self, owner_id: &str) -> StoreResult<Vec<Project>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLS} FROM projects WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map(params![owner_id], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(finish_project).collect()
    }

    /// Only returns the project when it belongs to `owner_id`.
    pub fn get_project(&self, owner_id: &str, id: &str) -> StoreResult<Option<Project>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1 AND owner_id = ?2"),
                params![id, owner_id],
                project_from_row,
            )
            .optional()?;
        row.map(finish_project).transpose()
    }

    pub fn delete_project(&self, owner_id: &str, id: &str) -> StoreResult<bool> {
        let n = self.conn.lock().execute(
            "DELETE FROM projects WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        Ok(n > 0)
    }

    // ---------- chat ----------

    pub fn append_message(&self, user_id: &str, sender: Sender, text: &str) -> StoreResult<ChatMessage> {
        let msg = ChatMessage {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.conn.lock().execute(
            "INSERT INTO chat_messages (id, user_id, sender, text, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![msg.id, msg.user_id, sender.as_str(), msg.text, ts(&msg.timestamp)],
        )?;
        Ok(msg)
    }

    /// Full history, oldest first.
    pub fn chat_history(&self, user_id: &str) -> StoreResult<Vec<ChatMessage>> {
        self.query_messages(
            "SELECT id, user_id, sender, text, timestamp FROM chat_messages
             WHERE user_id = ?1 ORDER BY seq ASC",
            user_id,
            None,
        )
    }

    /// The last `limit` messages, returned oldest first.
    pub fn recent_messages(&self, user_id: &str, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        let mut msgs = self.query_messages(
            "SELECT id, user_id, sender, text, timestamp FROM chat_messages
             WHERE user_id = ?1 ORDER BY seq DESC LIMIT ?2",
            user_id,
            Some(limit as i64),
        )?;
        msgs.reverse();
        Ok(msgs)
    }

    fn query_messages(&self, sql: &str, user_id: &str, limit: Option<i64>) -> StoreResult<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let map = |row: &Row<'_>| -> rusqlite::Result<(String, String, String, String, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        };
        let rows = match limit {
            Some(n) => stmt.query_map(params![user_id, n], map)?.collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt.query_map(params![user_id], map)?.collect::<rusqlite::Result<Vec<_>>>()?,
        };
        rows.into_iter()
            .map(|(id, user_id, sender, text, timestamp)| {
                let sender = match sender.as_str() {
                    "user" => Sender::User,
                    "ai" => Sender::Ai,
                    other => return Err(StoreError::Corrupt(format!("unknown sender {other:?}"))),
                };
                Ok(ChatMessage { id, user_id, sender, text, timestamp: parse_ts(&timestamp)? })
            })
            .collect()
    }
}
