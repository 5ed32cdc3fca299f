//! Database module for `SQLite` storage of the local session

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use uuid::Uuid;

use crate::models::Actor;
use crate::paths;
use crate::session::Session;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the default location
    pub fn open() -> Result<Self> {
        let path = paths::database_path()?;
        Self::open_path(&path)
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;

        let db = Self { conn };
        db.init()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- Single-row table holding the selected actor
            CREATE TABLE IF NOT EXISTS session (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                actor_id TEXT NOT NULL,
                handle TEXT NOT NULL,
                display_name TEXT NOT NULL,
                bio TEXT,
                avatar_url TEXT,
                actor_created_at TEXT NOT NULL,
                access_token TEXT,
                created_at TEXT NOT NULL,
                last_used_at TEXT
            );
            ",
        )?;

        Ok(())
    }

    /// Store `session`, replacing any previous one
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let actor = session.actor();
        self.conn.execute(
            r"INSERT OR REPLACE INTO session
               (slot, actor_id, handle, display_name, bio, avatar_url, actor_created_at, access_token, created_at, last_used_at)
               VALUES (0, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
            params![
                actor.id.to_string(),
                actor.handle,
                actor.display_name,
                actor.bio,
                actor.avatar_url,
                actor.created_at.to_rfc3339(),
                session.access_token(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load the stored session, if one exists
    pub fn load_session(&self) -> Result<Option<Session>> {
        let row = self
            .conn
            .query_row(
                "SELECT actor_id, handle, display_name, bio, avatar_url, actor_created_at, access_token
                 FROM session WHERE slot = 0",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, handle, display_name, bio, avatar_url, created_at, token)) = row else {
            return Ok(None);
        };

        let actor = Actor {
            id: Uuid::parse_str(&id).context("Stored session has a malformed actor id")?,
            handle,
            display_name,
            bio,
            avatar_url,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .context("Stored session has a malformed creation time")?
                .with_timezone(&Utc),
        };

        let session = Session::new(actor);
        Ok(Some(match token {
            Some(token) => session.with_access_token(token),
            None => session,
        }))
    }

    /// Update last used timestamp
    pub fn touch_session(&self) -> Result<()> {
        self.conn.execute(
            "UPDATE session SET last_used_at = ?1 WHERE slot = 0",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Forget the stored session
    pub fn clear_session(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session", params![])?;
        Ok(())
    }
}
