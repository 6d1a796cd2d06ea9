use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";
const REPOSITORY_COLUMNS: &str = "id, user_id, view_name, name, link, created_at";
const FILE_COLUMNS: &str = "id, rep_id, view_name, name, download_link, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed precision keeps the text ordering equal to the time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Returns the constraint message when `err` is a constraint violation.
fn constraint_violation(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(e, message)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(message.as_deref().unwrap_or(""))
        }
        _ => None,
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn repository_from_row(row: &Row) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: row.get(0)?,
        user_id: row.get(1)?,
        view_name: row.get(2)?,
        name: row.get(3)?,
        link: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn file_from_row(row: &Row) -> rusqlite::Result<RepoFile> {
    Ok(RepoFile {
        id: row.get(0)?,
        rep_id: row.get(1)?,
        view_name: row.get(2)?,
        name: row.get(3)?,
        download_link: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

impl SqliteStore {
    fn query_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
            params![value],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn query_repository(&self, column: &str, value: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE {column} = ?1"),
            params![value],
            repository_from_row,
        )
        .optional()
        .map_err(Error::from)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                format_datetime(&user.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_violation(&e).is_some() => Err(Error::Conflict(
                "There is already an account with the same email or username".to_string(),
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.query_user("id", id)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.query_user("name", name)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user("email", email)
    }

    // Repository operations

    fn create_repository(&self, repository: &Repository) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO repositories (id, user_id, view_name, name, link, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                repository.id,
                repository.user_id,
                repository.view_name,
                repository.name,
                repository.link,
                format_datetime(&repository.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => match constraint_violation(&e) {
                Some(message) if message.contains("repositories.link") => {
                    Err(Error::LinkCollision)
                }
                Some(message) if message.contains("repositories.name") => Err(Error::Conflict(
                    format!("Repository '{}' already exists", repository.name),
                )),
                _ => Err(Error::from(e)),
            },
        }
    }

    fn get_repository(&self, id: &str) -> Result<Option<Repository>> {
        self.query_repository("id", id)
    }

    fn get_repository_by_link(&self, link: &str) -> Result<Option<Repository>> {
        self.query_repository("link", link)
    }

    fn get_repository_by_bucket(&self, bucket: &str) -> Result<Option<Repository>> {
        self.query_repository("name", bucket)
    }

    fn list_user_repositories(&self, user_id: &str) -> Result<Vec<Repository>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], repository_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_repository(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM files WHERE rep_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM repositories WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    // File operations

    fn create_file(&self, file: &RepoFile) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO files (id, rep_id, view_name, name, download_link, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.id,
                file.rep_id,
                file.view_name,
                file.name,
                file.download_link,
                format_datetime(&file.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_violation(&e).is_some() => Err(Error::Conflict(format!(
                "File '{}' already exists in this repository",
                file.name
            ))),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_file(&self, rep_id: &str, name: &str) -> Result<Option<RepoFile>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE rep_id = ?1 AND name = ?2"),
            params![rep_id, name],
            file_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_files(&self, rep_id: &str) -> Result<Vec<RepoFile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE rep_id = ?1 ORDER BY created_at, rowid"
        ))?;

        let rows = stmt.query_map(params![rep_id], file_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_file(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM files WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
