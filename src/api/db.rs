//! Minimal operator-auth store (SQLite). The engine's own domain state
//! lives in `crate::store`; this database only protects the
//! demonstration API's mutating endpoints with an operator login.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rusqlite::Connection;
use tokio::sync::Mutex;

pub type Db = Arc<Mutex<Connection>>;

pub fn open(path: &std::path::Path) -> Result<(Db, String)> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("creating db directory")?;
    }

    let conn = Connection::open(path).with_context(|| format!("opening sqlite at {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
    migrate(&conn)?;
    let secret = ensure_auth_secret(&conn)?;

    Ok((Arc::new(Mutex::new(conn)), secret))
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS operators (
            id            TEXT PRIMARY KEY,
            username      TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at    INTEGER DEFAULT (unixepoch())
        );

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn ensure_auth_secret(conn: &Connection) -> Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT value FROM config WHERE key = 'auth_secret'", [], |row| row.get(0))
        .ok();

    if let Some(secret) = existing {
        return Ok(secret);
    }

    let mut bytes = [0u8; 64];
    rand::rng().fill_bytes(&mut bytes);
    let secret = URL_SAFE_NO_PAD.encode(bytes);

    conn.execute("INSERT INTO config (key, value) VALUES ('auth_secret', ?1)", [&secret])?;

    Ok(secret)
}
