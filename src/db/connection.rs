use crate::error::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Handle on the derived-table store.
///
/// Each pipeline run or report opens its own handle and drops it when done;
/// nothing holds a connection across runs.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let mut db = Self { conn, path };
        super::migrations::run(&mut db)?;

        tracing::debug!(path = %db.path.display(), "Opened database");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let mut db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        super::migrations::run(&mut db)?;

        Ok(db)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&self.conn)
    }

    pub fn with_conn_mut<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        f(&mut self.conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
