use rusqlite::Connection;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Shared by every route. One connection; operations run while holding it.
pub struct HttpState {
    pub workspace: PathBuf,
    pub db: Mutex<Connection>,
}

impl HttpState {
    pub fn new(workspace: PathBuf, conn: Connection) -> Self {
        Self {
            workspace,
            db: Mutex::new(conn),
        }
    }
}
