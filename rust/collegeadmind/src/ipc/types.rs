use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An opened workspace: the directory and its database, set together.
pub struct Workspace {
    pub path: PathBuf,
    pub conn: Connection,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<Workspace>,
}

impl AppState {
    pub fn db(&self) -> Option<&Connection> {
        self.workspace.as_ref().map(|w| &w.conn)
    }

    pub fn db_mut(&mut self) -> Option<&mut Connection> {
        self.workspace.as_mut().map(|w| &mut w.conn)
    }
}
