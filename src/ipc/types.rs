use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;

/// One JSON line read from stdin.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The open TMS workspace, if any. `db` is the connection to
/// `<workspace>/tms.sqlite3` and is set together with `workspace`.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }
}
