//! ローカル専用の ToDo キャッシュ
//!
//! サインイン前のフォールバックとして端末ごとに ToDo を保存する。
//! サーバー側のデータとは独立しており、同期やマージは一切行わない。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LocalCacheError {
    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("Local cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 端末に保存される ToDo（所有者を持たない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTodo {
    pub id: String,
    pub title: String,
    pub completed: bool,
    /// エポックミリ秒
    pub created_at: i64,
}

/// 端末 ID ごとに 1 ファイル（JSON 配列）で保存するキャッシュ
#[derive(Debug, Clone)]
pub struct LocalTodoCache {
    dir: PathBuf,
}

impl LocalTodoCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, device_id: &str) -> Result<PathBuf, LocalCacheError> {
        let valid = !device_id.is_empty()
            && device_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(LocalCacheError::InvalidDeviceId(device_id.to_string()));
        }
        Ok(self.dir.join(format!("{device_id}.json")))
    }

    /// 保存済みの ToDo を新しい順で返す。
    /// ファイルが無い、または壊れている場合は空として扱う。
    pub fn load(&self, device_id: &str) -> Result<Vec<LocalTodo>, LocalCacheError> {
        let path = self.path_for(device_id)?;

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(todos) => Ok(todos),
            Err(e) => {
                warn!(device_id, error = %e, "Discarding unreadable local cache");
                Ok(Vec::new())
            }
        }
    }

    /// 先頭に追加する。空白のみのタイトルは無視して `None`。
    pub fn add(&self, device_id: &str, title: &str) -> Result<Option<LocalTodo>, LocalCacheError> {
        if title.trim().is_empty() {
            return Ok(None);
        }

        let todo = LocalTodo {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
            created_at: Utc::now().timestamp_millis(),
        };

        let mut todos = self.load(device_id)?;
        todos.insert(0, todo.clone());
        self.save(device_id, &todos)?;

        Ok(Some(todo))
    }

    /// 完了状態を反転する。該当が無ければ `None`。
    pub fn toggle(&self, device_id: &str, id: &str) -> Result<Option<LocalTodo>, LocalCacheError> {
        let mut todos = self.load(device_id)?;

        let toggled = todos.iter_mut().find(|t| t.id == id).map(|t| {
            t.completed = !t.completed;
            t.clone()
        });

        if toggled.is_some() {
            self.save(device_id, &todos)?;
        }
        Ok(toggled)
    }

    pub fn remove(&self, device_id: &str, id: &str) -> Result<bool, LocalCacheError> {
        let mut todos = self.load(device_id)?;
        let before = todos.len();
        todos.retain(|t| t.id != id);

        if todos.len() == before {
            return Ok(false);
        }
        self.save(device_id, &todos)?;
        Ok(true)
    }

    pub fn clear(&self, device_id: &str) -> Result<(), LocalCacheError> {
        let path = self.path_for(device_id)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, device_id: &str, todos: &[LocalTodo]) -> Result<(), LocalCacheError> {
        let path = self.path_for(device_id)?;
        fs::create_dir_all(&self.dir)?;

        // 一時ファイルに書いてから置き換える
        let tmp = tmp_path(&path);
        fs::write(&tmp, serde_json::to_vec(todos)?)?;
        fs::rename(&tmp, &path)?;

        debug!(device_id, count = todos.len(), "Saved local cache");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
