/// Remote document store collaborator
///
/// The tracker is local-first: a backup is pushed opportunistically after each
/// committed change and a failing backup never fails the change itself.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{UserGoals, UserId};

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote store unreachable: {0}")]
    Unreachable(String),
}

/// Account-scoped durable copy of `UserGoals`
pub trait RemoteBackup {
    /// Create or replace the user's document
    fn push(&self, user: &UserId, state: &UserGoals) -> Result<(), RemoteError>;

    /// Read the user's document, `None` if it was never written
    fn fetch(&self, user: &UserId) -> Result<Option<UserGoals>, RemoteError>;
}

/// Namespace used to derive backup file names from user ids
const BACKUP_NAMESPACE: Uuid = Uuid::from_u128(0x3b7e_1d52_8c94_4a06_b1f3_5e20_d9a8_7c41);

/// Backup that keeps one JSON document per user in a directory
#[derive(Debug, Clone)]
pub struct JsonFileBackup {
    dir: PathBuf,
}

impl JsonFileBackup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, user: &UserId) -> PathBuf {
        let file_name = Uuid::new_v5(&BACKUP_NAMESPACE, user.as_str().as_bytes());
        self.dir.join(format!("{}.json", file_name))
    }
}

impl RemoteBackup for JsonFileBackup {
    fn push(&self, user: &UserId, state: &UserGoals) -> Result<(), RemoteError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.document_path(user);
        let tmp = path.with_extension("json.tmp");

        // Write then rename so a crash never leaves half a document behind
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!("Backed up state for {} to {:?}", user, path);
        Ok(())
    }

    fn fetch(&self, user: &UserId) -> Result<Option<UserGoals>, RemoteError> {
        let path = self.document_path(user);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&contents)?;
        Ok(Some(UserGoals::from_json_value(value)?))
    }
}
