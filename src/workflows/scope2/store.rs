use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::domain::{Submission, SubmissionId, SubmissionStatus};

/// Storage abstraction so the workflow layer can be exercised in isolation.
///
/// Transition legality is the workflow's job: `update_status` overwrites
/// whatever status is present.
pub trait SubmissionStore: Send + Sync {
    fn insert(&self, submission: Submission) -> Result<Submission, StorageError>;
    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, StorageError>;
    fn update_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        rejection_reason: Option<String>,
    ) -> Result<Submission, StorageError>;
    fn pending(&self, limit: usize) -> Result<Vec<Submission>, StorageError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("submission already exists")]
    Conflict,
    #[error("submission not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// In-memory store for tests and the CLI demo path.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<SubmissionId, Submission>>,
}

impl SubmissionStore for MemoryStore {
    fn insert(&self, submission: Submission) -> Result<Submission, StorageError> {
        let mut records = self.records.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        if records.contains_key(&submission.id) {
            return Err(StorageError::Conflict);
        }
        records.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, StorageError> {
        let records = self.records.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        Ok(records.get(id).cloned())
    }

    fn update_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        rejection_reason: Option<String>,
    ) -> Result<Submission, StorageError> {
        let mut records = self.records.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        let record = records.get_mut(id).ok_or(StorageError::NotFound)?;
        record.status = status;
        if status == SubmissionStatus::Rejected {
            record.rejection_reason = rejection_reason;
        }
        Ok(record.clone())
    }

    fn pending(&self, limit: usize) -> Result<Vec<Submission>, StorageError> {
        let records = self.records.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        let mut pending: Vec<Submission> = records
            .values()
            .filter(|record| record.status == SubmissionStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|record| record.submitted_at);
        pending.truncate(limit);
        Ok(pending)
    }
}

/// Whole-file JSON collection store.
///
/// Every mutation holds the mutex across the full read-modify-write so a
/// single writer is in flight at a time, and the rewrite lands through a
/// temp file + rename so an interrupted write never truncates the
/// collection.
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<Vec<Submission>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| StorageError::Unavailable(format!("corrupt collection: {err}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(StorageError::Unavailable(err.to_string())),
        }
    }

    fn write_all(&self, submissions: &[Submission]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(submissions)
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;

        let tmp = tmp_path(&self.path);
        let mut file =
            fs::File::create(&tmp).map_err(|err| StorageError::Unavailable(err.to_string()))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|err| StorageError::Unavailable(err.to_string()))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

impl SubmissionStore for JsonFileStore {
    fn insert(&self, submission: Submission) -> Result<Submission, StorageError> {
        let _lock = self.guard.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        let mut submissions = self.read_all()?;
        if submissions.iter().any(|s| s.id == submission.id) {
            return Err(StorageError::Conflict);
        }
        submissions.push(submission.clone());
        self.write_all(&submissions)?;
        Ok(submission)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, StorageError> {
        let _lock = self.guard.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        let submissions = self.read_all()?;
        Ok(submissions.into_iter().find(|s| &s.id == id))
    }

    fn update_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        rejection_reason: Option<String>,
    ) -> Result<Submission, StorageError> {
        let _lock = self.guard.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        let mut submissions = self.read_all()?;
        let record = submissions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or(StorageError::NotFound)?;
        record.status = status;
        if status == SubmissionStatus::Rejected {
            record.rejection_reason = rejection_reason;
        }
        let updated = record.clone();
        self.write_all(&submissions)?;
        Ok(updated)
    }

    fn pending(&self, limit: usize) -> Result<Vec<Submission>, StorageError> {
        let _lock = self.guard.lock()
            .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))?;
        let submissions = self.read_all()?;
        let mut pending: Vec<Submission> = submissions
            .into_iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .collect();
        pending.sort_by_key(|record| record.submitted_at);
        pending.truncate(limit);
        Ok(pending)
    }
}
