use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    error::StoreError,
    models::{QuizId, User},
};

// 1. StateStore Contract
/// StateStore
///
/// The client's persisted state: the signed-in identity, and one attempt
/// start time per quiz. Start times are what keep a countdown alive across
/// restarts, so every write must be durable before it returns.
///
/// Swapping `FileStateStore` for `MemoryStateStore` in tests does not change
/// any caller.
pub trait StateStore: Send + Sync {
    /// The persisted identity, if someone is signed in.
    fn load_session(&self) -> Result<Option<User>, StoreError>;

    fn save_session(&self, user: &User) -> Result<(), StoreError>;

    /// Forgets the identity. Attempt start times are left alone.
    fn clear_session(&self) -> Result<(), StoreError>;

    /// The recorded start of the attempt on `quiz_id`.
    fn start_time(&self, quiz_id: QuizId) -> Result<Option<DateTime<Utc>>, StoreError>;

    fn set_start_time(&self, quiz_id: QuizId, started: DateTime<Utc>) -> Result<(), StoreError>;

    /// Called exactly when an attempt is finalized.
    fn remove_start_time(&self, quiz_id: QuizId) -> Result<(), StoreError>;
}

/// PersistedState
///
/// On-disk document shape. Start times are epoch milliseconds keyed by quiz id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    session: Option<serde_json::Value>,
    #[serde(default)]
    start_times: BTreeMap<QuizId, i64>,
}

impl PersistedState {
    fn session(&self) -> Option<User> {
        let raw = self.session.clone()?;
        match serde_json::from_value(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                // A blob from an older client or a hand edit. Treat as signed out.
                tracing::warn!(error = %e, "Discarding unreadable session blob");
                None
            }
        }
    }

    fn start_time(&self, quiz_id: QuizId) -> Option<DateTime<Utc>> {
        self.start_times
            .get(&quiz_id)
            .and_then(|millis| DateTime::from_timestamp_millis(*millis))
    }
}

// 2. The Real Implementation (JSON file)
/// FileStateStore
///
/// Keeps the whole document in memory and rewrites the file after each
/// mutation. The file and its parent directory are created on first write.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl FileStateStore {
    /// open
    ///
    /// Loads the document at `path`. A missing file reads as empty state.
    /// A document that is not valid JSON is moved aside to `<path>.corrupt`
    /// and the client starts signed out with no running attempts.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let state = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => PersistedState::default(),
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable client state");
                    Self::set_aside(&path);
                    PersistedState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), "Opened client state");

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Keeps the bad document around for inspection. Failure here is not fatal:
    // the next write replaces the file anyway.
    fn set_aside(path: &Path) {
        let mut aside = path.as_os_str().to_owned();
        aside.push(".corrupt");
        if let Err(e) = fs::rename(path, &aside) {
            tracing::warn!(path = %path.display(), error = %e, "Could not move unreadable state aside");
        }
    }

    fn lock(&self) -> MutexGuard<'_, PersistedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Write to a sibling temp file and rename so a crash never leaves half a document.
    fn flush(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut PersistedState) -> Result<(), StoreError>,
    {
        let mut state = self.lock();
        let mut next = state.clone();
        change(&mut next)?;
        self.flush(&next)?;
        *state = next;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load_session(&self) -> Result<Option<User>, StoreError> {
        Ok(self.lock().session())
    }

    fn save_session(&self, user: &User) -> Result<(), StoreError> {
        let blob = serde_json::to_value(user)?;
        self.mutate(|state| {
            state.session = Some(blob);
            Ok(())
        })
    }

    fn clear_session(&self) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.session = None;
            Ok(())
        })
    }

    fn start_time(&self, quiz_id: QuizId) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.lock().start_time(quiz_id))
    }

    fn set_start_time(&self, quiz_id: QuizId, started: DateTime<Utc>) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.start_times.insert(quiz_id, started.timestamp_millis());
            Ok(())
        })
    }

    fn remove_start_time(&self, quiz_id: QuizId) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.start_times.remove(&quiz_id);
            Ok(())
        })
    }
}

// 3. The In-Memory Implementation (For Tests)
/// MemoryStateStore
///
/// Same contract as `FileStateStore` without touching disk. `new_failing`
/// makes every write fail so callers' error paths can be exercised.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<PersistedState>,
    /// When true, all writes return a simulated failure.
    pub should_fail: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, PersistedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Io(std::io::Error::other(
                "Mock Store Error: Simulation requested",
            )));
        }
        Ok(())
    }
}

impl StateStore for MemoryStateStore {
    fn load_session(&self) -> Result<Option<User>, StoreError> {
        Ok(self.lock().session())
    }

    fn save_session(&self, user: &User) -> Result<(), StoreError> {
        self.check()?;
        self.lock().session = Some(serde_json::to_value(user)?);
        Ok(())
    }

    fn clear_session(&self) -> Result<(), StoreError> {
        self.check()?;
        self.lock().session = None;
        Ok(())
    }

    fn start_time(&self, quiz_id: QuizId) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.lock().start_time(quiz_id))
    }

    fn set_start_time(&self, quiz_id: QuizId, started: DateTime<Utc>) -> Result<(), StoreError> {
        self.check()?;
        self.lock()
            .start_times
            .insert(quiz_id, started.timestamp_millis());
        Ok(())
    }

    fn remove_start_time(&self, quiz_id: QuizId) -> Result<(), StoreError> {
        self.check()?;
        self.lock().start_times.remove(&quiz_id);
        Ok(())
    }
}

/// StoreState
///
/// Shared handle to the persisted client state.
pub type StoreState = Arc<dyn StateStore>;
