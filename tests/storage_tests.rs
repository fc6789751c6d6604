use chrono::DateTime;
use quiz_master::{
    ClientState,
    config::AppConfig,
    models::User,
    storage::{FileStateStore, MemoryStateStore, StateStore},
};
use tempfile::TempDir;

fn student() -> User {
    User {
        id: 3,
        username: "sam".to_string(),
        is_teacher: false,
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::open(dir.path().join("nested/state.json")).unwrap();

        assert_eq!(store.load_session().unwrap(), None);
        assert_eq!(store.start_time(1).unwrap(), None);
        // Nothing is written until the first mutation.
        assert!(!store.path().exists());
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.json");

        FileStateStore::open(&path)
            .unwrap()
            .save_session(&student())
            .unwrap();

        let reopened = FileStateStore::open(&path).unwrap();
        assert_eq!(reopened.load_session().unwrap(), Some(student()));
    }

    #[test]
    fn test_start_times_are_keyed_by_quiz() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let started = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        let store = FileStateStore::open(&path).unwrap();
        store.set_start_time(4, started).unwrap();

        let reopened = FileStateStore::open(&path).unwrap();
        assert_eq!(reopened.start_time(4).unwrap(), Some(started));
        assert_eq!(reopened.start_time(5).unwrap(), None);

        reopened.remove_start_time(4).unwrap();
        let again = FileStateStore::open(&path).unwrap();
        assert_eq!(again.start_time(4).unwrap(), None);
    }

    #[test]
    fn test_clear_session_keeps_start_times() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let started = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let store = FileStateStore::open(&path).unwrap();
        store.save_session(&student()).unwrap();
        store.set_start_time(9, started).unwrap();
        store.clear_session().unwrap();

        let reopened = FileStateStore::open(&path).unwrap();
        assert_eq!(reopened.load_session().unwrap(), None);
        assert_eq!(reopened.start_time(9).unwrap(), Some(started));
    }

    #[test]
    fn test_unreadable_session_blob_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"session": {"data": "legacy"}, "start_times": {"2": 5}}"#)
            .unwrap();

        let store = FileStateStore::open(&path).unwrap();
        assert_eq!(store.load_session().unwrap(), None);
        assert!(store.start_time(2).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStateStore::open(&path).unwrap();

        assert_eq!(store.load_session().unwrap(), None);
        assert_eq!(store.start_time(1).unwrap(), None);
        // The bad document is kept beside the state file.
        let aside = dir.path().join("state.json.corrupt");
        assert_eq!(std::fs::read_to_string(aside).unwrap(), "{not json");
        assert!(!path.exists());

        store.save_session(&student()).unwrap();
        let reopened = FileStateStore::open(&path).unwrap();
        assert_eq!(reopened.load_session().unwrap(), Some(student()));
    }

    #[test]
    fn test_client_starts_with_corrupt_state_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let config = AppConfig {
            state_path: path,
            ..AppConfig::default()
        };

        let state = ClientState::from_config(config).unwrap();
        assert_eq!(state.store.load_session().unwrap(), None);
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryStateStore::new();
        store.save_session(&student()).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(student()));

        store.clear_session().unwrap();
        assert_eq!(store.load_session().unwrap(), None);
    }

    #[test]
    fn test_memory_failure() {
        let store = MemoryStateStore::new_failing();
        let started = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        assert!(store.save_session(&student()).is_err());
        assert!(store.set_start_time(1, started).is_err());
        // Reads still work so a broken store never blocks startup.
        assert_eq!(store.load_session().unwrap(), None);
    }
}
