use chrono::{Duration, TimeZone, Utc};
use quiz_master::{
    ApiState, ClientState, Clock, ClockState, ManualClock, MemoryStateStore, MockQuizApi, StateStore,
    StoreState,
    config::AppConfig,
    console::Console,
    models::{Question, Quiz, User},
};
use std::sync::Arc;

fn teacher() -> User {
    User {
        id: 1,
        username: "teach".to_string(),
        is_teacher: true,
    }
}

fn student() -> User {
    User {
        id: 2,
        username: "sam".to_string(),
        is_teacher: false,
    }
}

fn arithmetic() -> Quiz {
    Quiz {
        id: 1,
        title: "Arithmetic".to_string(),
        questions: vec![Question {
            text: "2+2?".to_string(),
            options: vec!["3".to_string(), "4".to_string()],
            correct_option: "4".to_string(),
        }],
    }
}

struct Harness {
    api: Arc<MockQuizApi>,
    store: Arc<MemoryStateStore>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        let api = MockQuizApi::new()
            .with_quiz(arithmetic())
            .with_account(student(), "pw")
            .with_account(teacher(), "secret");
        Self {
            api: Arc::new(api),
            store: Arc::new(MemoryStateStore::new()),
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            )),
        }
    }

    fn signed_in(self, user: &User) -> Self {
        self.store.save_session(user).unwrap();
        self
    }

    /// Feeds `script` line by line and returns everything printed.
    async fn run(&self, script: &str) -> String {
        let state = ClientState {
            api: self.api.clone() as ApiState,
            store: self.store.clone() as StoreState,
            clock: self.clock.clone() as ClockState,
            config: AppConfig::default(),
        };
        let mut out = Vec::new();
        let mut console = Console::new(state, script.as_bytes(), &mut out);
        console.run().await.unwrap();
        drop(console);
        String::from_utf8(out).unwrap()
    }
}

#[tokio::test]
async fn test_login_lands_student_on_home() {
    let harness = Harness::new();

    let out = harness.run("sam\npw\nquit\n").await;

    assert!(out.contains("[ok] Welcome, sam"));
    assert!(out.contains("Student Dashboard"));
    assert!(out.contains("[1] Arithmetic"));
    assert_eq!(harness.store.load_session().unwrap(), Some(student()));
}

#[tokio::test]
async fn test_bad_login_stays_on_login() {
    let harness = Harness::new();

    let out = harness.run("sam\nwrong\n:quit\n").await;

    assert!(out.contains("[error] Invalid username or password."));
    assert!(!out.contains("Dashboard"));
    assert_eq!(harness.store.load_session().unwrap(), None);
}

#[tokio::test]
async fn test_student_takes_quiz_and_scores() {
    let harness = Harness::new().signed_in(&student());

    let out = harness.run("1\n1 2\nsubmit\nquit\n").await;

    assert!(out.contains("== Arithmetic =="));
    assert!(out.contains("You scored 1 out of 1"));
    assert!(out.contains("Question 1: correct"));
    assert!(out.contains("You scored 1 / 1"));
    // Finalizing the attempt clears its start time.
    assert_eq!(harness.store.start_time(1).unwrap(), None);
}

#[tokio::test]
async fn test_submit_requires_every_answer() {
    let harness = Harness::new().signed_in(&student());

    let out = harness.run("1\nsubmit\nback\nquit\n").await;

    assert!(out.contains("Answer every question before submitting."));
    assert!(!out.contains("You scored"));
    // Leaving without submitting keeps the countdown anchored.
    assert!(harness.store.start_time(1).unwrap().is_some());
}

#[tokio::test]
async fn test_reentering_quiz_resumes_countdown() {
    let harness = Harness::new().signed_in(&student());
    let started = harness.clock.now() - Duration::seconds(100);
    harness.store.set_start_time(1, started).unwrap();

    let out = harness.run("1\nback\nquit\n").await;

    assert!(out.contains("Time left: 03:20"));
    assert_eq!(harness.store.start_time(1).unwrap(), Some(started));
}

#[tokio::test]
async fn test_expired_attempt_reports_time_up() {
    let harness = Harness::new().signed_in(&student());
    // The deadline passed while the client was closed.
    let started = harness.clock.now() - Duration::seconds(400);
    harness.store.set_start_time(1, started).unwrap();

    let out = harness.run("1\nback\nquit\n").await;

    assert!(out.contains("Time is up!"));
    assert!(out.contains("[info] You scored 0 out of 1"));
    assert!(out.contains("Question 1: unanswered"));
    assert!(!out.contains("No such question or option."));
    assert_eq!(harness.store.start_time(1).unwrap(), None);
}

#[tokio::test]
async fn test_teacher_reviews_correct_options() {
    let harness = Harness::new().signed_in(&teacher());

    let out = harness.run("1\nquit\n").await;

    assert!(out.contains("Teacher Dashboard"));
    assert!(out.contains("Question 1: Correct Option: 4"));
    assert!(!out.contains("Time left"));
    assert_eq!(harness.store.start_time(1).unwrap(), None);
}

#[tokio::test]
async fn test_teacher_creates_quiz() {
    let harness = Harness::new().signed_in(&teacher());

    let script = "new\n\
                  title Capitals\n\
                  text 1 Capital of France?\n\
                  opt 1 1 Paris\n\
                  opt 1 2 Lyon\n\
                  o- 1 1\n\
                  correct 1 Paris\n\
                  submit\n\
                  quit\n";
    let out = harness.run(script).await;

    assert!(out.contains("[info] Minimum 2 options required."));
    assert!(out.contains("[ok] Quiz added successfully!"));
    let created = harness.api.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Capitals");
    assert_eq!(created[0].username, "teach");
    assert_eq!(created[0].questions[0].options, vec!["Paris", "Lyon"]);
}

#[tokio::test]
async fn test_student_cannot_reach_add_quiz() {
    let harness = Harness::new().signed_in(&student());

    let out = harness.run("new\nquit\n").await;

    assert!(out.contains("Unknown command: new"));
    assert!(!out.contains("Create a New Quiz"));
}

#[tokio::test]
async fn test_logout_returns_to_login() {
    let harness = Harness::new().signed_in(&student());

    let out = harness.run("logout\n:quit\n").await;

    assert!(out.contains("QuizMaster: sign in"));
    assert_eq!(harness.store.load_session().unwrap(), None);
}
