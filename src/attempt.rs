//! The quiz-taking controller.
//!
//! An attempt is `InProgress` until it is submitted, by hand or by the
//! deadline, and `Submitted` forever after. The deadline is anchored to a
//! start time kept in the `StateStore`, so reopening the same quiz resumes the
//! original countdown instead of granting a fresh one.

use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    clock::{Clock, ClockState},
    error::StoreError,
    models::{Quiz, QuizId, Role, Score},
    notify::Notice,
    storage::StoreState,
};

/// How often a live attempt re-evaluates its deadline.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    InProgress,
    Submitted,
}

/// ScoreReport
///
/// Produced exactly once per attempt, when it is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreReport {
    pub quiz_id: QuizId,
    pub score: Score,
    pub notice: Notice,
}

/// Outcome of re-evaluating the deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Still running; whole seconds left.
    Running(u64),
    /// The deadline passed on this tick and the attempt was finalized.
    Expired(ScoreReport),
    /// Nothing to do: already submitted, or a reviewer's view.
    Idle,
}

/// QuizAttempt
///
/// Per-quiz attempt state for one viewer. Reviewers (teachers) get a
/// read-only attempt: no deadline, no stored start time, no answers.
pub struct QuizAttempt {
    quiz: Quiz,
    role: Role,
    store: StoreState,
    started_at: Option<DateTime<Utc>>,
    duration: Duration,
    answers: BTreeMap<usize, String>,
    state: AttemptState,
    time_left: u64,
}

impl QuizAttempt {
    /// start
    ///
    /// Opens (or resumes) an attempt. For students the stored start time for
    /// this quiz is reused when present; otherwise `now` is stamped and
    /// persisted before the attempt is returned.
    pub fn start(
        quiz: Quiz,
        role: Role,
        store: StoreState,
        clock: &dyn Clock,
        duration: Duration,
    ) -> Result<Self, StoreError> {
        let now = clock.now();

        let started_at = if role.is_reviewer() {
            None
        } else {
            match store.start_time(quiz.id)? {
                Some(started) => {
                    tracing::info!(quiz_id = quiz.id, %started, "Resuming attempt");
                    Some(started)
                }
                None => {
                    store.set_start_time(quiz.id, now)?;
                    tracing::info!(quiz_id = quiz.id, "Starting attempt");
                    Some(now)
                }
            }
        };

        let mut attempt = Self {
            quiz,
            role,
            store,
            started_at,
            duration,
            answers: BTreeMap::new(),
            state: AttemptState::InProgress,
            time_left: duration.as_secs(),
        };
        if let Some(remaining) = attempt.remaining(now) {
            attempt.time_left = remaining;
        }
        Ok(attempt)
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn is_submitted(&self) -> bool {
        self.state == AttemptState::Submitted
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// The last displayed countdown value, in whole seconds.
    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    pub fn answer(&self, question_index: usize) -> Option<&str> {
        self.answers.get(&question_index).map(String::as_str)
    }

    /// True once every question has an answer. Manual submission is only
    /// offered from this point on. A quiz with no questions is complete at once.
    pub fn is_complete(&self) -> bool {
        self.answers.len() == self.quiz.questions.len()
    }

    /// remaining
    ///
    /// `duration - floor(now - start)` in whole seconds, clamped at zero.
    /// `None` for reviewers, who have no deadline.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        let started = self.started_at?;
        let elapsed = (now - started).num_seconds().max(0) as u64;
        Some(self.duration.as_secs().saturating_sub(elapsed))
    }

    /// tick
    ///
    /// Recomputes the countdown from the stored start time. Reaching zero
    /// finalizes the attempt through `submit`, the same path as a manual
    /// submission.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.is_submitted() {
            return Tick::Idle;
        }
        let Some(remaining) = self.remaining(now) else {
            return Tick::Idle;
        };

        if remaining == 0 {
            self.time_left = 0;
            tracing::info!(quiz_id = self.quiz.id, "Time is up, submitting");
            return match self.submit() {
                Some(report) => Tick::Expired(report),
                None => Tick::Idle,
            };
        }

        self.time_left = remaining;
        Tick::Running(remaining)
    }

    /// select_answer
    ///
    /// Records `option` for the question, replacing any earlier choice.
    /// Returns false, leaving state untouched, when the attempt is already
    /// submitted, the viewer is a reviewer, or the index names no question.
    pub fn select_answer(&mut self, question_index: usize, option: impl Into<String>) -> bool {
        if self.is_submitted() || self.role.is_reviewer() {
            return false;
        }
        if question_index >= self.quiz.questions.len() {
            return false;
        }
        self.answers.insert(question_index, option.into());
        true
    }

    /// submit
    ///
    /// Finalizes the attempt. Only the first call has any effect: it drops
    /// the stored start time, moves to `Submitted` and returns the report.
    /// Later calls return `None` and change nothing. Reviewers cannot submit.
    pub fn submit(&mut self) -> Option<ScoreReport> {
        if self.is_submitted() || self.role.is_reviewer() {
            return None;
        }
        self.state = AttemptState::Submitted;

        // The score is already final; a stale key only costs a stale timer later.
        if let Err(e) = self.store.remove_start_time(self.quiz.id) {
            tracing::error!(quiz_id = self.quiz.id, error = %e, "Failed to clear start time");
        }

        let score = Score::tally(&self.quiz.questions, &self.answers);
        tracing::info!(quiz_id = self.quiz.id, %score, "Attempt submitted");

        Some(ScoreReport {
            quiz_id: self.quiz.id,
            score,
            notice: Notice::info(format!(
                "You scored {} out of {}",
                score.correct, score.total
            )),
        })
    }

    /// The score, recomputed from the stored answers. Only available once submitted.
    pub fn score(&self) -> Option<Score> {
        self.is_submitted()
            .then(|| Score::tally(&self.quiz.questions, &self.answers))
    }
}

/// Renders whole seconds as `mm:ss`.
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

// --- Countdown Task ---

/// An attempt shared between the view and its countdown task.
pub type SharedAttempt = Arc<Mutex<QuizAttempt>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Tick(u64),
    Expired(ScoreReport),
}

/// AttemptTimer
///
/// The one-second countdown owned by a live attempt. The task stops itself
/// once the attempt is submitted; `cancel` or dropping the timer stops it
/// earlier. At most one should exist per open attempt.
#[derive(Debug)]
pub struct AttemptTimer {
    handle: JoinHandle<()>,
}

impl AttemptTimer {
    /// spawn
    ///
    /// Starts the countdown and returns the event stream. Reviewers and
    /// already-submitted attempts get no timer at all.
    pub async fn spawn(
        attempt: SharedAttempt,
        clock: ClockState,
    ) -> Option<(Self, mpsc::UnboundedReceiver<TimerEvent>)> {
        {
            let guard = attempt.lock().await;
            if guard.role().is_reviewer() || guard.is_submitted() {
                return None;
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                // Expiry writes to the state store, which does blocking IO.
                let mut guard = attempt.clone().lock_owned().await;
                let now = clock.now();
                let tick = match tokio::task::spawn_blocking(move || guard.tick(now)).await {
                    Ok(tick) => tick,
                    Err(e) => {
                        tracing::error!(error = %e, "Countdown tick failed");
                        break;
                    }
                };

                let event = match tick {
                    Tick::Running(secs) => TimerEvent::Tick(secs),
                    Tick::Expired(report) => TimerEvent::Expired(report),
                    Tick::Idle => break,
                };

                let expired = matches!(event, TimerEvent::Expired(_));
                if tx.send(event).is_err() || expired {
                    break;
                }
            }
            tracing::debug!("Countdown stopped");
        });

        Some((Self { handle }, rx))
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AttemptTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
