use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

// --- Quiz Schemas (owned by the backend, read-only on the client) ---

/// Numeric quiz identifier assigned by the backend.
pub type QuizId = i64;

/// QuizSummary
///
/// One entry of the `GET /quizzes` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: QuizId,
    pub title: String,
}

/// Quiz
///
/// The full quiz returned by `GET /quizzes/:id`, including the correct
/// answers. Students and teachers receive the same payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Question
///
/// `correct_option` holds the literal text of one option. The backend does
/// not check that it matches, and neither does the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: String,
}

impl Question {
    /// True when `answer` is exactly the correct option's literal value.
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_option == answer
    }
}

/// --- Request Payloads ---

/// CreateQuizRequest
///
/// Body of `POST /quizzes`. The author's username travels with the quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuizRequest {
    pub title: String,
    pub username: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// RegisterRequest
///
/// Body of `POST /register`. The account role is fixed at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub is_teacher: bool,
}

// --- Identity ---

/// User
///
/// The authenticated identity as the backend reports it. This is also the
/// blob persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub is_teacher: bool,
}

impl User {
    pub fn role(&self) -> Role {
        if self.is_teacher {
            Role::Teacher
        } else {
            Role::Student
        }
    }
}

/// Role
///
/// Teachers author quizzes and review them read-only; students take them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    /// Reviewers see correct answers, never start a countdown and cannot answer.
    pub fn is_reviewer(self) -> bool {
        self == Role::Teacher
    }
}

/// LoginResponse
///
/// Wire shape of `POST /login`: the user plus an explicit verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: Option<User>,
    pub authenticated: bool,
}

// --- Derived Values ---

/// Score
///
/// Derived, never stored: the number of questions whose stored answer equals
/// the correct option, out of the question count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    /// Tallies `answers[i] == questions[i].correct_option` over all questions.
    /// Answers keyed past the last question are ignored.
    pub fn tally(questions: &[Question], answers: &BTreeMap<usize, String>) -> Self {
        let correct = questions
            .iter()
            .enumerate()
            .filter(|(idx, question)| {
                answers
                    .get(idx)
                    .is_some_and(|answer| question.is_correct(answer))
            })
            .count();

        Self {
            correct,
            total: questions.len(),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.correct, self.total)
    }
}
