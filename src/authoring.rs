use crate::{
    api::QuizApi,
    error::{ClientError, DraftError},
    models::{CreateQuizRequest, Question, Quiz},
    notify::Notice,
};

/// Options a question must keep once the author starts removing them.
pub const MIN_OPTIONS: usize = 2;

/// QuizDraft
///
/// The quiz-authoring form: a title plus an ordered list of questions, each
/// with ordered options and a free-text correct option. Nothing is sent until
/// `submit`, and a failed submit leaves every field as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    title: String,
    username: String,
    questions: Vec<Question>,
}

fn blank_question() -> Question {
    Question {
        text: String::new(),
        options: vec![String::new(); MIN_OPTIONS],
        correct_option: String::new(),
    }
}

impl QuizDraft {
    /// A fresh form for `username`: one blank question with two blank options.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            username: username.into(),
            questions: vec![blank_question()],
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Appends a blank question and returns its index.
    pub fn add_question(&mut self) -> usize {
        self.questions.push(blank_question());
        self.questions.len() - 1
    }

    /// Removes a question. The last remaining question cannot be removed.
    pub fn remove_question(&mut self, index: usize) -> Result<(), DraftError> {
        self.question(index)?;
        if self.questions.len() <= 1 {
            return Err(DraftError::LastQuestion);
        }
        self.questions.remove(index);
        Ok(())
    }

    pub fn set_question_text(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), DraftError> {
        self.question_mut(index)?.text = text.into();
        Ok(())
    }

    /// Appends a blank option to a question and returns its index.
    pub fn add_option(&mut self, index: usize) -> Result<usize, DraftError> {
        let question = self.question_mut(index)?;
        question.options.push(String::new());
        Ok(question.options.len() - 1)
    }

    /// Removes an option. A question never drops below two options this way.
    pub fn remove_option(&mut self, index: usize, option: usize) -> Result<(), DraftError> {
        let question = self.question_mut(index)?;
        if option >= question.options.len() {
            return Err(DraftError::IndexOutOfRange("option"));
        }
        if question.options.len() <= MIN_OPTIONS {
            return Err(DraftError::MinimumOptions);
        }
        question.options.remove(option);
        Ok(())
    }

    pub fn set_option(
        &mut self,
        index: usize,
        option: usize,
        text: impl Into<String>,
    ) -> Result<(), DraftError> {
        let slot = self
            .question_mut(index)?
            .options
            .get_mut(option)
            .ok_or(DraftError::IndexOutOfRange("option"))?;
        *slot = text.into();
        Ok(())
    }

    /// Sets the correct option's text. It is not checked against the options.
    pub fn set_correct_option(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), DraftError> {
        self.question_mut(index)?.correct_option = text.into();
        Ok(())
    }

    /// validate
    ///
    /// Every field the form marks as required must be non-blank: the title,
    /// each question's text, each option, and each correct option.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingField("title".to_string()));
        }
        for (q, question) in self.questions.iter().enumerate() {
            let n = q + 1;
            if question.text.trim().is_empty() {
                return Err(DraftError::MissingField(format!("question {n} text")));
            }
            if let Some(o) = question.options.iter().position(|opt| opt.trim().is_empty()) {
                return Err(DraftError::MissingField(format!(
                    "question {n} option {}",
                    o + 1
                )));
            }
            if question.correct_option.trim().is_empty() {
                return Err(DraftError::MissingField(format!(
                    "question {n} correct option"
                )));
            }
        }
        Ok(())
    }

    /// The `POST /quizzes` body for the current form contents.
    pub fn to_request(&self) -> CreateQuizRequest {
        CreateQuizRequest {
            title: self.title.clone(),
            username: self.username.clone(),
            questions: self.questions.clone(),
        }
    }

    /// submit
    ///
    /// Validates and posts the whole quiz in one request. The draft is only
    /// borrowed, so on any failure the caller still holds the form intact.
    pub async fn submit(&self, api: &dyn QuizApi) -> Result<Quiz, ClientError> {
        self.validate()?;

        let request = self.to_request();
        let quiz = api.create_quiz(&request).await.map_err(|e| {
            tracing::error!(error = %e, title = %self.title, "Failed to add quiz");
            e
        })?;

        tracing::info!(quiz_id = quiz.id, questions = quiz.questions.len(), "Quiz created");
        Ok(quiz)
    }

    fn question(&self, index: usize) -> Result<&Question, DraftError> {
        self.questions
            .get(index)
            .ok_or(DraftError::IndexOutOfRange("question"))
    }

    fn question_mut(&mut self, index: usize) -> Result<&mut Question, DraftError> {
        self.questions
            .get_mut(index)
            .ok_or(DraftError::IndexOutOfRange("question"))
    }
}

/// The notice shown for a draft operation's outcome.
pub fn notice_for(result: &Result<Quiz, ClientError>) -> Notice {
    match result {
        Ok(_) => Notice::success("Quiz added successfully!"),
        Err(ClientError::Draft(e)) => Notice::info(e.to_string()),
        Err(_) => Notice::error("Failed to add quiz."),
    }
}
