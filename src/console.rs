//! Line-oriented terminal front end.
//!
//! Each view reads commands until it knows where to go next and returns that
//! route. The main loop passes every route through `routing::resolve`, so the
//! guard rules apply no matter how a view was reached.

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::{
    ClientState,
    attempt::{AttemptTimer, QuizAttempt, SharedAttempt, Tick, TimerEvent, format_remaining},
    authoring::{QuizDraft, notice_for},
    clock::Clock,
    error::{ClientError, DraftError, SessionError},
    models::{LoginRequest, Quiz, QuizId, RegisterRequest},
    notify::Notice,
    routing::{Route, resolve},
    session::Session,
};

/// Console
///
/// Owns the session for the lifetime of the program and drives one view at
/// a time over `input`/`out`.
pub struct Console<R, W> {
    state: ClientState,
    session: Session,
    input: Lines<R>,
    out: W,
}

// What a view wants to happen next.
enum Next {
    Go(Route),
    Quit,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(state: ClientState, input: R, out: W) -> Self {
        let session = Session::hydrate(state.store.clone());
        Self {
            state,
            session,
            input: input.lines(),
            out,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// run
    ///
    /// Starts at `/` and keeps navigating until the user quits or input ends.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        let mut route = Route::Login;

        loop {
            let target = resolve(route, self.session.user());
            tracing::debug!(route = %target, "Rendering view");

            let next = match target {
                Route::Login => self.login_view().await?,
                Route::Register => self.register_view().await?,
                Route::Home | Route::Dashboard => self.quiz_list_view(target).await?,
                Route::TakeQuiz(id) => self.quiz_view(id).await?,
                Route::AddQuiz => self.add_quiz_view().await?,
            };

            match next {
                Next::Go(next) => route = next,
                Next::Quit => return Ok(()),
            }
        }
    }

    // --- Plumbing ---

    fn say(&mut self, line: impl AsRef<str>) -> Result<(), ClientError> {
        writeln!(self.out, "{}", line.as_ref())?;
        self.out.flush()?;
        Ok(())
    }

    fn notify(&mut self, notice: &Notice) -> Result<(), ClientError> {
        self.say(notice.to_string())
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>, ClientError> {
        write!(self.out, "{}> ", label)?;
        self.out.flush()?;
        Ok(self.input.next_line().await?.map(|line| line.trim().to_string()))
    }

    fn logout(&mut self) -> Result<Next, ClientError> {
        if let Err(e) = self.session.logout() {
            self.notify(&Notice::error(e.to_string()))?;
        }
        Ok(Next::Go(Route::Login))
    }

    // --- Views ---

    async fn login_view(&mut self) -> Result<Next, ClientError> {
        self.say("QuizMaster: sign in (or type :register, :quit)")?;

        let Some(username) = self.prompt("username").await? else {
            return Ok(Next::Quit);
        };
        match username.as_str() {
            ":quit" => return Ok(Next::Quit),
            ":register" => return Ok(Next::Go(Route::Register)),
            "" => return Ok(Next::Go(Route::Login)),
            _ => {}
        }
        let Some(password) = self.prompt("password").await? else {
            return Ok(Next::Quit);
        };

        let request = LoginRequest { username, password };
        let outcome = self
            .session
            .login(self.state.api.as_ref(), &request)
            .await
            .map(|user| user.username.clone());

        match outcome {
            Ok(name) => self.notify(&Notice::success(format!("Welcome, {}", name)))?,
            Err(SessionError::InvalidCredentials) => {
                self.notify(&Notice::error("Invalid username or password."))?
            }
            Err(e) => {
                tracing::error!(error = %e, "Login failed");
                self.notify(&Notice::error("Login failed."))?
            }
        }
        // Signed in: the guard forwards to the right home.
        Ok(Next::Go(Route::Login))
    }

    async fn register_view(&mut self) -> Result<Next, ClientError> {
        self.say("Create an account (empty username to go back)")?;

        let Some(username) = self.prompt("username").await? else {
            return Ok(Next::Quit);
        };
        if username.is_empty() {
            return Ok(Next::Go(Route::Login));
        }
        let Some(password) = self.prompt("password").await? else {
            return Ok(Next::Quit);
        };
        let Some(teacher) = self.prompt("teacher? [y/N]").await? else {
            return Ok(Next::Quit);
        };

        let request = RegisterRequest {
            username,
            password,
            is_teacher: teacher.eq_ignore_ascii_case("y"),
        };
        match self.session.register(self.state.api.as_ref(), &request).await {
            Ok(user) => {
                self.notify(&Notice::success(format!(
                    "Registered {}. Please sign in.",
                    user.username
                )))?;
                Ok(Next::Go(Route::Login))
            }
            Err(e) => {
                tracing::error!(error = %e, "Registration failed");
                self.notify(&Notice::error("Registration failed."))?;
                Ok(Next::Go(Route::Register))
            }
        }
    }

    /// Student home and teacher dashboard: the quiz list plus role actions.
    async fn quiz_list_view(&mut self, route: Route) -> Result<Next, ClientError> {
        let username = self
            .session
            .user()
            .map(|user| user.username.clone())
            .unwrap_or_default();
        let teacher = route == Route::Dashboard;

        let heading = if teacher {
            "Teacher Dashboard"
        } else {
            "Student Dashboard"
        };
        self.say(format!("== {} ==  Welcome, {}", heading, username))?;

        // A failed fetch leaves the list empty; the user can refresh.
        let quizzes = match self.state.api.list_quizzes().await {
            Ok(quizzes) => quizzes,
            Err(e) => {
                tracing::error!(error = %e, "Error fetching quizzes");
                self.notify(&Notice::error("Could not load quizzes."))?;
                Vec::new()
            }
        };

        if quizzes.is_empty() {
            self.say("  (no quizzes)")?;
        }
        for quiz in &quizzes {
            self.say(format!("  [{}] {}", quiz.id, quiz.title))?;
        }

        let actions = if teacher {
            "<id> review | new | refresh | logout | quit"
        } else {
            "<id> take quiz | refresh | logout | quit"
        };
        self.say(actions)?;

        loop {
            let Some(line) = self.prompt("command").await? else {
                return Ok(Next::Quit);
            };
            match line.as_str() {
                "quit" => return Ok(Next::Quit),
                "logout" => return self.logout(),
                "refresh" => return Ok(Next::Go(route)),
                "new" if teacher => return Ok(Next::Go(Route::AddQuiz)),
                other => match other.parse::<QuizId>() {
                    Ok(id) => return Ok(Next::Go(Route::TakeQuiz(id))),
                    Err(_) => self.say(format!("Unknown command: {}", other))?,
                },
            }
        }
    }

    async fn quiz_view(&mut self, id: QuizId) -> Result<Next, ClientError> {
        let Some(role) = self.session.role() else {
            return Ok(Next::Go(Route::Login));
        };
        let home = Route::home_for(role);

        let quiz = match self.state.api.get_quiz(id).await {
            Ok(quiz) => quiz,
            Err(e) => {
                tracing::error!(quiz_id = id, error = %e, "Error fetching quiz details");
                self.notify(&Notice::error("Could not load the quiz."))?;
                return Ok(Next::Go(home));
            }
        };

        let attempt = match QuizAttempt::start(
            quiz,
            role,
            self.state.store.clone(),
            self.state.clock.as_ref(),
            self.state.config.attempt_duration,
        ) {
            Ok(attempt) => attempt,
            Err(e) => {
                self.notify(&Notice::error(format!("Could not start the quiz: {}", e)))?;
                return Ok(Next::Go(home));
            }
        };

        if role.is_reviewer() {
            self.render_review(attempt.quiz())?;
            return self.wait_for_back(home).await;
        }

        // The deadline may have passed while the client was closed.
        let mut attempt = attempt;
        if let Tick::Expired(report) = attempt.tick(self.state.clock.now()) {
            self.say(format!("== {} ==", attempt.quiz().title))?;
            self.say("Time is up!")?;
            self.notify(&report.notice)?;
            self.render_results(&attempt)?;
            return self.wait_for_back(home).await;
        }

        self.render_questions(attempt.quiz())?;
        self.say(format!("Time left: {}", format_remaining(attempt.time_left())))?;
        self.say("<question> <option> answer | submit | time | back | logout")?;

        let attempt: SharedAttempt = std::sync::Arc::new(tokio::sync::Mutex::new(attempt));
        let Some((timer, mut events)) =
            AttemptTimer::spawn(attempt.clone(), self.state.clock.clone()).await
        else {
            return Ok(Next::Go(home));
        };

        let next = loop {
            if attempt.lock().await.is_submitted() {
                break None;
            }

            tokio::select! {
                Some(event) = events.recv() => self.timer_event(event)?,
                line = self.input.next_line() => {
                    let Some(line) = line? else {
                        break Some(Next::Quit);
                    };
                    if let Some(next) = self.quiz_command(&attempt, &line).await? {
                        break Some(next);
                    }
                }
            }
        };
        timer.cancel();

        if let Some(next) = next {
            return Ok(next);
        }

        // An expiry that raced a pending input line is still queued.
        while let Ok(event) = events.try_recv() {
            if matches!(event, TimerEvent::Expired(_)) {
                self.timer_event(event)?;
            }
        }

        self.render_results(&*attempt.lock().await)?;
        self.wait_for_back(home).await
    }

    fn timer_event(&mut self, event: TimerEvent) -> Result<(), ClientError> {
        match event {
            TimerEvent::Tick(secs) => {
                if secs % 60 == 0 || secs <= 10 {
                    self.say(format!("Time left: {}", format_remaining(secs)))?;
                }
            }
            TimerEvent::Expired(report) => {
                self.say("Time is up!")?;
                self.notify(&report.notice)?;
            }
        }
        Ok(())
    }

    // Returns a route to leave the quiz view, or None to keep going.
    async fn quiz_command(
        &mut self,
        attempt: &SharedAttempt,
        line: &str,
    ) -> Result<Option<Next>, ClientError> {
        let home = Route::Home;
        let mut parts = line.split_whitespace();

        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => {}
            (Some("back"), None, None) => return Ok(Some(Next::Go(home))),
            (Some("logout"), None, None) => return self.logout().map(Some),
            (Some("time"), None, None) => {
                let left = attempt.lock().await.time_left();
                self.say(format!("Time left: {}", format_remaining(left)))?;
            }
            (Some("submit"), None, None) => {
                let outcome = {
                    let mut guard = attempt.lock().await;
                    guard.is_complete().then(|| guard.submit())
                };
                match outcome {
                    None => {
                        self.notify(&Notice::info("Answer every question before submitting."))?
                    }
                    Some(Some(report)) => self.notify(&report.notice)?,
                    Some(None) => {}
                }
            }
            (Some(q), Some(o), None) => {
                let (picked, submitted) = {
                    let mut guard = attempt.lock().await;
                    let picked = match (q.parse::<usize>(), o.parse::<usize>()) {
                        (Ok(q), Ok(o)) if q > 0 && o > 0 => {
                            let option = guard
                                .quiz()
                                .questions
                                .get(q - 1)
                                .and_then(|question| question.options.get(o - 1))
                                .cloned();
                            option.map(|option| guard.select_answer(q - 1, option))
                        }
                        _ => None,
                    };
                    (picked, guard.is_submitted())
                };
                if submitted {
                    self.say("The quiz is already submitted; answers are locked.")?;
                } else if picked != Some(true) {
                    self.say("No such question or option.")?;
                }
            }
            _ => self.say(format!("Unknown command: {}", line))?,
        }
        Ok(None)
    }

    async fn wait_for_back(&mut self, home: Route) -> Result<Next, ClientError> {
        self.say("back | logout | quit")?;
        loop {
            let Some(line) = self.prompt("command").await? else {
                return Ok(Next::Quit);
            };
            match line.as_str() {
                "back" => return Ok(Next::Go(home)),
                "logout" => return self.logout(),
                "quit" => return Ok(Next::Quit),
                _ => {}
            }
        }
    }

    fn render_questions(&mut self, quiz: &Quiz) -> Result<(), ClientError> {
        self.say(format!("== {} ==", quiz.title))?;
        for (q, question) in quiz.questions.iter().enumerate() {
            self.say(format!("Question {}: {}", q + 1, question.text))?;
            for (o, option) in question.options.iter().enumerate() {
                self.say(format!("   {}) {}", o + 1, option))?;
            }
        }
        Ok(())
    }

    fn render_review(&mut self, quiz: &Quiz) -> Result<(), ClientError> {
        self.render_questions(quiz)?;
        self.say("-- correct options --")?;
        for (q, question) in quiz.questions.iter().enumerate() {
            self.say(format!(
                "Question {}: Correct Option: {}",
                q + 1,
                question.correct_option
            ))?;
        }
        Ok(())
    }

    fn render_results(&mut self, attempt: &QuizAttempt) -> Result<(), ClientError> {
        for (q, question) in attempt.quiz().questions.iter().enumerate() {
            let answer = attempt.answer(q);
            let mark = match answer {
                Some(a) if question.is_correct(a) => "correct",
                Some(_) => "wrong",
                None => "unanswered",
            };
            self.say(format!(
                "Question {}: {} (answer: {}, correct: {})",
                q + 1,
                mark,
                answer.unwrap_or("-"),
                question.correct_option
            ))?;
        }
        if let Some(score) = attempt.score() {
            self.say(format!("You scored {}", score))?;
        }
        Ok(())
    }

    async fn add_quiz_view(&mut self) -> Result<Next, ClientError> {
        let Some(username) = self.session.user().map(|user| user.username.clone()) else {
            return Ok(Next::Go(Route::Login));
        };
        let mut draft = QuizDraft::new(username);

        self.say("== Create a New Quiz ==")?;
        self.say(
            "title <t> | q+ | q- <n> | text <n> <t> | o+ <n> | o- <n> <m> | \
             opt <n> <m> <t> | correct <n> <t> | show | submit | back",
        )?;

        loop {
            let Some(line) = self.prompt("quiz").await? else {
                return Ok(Next::Quit);
            };
            let (cmd, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));

            let result = match cmd {
                "back" => return Ok(Next::Go(Route::Dashboard)),
                "logout" => return self.logout(),
                "show" => {
                    self.render_draft(&draft)?;
                    Ok(())
                }
                "submit" => {
                    let outcome = draft.submit(self.state.api.as_ref()).await;
                    self.notify(&notice_for(&outcome))?;
                    if outcome.is_ok() {
                        return Ok(Next::Go(Route::Dashboard));
                    }
                    Ok(())
                }
                _ => edit_draft(&mut draft, cmd, rest),
            };

            if let Err(e) = result {
                self.notify(&Notice::info(e.to_string()))?;
            }
        }
    }

    fn render_draft(&mut self, draft: &QuizDraft) -> Result<(), ClientError> {
        self.say(format!("Title: {}", draft.title()))?;
        for (q, question) in draft.questions().iter().enumerate() {
            self.say(format!("Question {}: {}", q + 1, question.text))?;
            for (o, option) in question.options.iter().enumerate() {
                self.say(format!("   Option {}: {}", o + 1, option))?;
            }
            self.say(format!("   Correct Option: {}", question.correct_option))?;
        }
        Ok(())
    }
}

/// Applies one editing command to a draft. Indices are 1-based.
fn edit_draft(draft: &mut QuizDraft, cmd: &str, rest: &str) -> Result<(), ClientError> {
    fn index(raw: Option<&str>, what: &'static str) -> Result<usize, DraftError> {
        raw.and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .map(|n| n - 1)
            .ok_or(DraftError::IndexOutOfRange(what))
    }

    let mut args = rest.splitn(2, ' ');
    match cmd {
        "title" => draft.set_title(rest),
        "q+" => {
            draft.add_question();
        }
        "q-" => draft.remove_question(index(args.next(), "question")?)?,
        "text" => {
            let q = index(args.next(), "question")?;
            draft.set_question_text(q, args.next().unwrap_or(""))?;
        }
        "o+" => {
            draft.add_option(index(args.next(), "question")?)?;
        }
        "o-" => {
            let mut nums = rest.split_whitespace();
            let q = index(nums.next(), "question")?;
            let o = index(nums.next(), "option")?;
            draft.remove_option(q, o)?;
        }
        "opt" => {
            let mut parts = rest.splitn(3, ' ');
            let q = index(parts.next(), "question")?;
            let o = index(parts.next(), "option")?;
            draft.set_option(q, o, parts.next().unwrap_or(""))?;
        }
        "correct" => {
            let q = index(args.next(), "question")?;
            draft.set_correct_option(q, args.next().unwrap_or(""))?;
        }
        _ => return Err(DraftError::UnknownCommand(cmd.to_string()).into()),
    }
    Ok(())
}
