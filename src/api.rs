use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        CreateQuizRequest, LoginRequest, LoginResponse, Quiz, QuizId, QuizSummary,
        RegisterRequest, User,
    },
};

/// Header used to correlate a client call with the backend's logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// QuizApi Trait
///
/// The collaborator boundary: everything the client asks of the quiz backend.
/// Views hold an `ApiState` and never know whether it is HTTP or in-memory.
///
/// Calls are fire-and-await. Nothing retries; a failure is reported once and
/// the caller decides what the user sees.
#[async_trait]
pub trait QuizApi: Send + Sync {
    // GET /quizzes
    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, ApiError>;

    // GET /quizzes/:id, including correct options.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, ApiError>;

    // POST /quizzes
    async fn create_quiz(&self, request: &CreateQuizRequest) -> Result<Quiz, ApiError>;

    // POST /login
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    // POST /register
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError>;
}

/// ApiState
///
/// The concrete type used to share backend access across views.
pub type ApiState = Arc<dyn QuizApi>;

// --- HTTP Implementation ---

/// HttpQuizApi
///
/// `QuizApi` over reqwest. One shared connection pool; each request gets a
/// fresh `x-request-id` and its own tracing span.
#[derive(Clone, Debug)]
pub struct HttpQuizApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuizApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, String) {
        let request_id = Uuid::new_v4().to_string();
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(REQUEST_ID_HEADER, &request_id);
        (builder, request_id)
    }

    /// send
    ///
    /// Runs one request inside an `api_request` span, maps non-2xx statuses to
    /// `ApiError::Status` and decodes the JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T, ApiError> {
        let (builder, request_id) = self.request(method.clone(), path);
        let span = tracing::info_span!(
            "api_request",
            method = %method,
            path = %path,
            req_id = %request_id,
        );

        async move {
            let response = build(builder).send().await.map_err(|e| {
                tracing::error!(error = %e, "Request failed");
                ApiError::Network(e)
            })?;

            let response = check_status(response, path)?;
            let body = response.bytes().await?;
            tracing::debug!(bytes = body.len(), "Response received");

            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
        }
        .instrument(span)
        .await
    }
}

fn check_status(response: Response, path: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    tracing::warn!(%status, "Backend rejected request");
    Err(ApiError::Status {
        status,
        path: path.to_string(),
    })
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, ApiError> {
        self.send(Method::GET, "/quizzes", |req| req).await
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, ApiError> {
        self.send(Method::GET, &format!("/quizzes/{}", id), |req| req)
            .await
    }

    async fn create_quiz(&self, request: &CreateQuizRequest) -> Result<Quiz, ApiError> {
        self.send(Method::POST, "/quizzes", |req| req.json(request))
            .await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.send(Method::POST, "/login", |req| req.json(request))
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        self.send(Method::POST, "/register", |req| req.json(request))
            .await
    }
}

// --- In-Memory Implementation (tests and offline demos) ---

#[derive(Debug, Default)]
struct MockBackend {
    quizzes: BTreeMap<QuizId, Quiz>,
    // username -> (password, user)
    accounts: BTreeMap<String, (String, User)>,
    created: Vec<CreateQuizRequest>,
}

/// MockQuizApi
///
/// A self-contained `QuizApi` that keeps quizzes and accounts in memory.
/// `should_fail` makes every call return a simulated network-style failure,
/// which is how tests drive the "notify and stay put" paths.
#[derive(Debug, Default)]
pub struct MockQuizApi {
    backend: Mutex<MockBackend>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockQuizApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds a quiz as if it had been created earlier.
    pub fn with_quiz(self, quiz: Quiz) -> Self {
        self.lock().quizzes.insert(quiz.id, quiz);
        self
    }

    /// Seeds an account that `login` will accept.
    pub fn with_account(self, user: User, password: &str) -> Self {
        self.lock()
            .accounts
            .insert(user.username.clone(), (password.to_string(), user));
        self
    }

    /// Every `create_quiz` payload received so far, in order.
    pub fn created(&self) -> Vec<CreateQuizRequest> {
        self.lock().created.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockBackend> {
        self.backend
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, path: &str) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl QuizApi for MockQuizApi {
    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, ApiError> {
        self.check("/quizzes")?;
        Ok(self
            .lock()
            .quizzes
            .values()
            .map(|quiz| QuizSummary {
                id: quiz.id,
                title: quiz.title.clone(),
            })
            .collect())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, ApiError> {
        let path = format!("/quizzes/{}", id);
        self.check(&path)?;
        self.lock()
            .quizzes
            .get(&id)
            .cloned()
            .ok_or(ApiError::Status {
                status: reqwest::StatusCode::NOT_FOUND,
                path,
            })
    }

    async fn create_quiz(&self, request: &CreateQuizRequest) -> Result<Quiz, ApiError> {
        self.check("/quizzes")?;
        let mut backend = self.lock();
        let id = backend.quizzes.keys().next_back().copied().unwrap_or(0) + 1;
        let quiz = Quiz {
            id,
            title: request.title.clone(),
            questions: request.questions.clone(),
        };
        backend.quizzes.insert(id, quiz.clone());
        backend.created.push(request.clone());
        Ok(quiz)
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.check("/login")?;
        let backend = self.lock();
        let user = backend
            .accounts
            .get(&request.username)
            .filter(|(password, _)| *password == request.password)
            .map(|(_, user)| user.clone());

        Ok(LoginResponse {
            authenticated: user.is_some(),
            user,
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        self.check("/register")?;
        let mut backend = self.lock();
        if backend.accounts.contains_key(&request.username) {
            return Err(ApiError::Status {
                status: reqwest::StatusCode::CONFLICT,
                path: "/register".to_string(),
            });
        }
        let user = User {
            id: backend.accounts.len() as i64 + 1,
            username: request.username.clone(),
            is_teacher: request.is_teacher,
        };
        backend.accounts.insert(
            request.username.clone(),
            (request.password.clone(), user.clone()),
        );
        Ok(user)
    }
}
