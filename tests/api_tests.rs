use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use quiz_master::{
    api::{HttpQuizApi, MockQuizApi, QuizApi, REQUEST_ID_HEADER},
    error::ApiError,
    models::{
        CreateQuizRequest, LoginRequest, LoginResponse, Question, Quiz, QuizSummary,
        RegisterRequest, User,
    },
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- Stub Backend ---

#[derive(Default)]
struct StubBackend {
    quizzes: Vec<Quiz>,
    request_ids: Vec<String>,
    created: Vec<CreateQuizRequest>,
}

type Stub = Arc<Mutex<StubBackend>>;

fn record(stub: &Stub, headers: &HeaderMap) {
    if let Some(id) = headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        stub.lock().unwrap().request_ids.push(id.to_string());
    }
}

async fn list_quizzes(State(stub): State<Stub>, headers: HeaderMap) -> Json<Vec<QuizSummary>> {
    record(&stub, &headers);
    let quizzes = stub
        .lock()
        .unwrap()
        .quizzes
        .iter()
        .map(|q| QuizSummary {
            id: q.id,
            title: q.title.clone(),
        })
        .collect();
    Json(quizzes)
}

async fn get_quiz(State(stub): State<Stub>, Path(id): Path<i64>) -> Response {
    // A deliberately malformed body.
    if id == 13 {
        return (StatusCode::OK, "not json").into_response();
    }
    match stub.lock().unwrap().quizzes.iter().find(|q| q.id == id) {
        Some(quiz) => Json(quiz.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_quiz(State(stub): State<Stub>, Json(req): Json<CreateQuizRequest>) -> Json<Quiz> {
    let mut backend = stub.lock().unwrap();
    let quiz = Quiz {
        id: backend.quizzes.len() as i64 + 100,
        title: req.title.clone(),
        questions: req.questions.clone(),
    };
    backend.quizzes.push(quiz.clone());
    backend.created.push(req);
    Json(quiz)
}

async fn login(Json(req): Json<LoginRequest>) -> Json<LoginResponse> {
    if req.username == "teach" && req.password == "secret" {
        Json(LoginResponse {
            user: Some(User {
                id: 1,
                username: req.username,
                is_teacher: true,
            }),
            authenticated: true,
        })
    } else {
        Json(LoginResponse {
            user: None,
            authenticated: false,
        })
    }
}

async fn register(Json(req): Json<RegisterRequest>) -> Result<Json<User>, StatusCode> {
    if req.username == "taken" {
        return Err(StatusCode::CONFLICT);
    }
    Ok(Json(User {
        id: 2,
        username: req.username,
        is_teacher: req.is_teacher,
    }))
}

struct TestBackend {
    address: String,
    stub: Stub,
}

async fn spawn_backend() -> TestBackend {
    let stub: Stub = Arc::new(Mutex::new(StubBackend {
        quizzes: vec![Quiz {
            id: 1,
            title: "Arithmetic".to_string(),
            questions: vec![Question {
                text: "2+2?".to_string(),
                options: vec!["3".to_string(), "4".to_string()],
                correct_option: "4".to_string(),
            }],
        }],
        ..StubBackend::default()
    }));

    let router = Router::new()
        .route("/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizzes/{id}", get(get_quiz))
        .route("/login", post(login))
        .route("/register", post(register))
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestBackend { address, stub }
}

fn client(address: &str) -> HttpQuizApi {
    HttpQuizApi::new(address, Duration::from_secs(5)).unwrap()
}

// --- HTTP Client Tests ---

#[tokio::test]
async fn test_list_quizzes() {
    let backend = spawn_backend().await;
    let api = client(&backend.address);

    let quizzes = api.list_quizzes().await.unwrap();
    assert_eq!(
        quizzes,
        vec![QuizSummary {
            id: 1,
            title: "Arithmetic".to_string()
        }]
    );
}

#[tokio::test]
async fn test_requests_carry_unique_request_ids() {
    let backend = spawn_backend().await;
    let api = client(&backend.address);

    api.list_quizzes().await.unwrap();
    api.list_quizzes().await.unwrap();

    let ids = backend.stub.lock().unwrap().request_ids.clone();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert!(Uuid::parse_str(&ids[0]).is_ok());
}

#[tokio::test]
async fn test_get_quiz_includes_correct_option() {
    let backend = spawn_backend().await;
    let api = client(&format!("{}/", backend.address));

    let quiz = api.get_quiz(1).await.unwrap();
    assert_eq!(quiz.questions[0].correct_option, "4");
}

#[tokio::test]
async fn test_missing_quiz_maps_to_status_error() {
    let backend = spawn_backend().await;
    let api = client(&backend.address);

    match api.get_quiz(404).await {
        Err(ApiError::Status { status, path }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(path, "/quizzes/404");
        }
        other => panic!("Expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_maps_to_decode_error() {
    let backend = spawn_backend().await;
    let api = client(&backend.address);

    assert!(matches!(api.get_quiz(13).await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_create_quiz_posts_whole_payload() {
    let backend = spawn_backend().await;
    let api = client(&backend.address);
    let request = CreateQuizRequest {
        title: "Capitals".to_string(),
        username: "teach".to_string(),
        questions: vec![Question {
            text: "France?".to_string(),
            options: vec!["Paris".to_string(), "Lyon".to_string()],
            correct_option: "Paris".to_string(),
        }],
    };

    let created = api.create_quiz(&request).await.unwrap();

    assert_eq!(created.title, "Capitals");
    assert_eq!(backend.stub.lock().unwrap().created, vec![request]);
}

#[tokio::test]
async fn test_login_verdicts() {
    let backend = spawn_backend().await;
    let api = client(&backend.address);

    let ok = api
        .login(&LoginRequest {
            username: "teach".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();
    assert!(ok.authenticated);
    assert!(ok.user.unwrap().is_teacher);

    let rejected = api
        .login(&LoginRequest {
            username: "teach".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap();
    assert!(!rejected.authenticated);
}

#[tokio::test]
async fn test_register_conflict() {
    let backend = spawn_backend().await;
    let api = client(&backend.address);
    let request = RegisterRequest {
        username: "taken".to_string(),
        password: "pw".to_string(),
        is_teacher: false,
    };

    assert!(matches!(
        api.register(&request).await,
        Err(ApiError::Status { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Grab a free port, then close it again.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let api = client(&format!("http://127.0.0.1:{}", port));
    assert!(matches!(
        api.list_quizzes().await,
        Err(ApiError::Network(_))
    ));
}

// --- Mock Client Tests ---

#[tokio::test]
async fn test_mock_create_then_fetch() {
    let api = MockQuizApi::new();
    let request = CreateQuizRequest {
        title: "T".to_string(),
        username: "teach".to_string(),
        questions: vec![],
    };

    let created = api.create_quiz(&request).await.unwrap();
    let fetched = api.get_quiz(created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(api.created(), vec![request]);
    assert_eq!(api.list_quizzes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_mock_failure() {
    let api = MockQuizApi::new_failing();
    assert!(api.list_quizzes().await.is_err());
    assert!(api.get_quiz(1).await.is_err());
}
