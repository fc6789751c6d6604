use std::fmt;

use crate::models::{QuizId, Role, User};

/// Route
///
/// Every view the client can show. Paths match the web front end so links
/// and persisted locations stay interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    // "/": the login form, or a redirect to the viewer's home.
    Login,
    // "/register"
    Register,
    // "/home": student quiz list.
    Home,
    // "/dashboard": teacher quiz list.
    Dashboard,
    // "/quiz/:id": take (student) or review (teacher) a quiz.
    TakeQuiz(QuizId),
    // "/addQuiz": the authoring form.
    AddQuiz,
}

impl Route {
    /// Parses a path. Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let path = match trimmed.trim_end_matches('/') {
            "" => "/",
            other => other,
        };

        match path {
            "/" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/home" => Some(Route::Home),
            "/dashboard" => Some(Route::Dashboard),
            "/addQuiz" => Some(Route::AddQuiz),
            _ => path
                .strip_prefix("/quiz/")
                .and_then(|id| id.parse::<QuizId>().ok())
                .map(Route::TakeQuiz),
        }
    }

    /// The landing view for a role.
    pub fn home_for(role: Role) -> Self {
        match role {
            Role::Teacher => Route::Dashboard,
            Role::Student => Route::Home,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => write!(f, "/"),
            Route::Register => write!(f, "/register"),
            Route::Home => write!(f, "/home"),
            Route::Dashboard => write!(f, "/dashboard"),
            Route::TakeQuiz(id) => write!(f, "/quiz/{}", id),
            Route::AddQuiz => write!(f, "/addQuiz"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// guard
///
/// One navigation decision for `route` given the current identity:
/// - anonymous viewers only reach Login and Register;
/// - signed-in viewers are sent from Login and Register to their home;
/// - Dashboard and AddQuiz are teacher-only, Home is student-only;
/// - TakeQuiz is open to both (teachers get the review view).
pub fn guard(route: Route, user: Option<&User>) -> Navigation {
    let Some(role) = user.map(User::role) else {
        return match route {
            Route::Login | Route::Register => Navigation::Render(route),
            _ => Navigation::Redirect(Route::Login),
        };
    };

    match (route, role) {
        (Route::Login | Route::Register, _) => Navigation::Redirect(Route::home_for(role)),
        (Route::Dashboard | Route::AddQuiz, Role::Student) => Navigation::Redirect(Route::Home),
        (Route::Home, Role::Teacher) => Navigation::Redirect(Route::Dashboard),
        _ => Navigation::Render(route),
    }
}

/// resolve
///
/// Follows redirects until a view renders. Every redirect target above is
/// rendered for the same identity, so this settles in at most two hops.
pub fn resolve(route: Route, user: Option<&User>) -> Route {
    let mut current = route;
    // Bounded so a future rule cycle cannot hang the client.
    for _ in 0..4 {
        match guard(current, user) {
            Navigation::Render(target) => return target,
            Navigation::Redirect(next) => {
                tracing::debug!(from = %current, to = %next, "Redirecting");
                current = next;
            }
        }
    }
    current
}
