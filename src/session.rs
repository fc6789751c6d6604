use crate::{
    api::QuizApi,
    error::SessionError,
    models::{LoginRequest, RegisterRequest, Role, User},
    storage::StoreState,
};

/// Session
///
/// The signed-in identity, passed explicitly to whatever needs it.
/// Lifecycle: `hydrate` from the store at startup, `login` to set it,
/// `logout` to clear both the persisted blob and the in-memory copy.
pub struct Session {
    store: StoreState,
    user: Option<User>,
}

impl Session {
    /// hydrate
    ///
    /// Restores the identity persisted by a previous run. A store that cannot
    /// be read starts the session signed out rather than failing startup.
    pub fn hydrate(store: StoreState) -> Self {
        let user = match store.load_session() {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted session");
                None
            }
        };

        if let Some(user) = &user {
            tracing::info!(username = %user.username, "Restored session");
        }

        Self { store, user }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(User::role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// login
    ///
    /// Authenticates against the backend. The identity is persisted before it
    /// is held in memory, so a store failure leaves the session signed out.
    pub async fn login(
        &mut self,
        api: &dyn QuizApi,
        request: &LoginRequest,
    ) -> Result<&User, SessionError> {
        let response = api.login(request).await?;

        let user = match (response.authenticated, response.user) {
            (true, Some(user)) => user,
            _ => {
                tracing::info!(username = %request.username, "Login rejected");
                return Err(SessionError::InvalidCredentials);
            }
        };

        self.store.save_session(&user)?;
        tracing::info!(username = %user.username, role = ?user.role(), "Logged in");
        Ok(&*self.user.insert(user))
    }

    /// Creates an account. Does not sign in.
    pub async fn register(
        &self,
        api: &dyn QuizApi,
        request: &RegisterRequest,
    ) -> Result<User, SessionError> {
        let user = api.register(request).await?;
        tracing::info!(username = %user.username, "Registered");
        Ok(user)
    }

    /// logout
    ///
    /// The in-memory identity is always dropped; a failure to clear the
    /// persisted blob is still reported.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(user) = self.user.take() {
            tracing::info!(username = %user.username, "Logged out");
        }
        self.store.clear_session()?;
        Ok(())
    }
}
