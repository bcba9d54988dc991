use tracing::{debug, info, warn};

use crate::remote::{RemoteDataService, ServiceError, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggedIn(Session),
}

impl AuthState {
    /// Startup state: logged in iff the service holds a session.
    pub fn resolve(service: &dyn RemoteDataService) -> Self {
        match service.current_session() {
            Some(session) => Self::LoggedIn(session),
            None => Self::LoggedOut,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::LoggedIn(session) => Some(session),
            Self::LoggedOut => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn(_))
    }
}

/// Registers `user_name` and logs in with the same credentials.
///
/// The sign-up outcome is ignored, so an existing account simply logs
/// in. The session held by the service afterwards decides the result.
pub async fn sign_up_or_log_in(
    service: &dyn RemoteDataService,
    user_name: &str,
    password: &str,
) -> Result<Session, ServiceError> {
    match service.sign_up(user_name, password).await {
        Ok(()) => info!(user = %user_name, "registered new user"),
        Err(ServiceError::Conflict(_)) => debug!(user = %user_name, "user already registered"),
        Err(e) => warn!(user = %user_name, error = %e, "sign-up failed, trying log-in anyway"),
    }

    service.log_in(user_name, password).await?;
    service
        .current_session()
        .ok_or_else(|| ServiceError::Auth("log-in returned no session".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryService;

    #[tokio::test]
    async fn existing_user_with_correct_password_logs_in() {
        let service = MemoryService::new();
        service.sign_up("alice", "secret").await.unwrap();
        assert_eq!(AuthState::resolve(&service), AuthState::LoggedOut);

        let session = sign_up_or_log_in(&service, "alice", "secret").await.unwrap();
        assert_eq!(session.user_name, "alice");
        assert_eq!(AuthState::resolve(&service), AuthState::LoggedIn(session));
    }

    #[tokio::test]
    async fn new_user_is_registered_then_logged_in() {
        let service = MemoryService::new();
        let session = sign_up_or_log_in(&service, "bob", "pw").await.unwrap();
        assert!(AuthState::resolve(&service).is_logged_in());
        assert_eq!(AuthState::resolve(&service).session(), Some(&session));
    }

    #[tokio::test]
    async fn wrong_password_stays_logged_out() {
        let service = MemoryService::new();
        service.sign_up("alice", "secret").await.unwrap();
        let err = sign_up_or_log_in(&service, "alice", "wrong").await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
        assert_eq!(AuthState::resolve(&service), AuthState::LoggedOut);
    }
}
