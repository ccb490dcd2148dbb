use std::sync::Arc;

use crate::error::{Result, SmartTaskError};
use crate::session::SessionStore;

use super::transport::{ApiRequest, ApiResponse, Transport};

/// Status the backend uses to reject a missing, invalid, or expired token.
pub const UNAUTHORIZED: u16 = 401;

/// Anything that can produce the current bearer token.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Reaction to an authentication-rejected response.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self);
}

impl<F> UnauthorizedHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_unauthorized(&self) {
        self()
    }
}

/// In-memory token first, then whatever the durable mirror holds.
impl CredentialSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
            .filter(|t| !t.is_empty())
            .or_else(|| self.stored_token())
    }
}

/// Default handler: tear the session down, then send the user to the login
/// entry point.
pub struct ForceLogout {
    session: Arc<SessionStore>,
    redirect: Box<dyn Fn() + Send + Sync>,
}

impl ForceLogout {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self {
            session,
            redirect: Box::new(|| {}),
        }
    }

    pub fn with_redirect(mut self, redirect: impl Fn() + Send + Sync + 'static) -> Self {
        self.redirect = Box::new(redirect);
        self
    }
}

impl UnauthorizedHandler for ForceLogout {
    fn on_unauthorized(&self) {
        self.session.logout();
        (self.redirect)();
    }
}

/// Middleware around a [`Transport`]: attaches the bearer credential to every
/// request and turns a 401 into a forced logout, whichever endpoint it came
/// from. All other statuses pass through untouched.
pub struct AuthLayer<T> {
    inner: T,
    credentials: Arc<dyn CredentialSource>,
    on_unauthorized: Arc<dyn UnauthorizedHandler>,
}

impl<T> AuthLayer<T> {
    pub fn new(
        inner: T,
        credentials: Arc<dyn CredentialSource>,
        on_unauthorized: Arc<dyn UnauthorizedHandler>,
    ) -> Self {
        Self {
            inner,
            credentials,
            on_unauthorized,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for AuthLayer<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        request.bearer = self.credentials.bearer_token();
        let path = request.path.clone();

        let response = self.inner.send(request).await?;
        if response.status == UNAUTHORIZED {
            tracing::warn!(path = %path, "authentication rejected, ending session");
            self.on_unauthorized.on_unauthorized();
            return Err(SmartTaskError::Unauthorized {
                body: response.body,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthResponse;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every request and answers with a fixed status.
    struct Recorder {
        status: u16,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl Recorder {
        fn new(status: u16) -> Self {
            Self {
                status,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last_bearer(&self) -> Option<String> {
            self.seen.lock().unwrap().last().and_then(|r| r.bearer.clone())
        }
    }

    impl Transport for Recorder {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(ApiResponse {
                status: self.status,
                body: "{}".into(),
            })
        }
    }

    fn logged_in_session() -> Arc<SessionStore> {
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        session.login(&AuthResponse {
            token: "t1".into(),
            token_type: "Bearer".into(),
            id: 1,
            username: "ana".into(),
            email: "a@x.com".into(),
            roles: vec!["USER".into()],
        });
        session
    }

    #[tokio::test]
    async fn test_attaches_session_token() {
        let session = logged_in_session();
        let layer = AuthLayer::new(
            Recorder::new(200),
            session.clone(),
            Arc::new(ForceLogout::new(session)),
        );
        layer.send(ApiRequest::get("/tasks")).await.unwrap();
        assert_eq!(layer.inner().last_bearer().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_no_token_goes_out_unauthenticated() {
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        let layer = AuthLayer::new(
            Recorder::new(200),
            session.clone(),
            Arc::new(ForceLogout::new(session)),
        );
        layer.send(ApiRequest::get("/tasks")).await.unwrap();
        assert!(layer.inner().last_bearer().is_none());
    }

    #[tokio::test]
    async fn test_401_forces_logout_and_redirect() {
        let session = logged_in_session();
        let redirects = Arc::new(AtomicUsize::new(0));
        let counter = redirects.clone();
        let handler = ForceLogout::new(session.clone()).with_redirect(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let layer = AuthLayer::new(Recorder::new(401), session.clone(), Arc::new(handler));

        let result = layer.send(ApiRequest::get("/notifications/preferences")).await;
        assert!(matches!(result, Err(SmartTaskError::Unauthorized { .. })));
        assert!(!session.is_authenticated());
        assert!(session.stored_token().is_none());
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let session = logged_in_session();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let layer = AuthLayer::new(
            Recorder::new(403),
            session.clone(),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let response = layer.send(ApiRequest::get("/settings")).await.unwrap();
        assert_eq!(response.status, 403);
        assert!(session.is_authenticated());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
